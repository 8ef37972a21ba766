use thiserror::Error;

/// Failure returned by [`Heap::allocate`](crate::Heap::allocate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  /// No single free block can hold the request, or the request rounds to
  /// zero bytes. The heap is left unchanged.
  #[error("out of memory (requested: {requested} bytes, largest free block: {largest_free} bytes)")]
  OutOfMemory { requested: usize, largest_free: usize },
}

pub type Result<T> = core::result::Result<T, AllocError>;
