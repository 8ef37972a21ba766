//! Byte storage behind a heap.
//!
//! The engine only touches header bytes through [`Storage`]. An owned
//! [`Arena`] backs [`Heap`](crate::Heap); a [`StaticArena`] backs the
//! process-wide heap and is only ever reached through raw pointers, so
//! payload pointers handed to callers stay valid across heap calls.

use core::cell::UnsafeCell;

use crate::block::{Block, RAW_HEADER_SIZE};

pub(crate) trait Storage {
  /// Address of offset 0, used to align the managed span.
  fn base_addr(&self) -> usize;

  fn capacity(&self) -> usize;

  fn read(
    &self,
    offset: usize,
  ) -> Block;

  fn write(
    &mut self,
    offset: usize,
    block: Block,
  );
}

#[repr(C, align(16))]
pub(crate) struct Arena<const SIZE: usize>(pub [u8; SIZE]);

impl<const SIZE: usize> Arena<SIZE> {
  pub const fn new() -> Self {
    Self([0; SIZE])
  }
}

impl<const SIZE: usize> Storage for Arena<SIZE> {
  fn base_addr(&self) -> usize {
    self.0.as_ptr() as usize
  }

  fn capacity(&self) -> usize {
    SIZE
  }

  fn read(
    &self,
    offset: usize,
  ) -> Block {
    Block::read(&self.0, offset)
  }

  fn write(
    &mut self,
    offset: usize,
    block: Block,
  ) {
    block.write(&mut self.0, offset);
  }
}

/// Buffer of a heap that lives in a `static`.
#[repr(C, align(16))]
pub(crate) struct StaticArena<const SIZE: usize>(UnsafeCell<[u8; SIZE]>);

// Reached only through `RawArena`; callers of the unsafe global API keep
// access to one execution context.
unsafe impl<const SIZE: usize> Sync for StaticArena<SIZE> {}

impl<const SIZE: usize> StaticArena<SIZE> {
  pub const fn new() -> Self {
    Self(UnsafeCell::new([0; SIZE]))
  }

  /// Raw view of the buffer. No reference to the bytes is created.
  pub fn raw(&self) -> RawArena {
    RawArena {
      base: self.0.get().cast::<u8>(),
      len: SIZE,
    }
  }
}

/// Pointer-based [`Storage`] over a [`StaticArena`].
pub(crate) struct RawArena {
  base: *mut u8,
  len: usize,
}

impl RawArena {
  /// Pointer to `offset`, derived from the buffer's own base pointer.
  pub fn ptr_at(
    &self,
    offset: usize,
  ) -> *mut u8 {
    self.base.wrapping_add(offset)
  }

  fn check(
    &self,
    offset: usize,
  ) {
    assert!(
      offset.checked_add(RAW_HEADER_SIZE).is_some_and(|end| end <= self.len),
      "header at {offset} outside arena of {} bytes",
      self.len
    );
  }
}

impl Storage for RawArena {
  fn base_addr(&self) -> usize {
    self.base as usize
  }

  fn capacity(&self) -> usize {
    self.len
  }

  fn read(
    &self,
    offset: usize,
  ) -> Block {
    self.check(offset);
    // SAFETY:
    // - `offset..offset + RAW_HEADER_SIZE` lies inside the buffer (checked above).
    // - `[u8; N]` has alignment 1, and only the header bytes are read.
    let bytes = unsafe { self.base.add(offset).cast::<[u8; RAW_HEADER_SIZE]>().read() };
    Block::from_bytes(bytes)
  }

  fn write(
    &mut self,
    offset: usize,
    block: Block,
  ) {
    self.check(offset);
    // SAFETY:
    // - `offset..offset + RAW_HEADER_SIZE` lies inside the buffer (checked above).
    // - Header bytes are never part of a payload handed to a caller.
    unsafe {
      self.base.add(offset).cast::<[u8; RAW_HEADER_SIZE]>().write(block.to_bytes());
    }
  }
}
