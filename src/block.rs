use core::mem;

/// Link value stored in the terminator: no further node.
pub(crate) const NIL: usize = usize::MAX;
/// Size stored in the terminator header.
pub(crate) const INVALID_SIZE: usize = usize::MAX;

const WORD: usize = mem::size_of::<usize>();

/// Bytes occupied by an encoded header before alignment padding.
pub(crate) const RAW_HEADER_SIZE: usize = 2 * WORD;

/// Header prefixed to every block inside the arena.
///
/// `next` is the arena offset of the following header in whichever list the
/// block belongs to, `size` the payload length excluding the header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Block {
  pub next: usize,
  pub size: usize,
}

impl Block {
  pub fn new(
    next: usize,
    size: usize,
  ) -> Self {
    Self { next, size }
  }

  pub fn terminator() -> Self {
    Self::new(NIL, INVALID_SIZE)
  }

  pub fn from_bytes(bytes: [u8; RAW_HEADER_SIZE]) -> Self {
    let mut next = [0u8; WORD];
    let mut size = [0u8; WORD];
    next.copy_from_slice(&bytes[..WORD]);
    size.copy_from_slice(&bytes[WORD..]);

    Self {
      next: usize::from_ne_bytes(next),
      size: usize::from_ne_bytes(size),
    }
  }

  pub fn to_bytes(self) -> [u8; RAW_HEADER_SIZE] {
    let mut bytes = [0u8; RAW_HEADER_SIZE];
    bytes[..WORD].copy_from_slice(&self.next.to_ne_bytes());
    bytes[WORD..].copy_from_slice(&self.size.to_ne_bytes());
    bytes
  }

  /// Decodes the header stored at `offset`.
  pub fn read(
    bytes: &[u8],
    offset: usize,
  ) -> Self {
    let mut raw = [0u8; RAW_HEADER_SIZE];
    raw.copy_from_slice(&bytes[offset..offset + RAW_HEADER_SIZE]);
    Self::from_bytes(raw)
  }

  /// Encodes this header at `offset`.
  pub fn write(
    self,
    bytes: &mut [u8],
    offset: usize,
  ) {
    bytes[offset..offset + RAW_HEADER_SIZE].copy_from_slice(&self.to_bytes());
  }
}

/// Position and size of one block as seen by the heap walkers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockInfo {
  /// Arena offset of the block header.
  pub header: usize,
  /// Arena offset of the first payload byte.
  pub payload: usize,
  /// Payload length in bytes, header excluded.
  pub size: usize,
}

impl BlockInfo {
  /// Offset one past the last payload byte.
  pub fn end(&self) -> usize {
    self.payload + self.size
  }
}
