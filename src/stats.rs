use core::fmt;

use crate::block::BlockInfo;

/// Counters for one of the heap's lists.
///
/// `min_size`/`max_size` are payload sizes and read 0 for an empty list;
/// `total_bytes` includes each block's header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListStats {
  pub count: usize,
  pub min_size: usize,
  pub max_size: usize,
  pub total_bytes: usize,
}

impl ListStats {
  fn collect(
    blocks: impl Iterator<Item = BlockInfo>,
    header_size: usize,
  ) -> Self {
    blocks.fold(Self::default(), |mut stats, block| {
      stats.min_size = if stats.count == 0 { block.size } else { stats.min_size.min(block.size) };
      stats.max_size = stats.max_size.max(block.size);
      stats.total_bytes += header_size + block.size;
      stats.count += 1;
      stats
    })
  }
}

/// Occupancy of a heap at one point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
  pub allocated: ListStats,
  pub free: ListStats,
  /// Usable bytes of the aligned buffer, terminator header excluded.
  pub heap_total: usize,
}

impl HeapStats {
  pub(crate) fn collect(
    allocated: impl Iterator<Item = BlockInfo>,
    free: impl Iterator<Item = BlockInfo>,
    header_size: usize,
    heap_total: usize,
  ) -> Self {
    Self {
      allocated: ListStats::collect(allocated, header_size),
      free: ListStats::collect(free, header_size),
      heap_total,
    }
  }

  /// Bytes covered by both lists, headers included.
  pub fn accounted_bytes(&self) -> usize {
    self.allocated.total_bytes + self.free.total_bytes
  }
}

impl fmt::Display for HeapStats {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    writeln!(f, "free blocks            = {}", self.free.count)?;
    writeln!(f, "min free block         = {}", self.free.min_size)?;
    writeln!(f, "max free block         = {}", self.free.max_size)?;
    writeln!(f, "free total bytes       = {}", self.free.total_bytes)?;
    writeln!(f, "allocated blocks       = {}", self.allocated.count)?;
    writeln!(f, "min allocated block    = {}", self.allocated.min_size)?;
    writeln!(f, "max allocated block    = {}", self.allocated.max_size)?;
    writeln!(f, "allocated total bytes  = {}", self.allocated.total_bytes)?;
    write!(f, "heap total bytes       = {}", self.heap_total)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn block(
    header: usize,
    size: usize,
  ) -> BlockInfo {
    BlockInfo { header, payload: header + 16, size }
  }

  #[test]
  fn test_empty_lists_report_zero() {
    let stats = HeapStats::collect(core::iter::empty(), core::iter::empty(), 16, 240);

    assert_eq!(stats.allocated, ListStats::default());
    assert_eq!(stats.free, ListStats::default());
    assert_eq!(stats.heap_total, 240);
  }

  #[test]
  fn test_min_max_and_totals() {
    let allocated = [block(0, 16), block(32, 24), block(72, 8)];
    let free = [block(96, 128)];

    let stats = HeapStats::collect(allocated.into_iter(), free.into_iter(), 16, 240);

    assert_eq!(
      stats.allocated,
      ListStats { count: 3, min_size: 8, max_size: 24, total_bytes: 48 + 48 }
    );
    assert_eq!(
      stats.free,
      ListStats { count: 1, min_size: 128, max_size: 128, total_bytes: 144 }
    );
    assert_eq!(stats.accounted_bytes(), 240);
  }

  #[test]
  fn test_display_lists_every_counter() {
    let stats = HeapStats::collect([block(0, 16)].into_iter(), core::iter::empty(), 16, 240);
    let text = stats.to_string();

    assert_eq!(text.lines().count(), 9);
    assert!(text.contains("allocated blocks       = 1"));
    assert!(text.contains("heap total bytes       = 240"));
  }
}
