#![allow(dead_code)]

use privheap::{BlockInfo, Heap};

/// Header size of a heap with 4-byte granularity on this target.
pub const H4: usize = privheap::align_up!(2 * core::mem::size_of::<usize>(), 4);

/// Asserts that allocated blocks, free blocks and their headers tile
/// `[0, total_size)` without gaps or overlaps, both lists are strictly
/// address ordered, and the cached max free block matches the free list.
pub fn assert_tiles<const SIZE: usize, const ALIGN: usize>(heap: &Heap<SIZE, ALIGN>) {
  let header = Heap::<SIZE, ALIGN>::HEADER_SIZE;
  let free: Vec<BlockInfo> = heap.free_blocks().collect();
  let allocated: Vec<BlockInfo> = heap.allocated_blocks().collect();

  assert!(free.windows(2).all(|w| w[0].header < w[1].header), "free list out of order");
  assert!(allocated.windows(2).all(|w| w[0].header < w[1].header), "allocated list out of order");

  let mut blocks: Vec<BlockInfo> = free.iter().chain(allocated.iter()).copied().collect();
  blocks.sort_by_key(|b| b.header);

  let mut cursor = 0;
  for block in &blocks {
    assert_eq!(block.header, cursor, "gap or overlap before {:?}", block);
    assert_eq!(block.payload, block.header + header);
    assert_eq!(block.payload % ALIGN, 0);
    cursor = block.end();
  }
  assert_eq!(cursor, heap.total_size(), "blocks do not reach the terminator");

  let max_free = free.iter().map(|b| b.size).max().unwrap_or(0);
  assert_eq!(heap.max_free_block(), max_free);

  let stats = heap.snapshot();
  assert_eq!(stats.accounted_bytes(), heap.total_size());
}
