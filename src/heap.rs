use log::{debug, info, trace, warn};

use crate::{
  align::checked_align_up,
  align_down, align_up,
  arena::{Arena, Storage},
  block::{Block, BlockInfo, RAW_HEADER_SIZE},
  error::{AllocError, Result},
  stats::HeapStats,
};

/// Alignment of the arena itself; the upper bound for `ALIGN`.
pub const ARENA_ALIGNMENT: usize = 16;

/// Granularity used when `Heap` is named without an explicit `ALIGN`.
pub const DEFAULT_ALIGNMENT: usize = 4;

/// Handle to a live allocation: the arena offset of its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Allocation {
  offset: usize,
}

impl Allocation {
  pub(crate) fn from_offset(offset: usize) -> Self {
    Self { offset }
  }

  /// Arena offset of the first payload byte.
  pub fn offset(&self) -> usize {
    self.offset
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum List {
  Free,
  Allocated,
}

struct Fit {
  prev: Option<usize>,
  block: usize,
  slack: usize,
}

/// List bookkeeping of a heap, separate from the bytes it manages.
///
/// Every operation takes the storage explicitly, so the process-wide heap
/// can run the same engine over a buffer it only reaches through raw
/// pointers. With `privileged-ram` the engine is inlined into the placed
/// entry points.
pub(crate) struct HeapCore<const ALIGN: usize> {
  /// First block of the free list, or the terminator when empty.
  free_head: usize,
  /// First block of the allocated list, or the terminator when empty.
  alloc_head: usize,
  /// Offset of the terminator header; 0 until initialized, since the
  /// terminator always sits above at least one block.
  terminator: usize,
  /// Offset of the lowest usable header after aligning the buffer start.
  start: usize,
  max_free_block: usize,
  total_size: usize,
}

impl<const ALIGN: usize> HeapCore<ALIGN> {
  pub const HEADER_SIZE: usize = align_up!(RAW_HEADER_SIZE, ALIGN);

  pub const fn new() -> Self {
    const {
      assert!(ALIGN.is_power_of_two(), "heap alignment must be a power of two");
      assert!(ALIGN <= ARENA_ALIGNMENT, "heap alignment exceeds arena alignment");
    }

    Self {
      free_head: 0,
      alloc_head: 0,
      terminator: 0,
      start: 0,
      max_free_block: 0,
      total_size: 0,
    }
  }

  /// Smallest buffer that holds a terminator and one `ALIGN`-byte block.
  pub const fn min_buffer_size() -> usize {
    2 * Self::HEADER_SIZE + ALIGN
  }

  pub fn is_initialized(&self) -> bool {
    self.terminator != 0
  }

  pub fn max_free_block(&self) -> usize {
    self.max_free_block
  }

  pub fn total_size(&self) -> usize {
    self.total_size
  }

  #[cfg_attr(feature = "privileged-ram", inline(always))]
  pub fn init(
    &mut self,
    arena: &mut impl Storage,
  ) {
    if self.is_initialized() {
      return;
    }

    let base = arena.base_addr();
    let start = align_up!(base, ALIGN) - base;
    let end = align_down!(base + arena.capacity(), ALIGN) - base;

    let terminator = end - Self::HEADER_SIZE;
    let total_size = terminator - start;
    let first = Block::new(terminator, total_size - Self::HEADER_SIZE);

    arena.write(terminator, Block::terminator());
    arena.write(start, first);

    self.free_head = start;
    self.alloc_head = terminator;
    self.terminator = terminator;
    self.start = start;
    self.total_size = total_size;
    self.max_free_block = first.size;

    debug!(
      "heap initialized: buffer={} start={} terminator={} total={} first_free={}",
      arena.capacity(),
      start,
      terminator,
      total_size,
      first.size
    );
  }

  #[cfg_attr(feature = "privileged-ram", inline(always))]
  pub fn allocate(
    &mut self,
    arena: &mut impl Storage,
    size: usize,
  ) -> Result<Allocation> {
    self.init(arena);

    let out_of_memory = AllocError::OutOfMemory {
      requested: size,
      largest_free: self.max_free_block,
    };

    let wanted = match checked_align_up(size, ALIGN) {
      Some(wanted) if wanted > 0 && wanted <= self.max_free_block => wanted,
      _ => {
        debug!(
          "allocate({}) rejected: largest free block is {}",
          size, self.max_free_block
        );
        return Err(out_of_memory);
      }
    };

    let Some(fit) = self.best_fit(arena, wanted) else {
      debug!("allocate({}) failed: no single free block fits {}", size, wanted);
      return Err(out_of_memory);
    };

    let successor = arena.read(fit.block).next;
    self.insert_ordered(arena, List::Allocated, fit.block);

    if fit.slack > Self::HEADER_SIZE {
      let granted = arena.read(fit.block);
      arena.write(fit.block, Block::new(granted.next, wanted));
      let remainder = fit.block + Self::HEADER_SIZE + wanted;
      arena.write(remainder, Block::new(successor, fit.slack - Self::HEADER_SIZE));
      self.link(arena, List::Free, fit.prev, remainder);
    } else {
      self.link(arena, List::Free, fit.prev, successor);
    }

    self.refresh_max_free_block(arena);

    let allocation = Allocation::from_offset(fit.block + Self::HEADER_SIZE);
    trace!(
      "allocate({}) -> offset={} size={} max_free={}",
      size,
      allocation.offset,
      arena.read(fit.block).size,
      self.max_free_block
    );
    Ok(allocation)
  }

  #[cfg_attr(feature = "privileged-ram", inline(always))]
  pub fn free(
    &mut self,
    arena: &mut impl Storage,
    allocation: Allocation,
  ) {
    if !self.is_initialized() {
      warn!("free(offset={}) rejected: heap not initialized", allocation.offset);
      return;
    }

    let Some(block) = self.header_of(allocation) else {
      warn!("free(offset={}) rejected: outside managed span", allocation.offset);
      return;
    };

    let Some(alloc_prev) = self.find_allocated(arena, block) else {
      warn!("free(offset={}) rejected: not allocated", allocation.offset);
      return;
    };

    let next = arena.read(block).next;
    self.link(arena, List::Allocated, alloc_prev, next);

    let free_prev = self.insert_ordered(arena, List::Free, block);
    self.coalesce(arena, free_prev, block);

    trace!(
      "free(offset={}) max_free={}",
      allocation.offset, self.max_free_block
    );
  }

  /// Header offset of a live allocation, `None` if the handle is not live.
  pub fn live_block(
    &self,
    arena: &impl Storage,
    allocation: Allocation,
  ) -> Option<usize> {
    let block = self.header_of(allocation)?;
    self.find_allocated(arena, block).map(|_| block)
  }

  pub fn free_blocks<'a>(
    &self,
    arena: &'a impl Storage,
  ) -> Blocks<'a> {
    self.blocks(arena, List::Free)
  }

  pub fn allocated_blocks<'a>(
    &self,
    arena: &'a impl Storage,
  ) -> Blocks<'a> {
    self.blocks(arena, List::Allocated)
  }

  #[cfg_attr(feature = "privileged-ram", inline(always))]
  pub fn snapshot(
    &self,
    arena: &impl Storage,
  ) -> HeapStats {
    HeapStats::collect(
      self.allocated_blocks(arena),
      self.free_blocks(arena),
      Self::HEADER_SIZE,
      self.total_size,
    )
  }

  pub fn report(
    &self,
    arena: &impl Storage,
  ) {
    let stats = self.snapshot(arena);

    info!("------------------- heap state -------------------");
    info!("free list head         = {:#010x}", self.free_head);
    info!("allocated list head    = {:#010x}", self.alloc_head);
    info!("terminator             = {:#010x}", self.terminator);
    info!("max free block         = {:#010x}", self.max_free_block);
    info!("heap total size        = {:#010x}", self.total_size);
    info!("--------------------------------------------------");
    for line in stats.to_string().lines() {
      info!("{}", line);
    }
    info!("--------------------------------------------------");
  }

  fn blocks<'a>(
    &self,
    arena: &'a impl Storage,
    list: List,
  ) -> Blocks<'a> {
    Blocks {
      arena,
      cursor: self.head(list),
      terminator: self.terminator,
      header_size: Self::HEADER_SIZE,
    }
  }

  #[cfg_attr(feature = "privileged-ram", inline(always))]
  fn best_fit(
    &self,
    arena: &impl Storage,
    wanted: usize,
  ) -> Option<Fit> {
    let mut best: Option<Fit> = None;
    let mut prev = None;
    let mut current = self.free_head;

    while current != self.terminator {
      let block = arena.read(current);

      if wanted <= block.size {
        let slack = block.size - wanted;
        // strict comparison keeps the lowest-address block on ties
        if best.as_ref().is_none_or(|fit| slack < fit.slack) {
          best = Some(Fit { prev, block: current, slack });
        }
      }

      prev = Some(current);
      current = block.next;
    }

    best
  }

  /// Links `block` into `list` at its address-ordered position and returns
  /// its new predecessor (`None` for the list head).
  #[cfg_attr(feature = "privileged-ram", inline(always))]
  fn insert_ordered(
    &mut self,
    arena: &mut impl Storage,
    list: List,
    block: usize,
  ) -> Option<usize> {
    let mut prev = None;
    let mut current = self.head(list);

    while current < block {
      prev = Some(current);
      current = arena.read(current).next;
    }

    let inserted = arena.read(block);
    arena.write(block, Block::new(current, inserted.size));
    self.link(arena, list, prev, block);
    prev
  }

  /// Predecessor of `block` on the allocated list, `None` if not listed.
  #[cfg_attr(feature = "privileged-ram", inline(always))]
  fn find_allocated(
    &self,
    arena: &impl Storage,
    block: usize,
  ) -> Option<Option<usize>> {
    let mut prev = None;
    let mut current = self.alloc_head;

    while current <= block && current != self.terminator {
      if current == block {
        return Some(prev);
      }
      prev = Some(current);
      current = arena.read(current).next;
    }

    None
  }

  #[cfg_attr(feature = "privileged-ram", inline(always))]
  fn coalesce(
    &mut self,
    arena: &mut impl Storage,
    prev: Option<usize>,
    block: usize,
  ) {
    let freed = arena.read(block);
    let successor = freed.next;

    if successor != self.terminator && block + Self::HEADER_SIZE + freed.size == successor {
      let absorbed = arena.read(successor);
      arena.write(
        block,
        Block::new(absorbed.next, freed.size + absorbed.size + Self::HEADER_SIZE),
      );
    }

    // the list head is not a block and never absorbs its successor
    if let Some(prev) = prev {
      let previous = arena.read(prev);
      if prev + Self::HEADER_SIZE + previous.size == block {
        let freed = arena.read(block);
        arena.write(
          prev,
          Block::new(freed.next, previous.size + freed.size + Self::HEADER_SIZE),
        );
      }
    }

    self.refresh_max_free_block(arena);
  }

  #[cfg_attr(feature = "privileged-ram", inline(always))]
  fn refresh_max_free_block(
    &mut self,
    arena: &impl Storage,
  ) {
    self.max_free_block = self.free_blocks(arena).map(|block| block.size).max().unwrap_or(0);
  }

  fn header_of(
    &self,
    allocation: Allocation,
  ) -> Option<usize> {
    allocation
      .offset
      .checked_sub(Self::HEADER_SIZE)
      .filter(|block| *block >= self.start && *block < self.terminator)
  }

  fn head(
    &self,
    list: List,
  ) -> usize {
    match list {
      List::Free => self.free_head,
      List::Allocated => self.alloc_head,
    }
  }

  /// Points `prev` (or the list head) at `target`.
  fn link(
    &mut self,
    arena: &mut impl Storage,
    list: List,
    prev: Option<usize>,
    target: usize,
  ) {
    match (prev, list) {
      (Some(prev), _) => {
        let block = arena.read(prev);
        arena.write(prev, Block::new(target, block.size));
      }
      (None, List::Free) => self.free_head = target,
      (None, List::Allocated) => self.alloc_head = target,
    }
  }
}

/// Best-fit heap over a fixed `SIZE`-byte buffer.
///
/// Blocks are carved out of the buffer in place; every block carries a
/// [`HEADER_SIZE`](Self::HEADER_SIZE)-byte header holding its list link and
/// payload size. Free and allocated blocks are kept on two address-ordered
/// lists that share a terminator header at the top of the buffer.
///
/// The heap prepares itself on first use, so [`Heap::new`] is `const`.
/// There is no internal locking: exactly one execution context may use a
/// heap at a time, which `&mut self` enforces. For a process-wide heap
/// handing out raw pointers see [`global`](crate::global).
pub struct Heap<const SIZE: usize, const ALIGN: usize = DEFAULT_ALIGNMENT> {
  arena: Arena<SIZE>,
  core: HeapCore<ALIGN>,
}

impl<const SIZE: usize, const ALIGN: usize> Heap<SIZE, ALIGN> {
  /// Bytes reserved in front of every payload, terminator included.
  pub const HEADER_SIZE: usize = HeapCore::<ALIGN>::HEADER_SIZE;

  pub const fn new() -> Self {
    const {
      assert!(
        align_down!(SIZE, ALIGN) >= HeapCore::<ALIGN>::min_buffer_size(),
        "heap buffer cannot hold a terminator and one block"
      );
    }

    Self {
      arena: Arena::new(),
      core: HeapCore::new(),
    }
  }

  pub fn is_initialized(&self) -> bool {
    self.core.is_initialized()
  }

  /// Carves the buffer into one free block and the terminator.
  ///
  /// Called implicitly by [`allocate`](Self::allocate); runs once, later
  /// calls are no-ops.
  pub fn init(&mut self) {
    self.core.init(&mut self.arena);
  }

  /// Hands out a block of at least `size` bytes, rounded up to `ALIGN`.
  ///
  /// Chooses the free block with the smallest leftover; ties go to the
  /// lowest address. A leftover larger than one header is split off as a
  /// new free block, anything smaller stays inside the allocation.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<Allocation> {
    self.core.allocate(&mut self.arena, size)
  }

  /// Returns a block to the free list and merges it with adjacent free
  /// neighbours.
  ///
  /// A handle that is outside the heap or not currently allocated (double
  /// free, handle from another heap) is rejected with a warning and the
  /// heap is left untouched.
  pub fn free(
    &mut self,
    allocation: Allocation,
  ) {
    self.core.free(&mut self.arena, allocation);
  }

  /// Payload of a live allocation, `None` if the handle is not live.
  pub fn payload(
    &self,
    allocation: Allocation,
  ) -> Option<&[u8]> {
    let block = self.core.live_block(&self.arena, allocation)?;
    let size = self.arena.read(block).size;
    Some(&self.arena.0[allocation.offset..allocation.offset + size])
  }

  pub fn payload_mut(
    &mut self,
    allocation: Allocation,
  ) -> Option<&mut [u8]> {
    let block = self.core.live_block(&self.arena, allocation)?;
    let size = self.arena.read(block).size;
    Some(&mut self.arena.0[allocation.offset..allocation.offset + size])
  }

  /// Bytes granted to a live allocation; may exceed the request when an
  /// unsplittable remainder was absorbed.
  pub fn usable_size(
    &self,
    allocation: Allocation,
  ) -> Option<usize> {
    self
      .core
      .live_block(&self.arena, allocation)
      .map(|block| self.arena.read(block).size)
  }

  /// Size of the largest free block; 0 before initialization.
  pub fn max_free_block(&self) -> usize {
    self.core.max_free_block()
  }

  /// Usable bytes of the aligned buffer, terminator header excluded.
  pub fn total_size(&self) -> usize {
    self.core.total_size()
  }

  /// Address of arena offset 0.
  pub fn base_ptr(&self) -> *const u8 {
    self.arena.0.as_ptr()
  }

  /// Free blocks in address order.
  pub fn free_blocks(&self) -> Blocks<'_> {
    self.core.free_blocks(&self.arena)
  }

  /// Allocated blocks in address order.
  pub fn allocated_blocks(&self) -> Blocks<'_> {
    self.core.allocated_blocks(&self.arena)
  }

  /// Occupancy statistics from walking both lists. Read-only.
  pub fn snapshot(&self) -> HeapStats {
    self.core.snapshot(&self.arena)
  }

  /// Logs the internal state (list heads, terminator, cached max free
  /// block, total size) and a [`snapshot`](Self::snapshot) at info level,
  /// one line per field.
  pub fn report(&self) {
    self.core.report(&self.arena);
  }
}

impl<const SIZE: usize, const ALIGN: usize> Default for Heap<SIZE, ALIGN> {
  fn default() -> Self {
    Self::new()
  }
}

/// Address-ordered walk over one of the heap's lists.
pub struct Blocks<'a> {
  arena: &'a dyn Storage,
  cursor: usize,
  terminator: usize,
  header_size: usize,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    if self.cursor == self.terminator {
      return None;
    }

    let header = self.cursor;
    let block = self.arena.read(header);
    self.cursor = block.next;

    Some(BlockInfo {
      header,
      payload: header + self.header_size,
      size: block.size,
    })
  }
}
