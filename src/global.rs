//! Process-wide heap with a `malloc`/`free` style surface.
//!
//! One heap sized by [`config`](crate::config) lives in a `static` and is
//! initialized on the first allocation. Its list bookkeeping and its buffer
//! sit in separate cells: calls borrow the bookkeeping mutably, while the
//! buffer is only reached through raw pointers, so pointers returned by
//! [`malloc`] stay usable across later calls.
//!
//! With the `privileged-ram` feature the heap is placed in `.lmudata.heap`
//! and every entry point, with the engine inlined into it, in
//! `.lmutext.heap`.
//!
//! Nothing here locks. Every function is `unsafe` because the caller must
//! guarantee that only one execution context (no second thread, no
//! interrupt handler) is inside this module at a time.

use core::{cell::UnsafeCell, ptr};

use log::warn;

use crate::{
  align_down,
  arena::{RawArena, StaticArena, Storage},
  config::{BYTE_ALIGNMENT, HEAP_BUFFER_SIZE},
  heap::{Allocation, HeapCore},
  stats::HeapStats,
};

const _: () = assert!(
  align_down!(HEAP_BUFFER_SIZE, BYTE_ALIGNMENT) >= HeapCore::<BYTE_ALIGNMENT>::min_buffer_size(),
  "PRIVHEAP_BUFFER_SIZE cannot hold a terminator and one block"
);

struct StaticHeap {
  core: UnsafeCell<HeapCore<BYTE_ALIGNMENT>>,
  arena: StaticArena<HEAP_BUFFER_SIZE>,
}

// Access is restricted to one execution context by the unsafe API below.
unsafe impl Sync for StaticHeap {}

impl StaticHeap {
  const fn new() -> Self {
    Self {
      core: UnsafeCell::new(HeapCore::new()),
      arena: StaticArena::new(),
    }
  }

  /// # Safety
  ///
  /// No other borrow of the bookkeeping may be alive while the returned one
  /// is. The buffer is never borrowed, only pointed into.
  #[allow(clippy::mut_from_ref)]
  unsafe fn parts(&self) -> (&mut HeapCore<BYTE_ALIGNMENT>, RawArena) {
    (unsafe { &mut *self.core.get() }, self.arena.raw())
  }
}

#[cfg_attr(feature = "privileged-ram", unsafe(link_section = ".lmudata.heap"))]
static HEAP: StaticHeap = StaticHeap::new();

/// Allocates `size` bytes from the process-wide heap.
///
/// Returns null when no free block is large enough or `size` is zero.
///
/// # Safety
///
/// Must not be called concurrently or reentrantly with any other function
/// of this module.
#[cfg_attr(feature = "privileged-ram", unsafe(link_section = ".lmutext.heap"))]
pub unsafe fn malloc(size: usize) -> *mut u8 {
  let (core, mut arena) = unsafe { HEAP.parts() };

  match core.allocate(&mut arena, size) {
    Ok(allocation) => arena.ptr_at(allocation.offset()),
    Err(_) => ptr::null_mut(),
  }
}

/// Returns a pointer obtained from [`malloc`] to the process-wide heap.
///
/// Null is ignored. Pointers that do not belong to a live allocation are
/// rejected and logged.
///
/// # Safety
///
/// Same single-context requirement as [`malloc`]. The memory behind `ptr`
/// must not be used afterwards.
#[cfg_attr(feature = "privileged-ram", unsafe(link_section = ".lmutext.heap"))]
pub unsafe fn free(ptr: *mut u8) {
  if ptr.is_null() {
    return;
  }

  let (core, mut arena) = unsafe { HEAP.parts() };
  let Some(offset) = (ptr as usize).checked_sub(arena.base_addr()) else {
    warn!("free({:p}) rejected: below heap buffer", ptr);
    return;
  };

  core.free(&mut arena, Allocation::from_offset(offset));
}

/// Statistics of the process-wide heap.
///
/// # Safety
///
/// Same single-context requirement as [`malloc`].
#[cfg_attr(feature = "privileged-ram", unsafe(link_section = ".lmutext.heap"))]
pub unsafe fn snapshot() -> HeapStats {
  let (core, arena) = unsafe { HEAP.parts() };
  core.snapshot(&arena)
}

/// Logs the state of the process-wide heap, see
/// [`Heap::report`](crate::Heap::report).
///
/// # Safety
///
/// Same single-context requirement as [`malloc`].
#[cfg_attr(feature = "privileged-ram", unsafe(link_section = ".lmutext.heap"))]
pub unsafe fn report() {
  let (core, arena) = unsafe { HEAP.parts() };
  core.report(&arena);
}

#[cfg(test)]
mod tests {
  use super::*;

  // The only test touching the process-wide heap; others use local heaps.
  #[test]
  fn test_malloc_free_through_raw_pointers() {
    unsafe {
      assert!(malloc(0).is_null());
      free(ptr::null_mut());

      let before = snapshot();
      assert_eq!(before.allocated.count, 0);

      let size = 2 * BYTE_ALIGNMENT;
      let first = malloc(size);
      assert!(!first.is_null());
      assert_eq!(first as usize % BYTE_ALIGNMENT, 0);
      first.write_bytes(0x5A, size);

      // earlier pointers stay writable after later heap calls
      let second = malloc(BYTE_ALIGNMENT);
      assert!(!second.is_null());
      first.write(0x11);
      second.write_bytes(0x22, BYTE_ALIGNMENT);
      report();
      let stats = snapshot();
      first.add(1).write(0x33);

      assert_eq!(*first, 0x11);
      assert_eq!(*first.add(1), 0x33);
      assert_eq!(*second, 0x22);
      assert_eq!(stats.allocated.count, 2);
      assert_eq!(stats.allocated.max_size, size);

      free(second);
      assert_eq!(*first, 0x11);

      free(first);
      free(first);
      free(first.wrapping_add(1));

      let after = snapshot();
      assert_eq!(after.allocated.count, 0);
      assert_eq!(after.free.count, 1);
      assert_eq!(after.free.max_size, before.free.max_size);
      assert_eq!(after.accounted_bytes(), after.heap_total);
    }
  }
}
