//! # privheap - A Fixed-Buffer Best-Fit Heap
//!
//! This crate provides a small **best-fit heap** that serves variable-length
//! allocations out of one statically sized byte buffer. It is meant to stand
//! in for a general-purpose heap where there is none: firmware, boot code,
//! privileged execution contexts.
//!
//! ## Overview
//!
//! The buffer is carved into blocks. Every block starts with a header, and
//! every header sits on exactly one of two address-ordered lists, the free
//! list or the allocated list. Both lists end at the same terminator header
//! at the top of the buffer:
//!
//! ```text
//!   Heap Buffer (aligned start ... aligned end):
//!
//!   ┌─────┬────────┬─────┬───────────┬─────┬────────┬──────┐
//!   │ hdr │ alloc  │ hdr │   free    │ hdr │ alloc  │ term │
//!   │  A  │  16 B  │  F  │   40 B    │  B  │  24 B  │  T   │
//!   └─────┴────────┴─────┴───────────┴─────┴────────┴──────┘
//!
//!   free list:      head -> F -> T
//!   allocated list: head -> A -> B -> T
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   privheap
//!   ├── align   - Alignment macros (align_up!, align_down!)
//!   ├── arena   - Byte storage behind a heap (internal)
//!   ├── block   - Block header encoding (internal) and BlockInfo
//!   ├── config  - Build-time configuration of the process-wide heap
//!   ├── error   - AllocError
//!   ├── global  - Process-wide heap with malloc/free entry points
//!   ├── heap    - Heap: initialization, allocation, free, coalescing
//!   └── stats   - HeapStats snapshot
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use privheap::Heap;
//!
//! let mut heap: Heap<256, 8> = Heap::new();
//!
//! let block = heap.allocate(21).unwrap();
//! assert_eq!(heap.usable_size(block), Some(24));
//!
//! heap.payload_mut(block).unwrap().fill(0x42);
//! heap.free(block);
//!
//! let stats = heap.snapshot();
//! assert_eq!(stats.allocated.count, 0);
//! assert_eq!(stats.free.count, 1);
//! ```
//!
//! ## How It Works
//!
//! Allocation rounds the request up to the alignment and walks the whole
//! free list looking for the block that leaves the least slack:
//!
//! ```text
//!   request 16:   [40 B] -> [16 B] -> [24 B] -> term
//!                             ▲
//!                             └── exact fit wins, ties go to the lower address
//!
//!   split when the slack is larger than a header:
//!
//!   ┌─────┬───────────────────────┐      ┌─────┬────────┬─────┬──────────┐
//!   │ hdr │        64 B           │  ->  │ hdr │  24 B  │ hdr │   24 B   │
//!   └─────┴───────────────────────┘      └─────┴────────┴─────┴──────────┘
//!                                          allocated      new free block
//! ```
//!
//! Freeing re-inserts the block at its address-ordered position and merges
//! it with the free neighbour right after it and the one right before it,
//! whenever they touch:
//!
//! ```text
//!   before:  [free 16][freed 24][free 40]
//!   after:   [free 16 + hdr + 24 + hdr + 40]
//! ```
//!
//! ## Limitations
//!
//! - **Single context only**: no locking; one caller at a time
//! - **One granularity**: every allocation is aligned to `ALIGN`
//! - **Neighbour coalescing only**: no compaction, fragmentation can make a
//!   request fail although enough bytes are free in total
//!
//! ## Safety
//!
//! The [`Heap`] engine is written without `unsafe`: links are buffer offsets
//! and payloads are handed out as [`Allocation`] handles. The only `unsafe`
//! blocks read and write headers of the process-wide buffer through raw
//! pointers. The [`global`] module, which hands those raw pointers out, is
//! unsafe to call.

pub mod align;
mod arena;
mod block;
pub mod config;
mod error;
pub mod global;
mod heap;
mod stats;

pub use block::BlockInfo;
pub use error::{AllocError, Result};
pub use heap::{ARENA_ALIGNMENT, Allocation, Blocks, DEFAULT_ALIGNMENT, Heap};
pub use stats::{HeapStats, ListStats};
