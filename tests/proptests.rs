mod common;

use common::assert_tiles;
use privheap::{Allocation, Heap};
use proptest::collection::vec;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
  Allocate(usize),
  Free(usize),
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![
    (0usize..200).prop_map(Op::Allocate),
    any::<usize>().prop_map(Op::Free),
  ]
}

proptest! {
  #[test]
  fn random_scripts_keep_heap_tiled(ops in vec(op(), 1..120)) {
    let mut heap = Heap::<2048, 8>::new();
    heap.init();
    let initial = heap.max_free_block();
    let mut live: Vec<(Allocation, u8)> = Vec::new();

    for (step, op) in ops.into_iter().enumerate() {
      match op {
        Op::Allocate(size) => {
          let largest = heap.max_free_block();
          match heap.allocate(size) {
            Ok(block) => {
              prop_assert!(size > 0);
              let granted = heap.usable_size(block).unwrap();
              prop_assert!(granted >= size.div_ceil(8) * 8);
              prop_assert_eq!(block.offset() % 8, 0);

              let tag = step as u8;
              heap.payload_mut(block).unwrap().fill(tag);
              live.push((block, tag));
            }
            Err(_) => {
              prop_assert!(size == 0 || size.div_ceil(8) * 8 > largest);
            }
          }
        }
        Op::Free(index) if !live.is_empty() => {
          let (block, _) = live.swap_remove(index % live.len());
          heap.free(block);
        }
        Op::Free(_) => {}
      }

      assert_tiles(&heap);
      for (block, tag) in &live {
        prop_assert!(heap.payload(*block).unwrap().iter().all(|b| b == tag));
      }
    }

    for (block, _) in live.drain(..) {
      heap.free(block);
    }

    let free: Vec<_> = heap.free_blocks().collect();
    prop_assert_eq!(free.len(), 1);
    prop_assert_eq!(free[0].size, initial);
    prop_assert_eq!(heap.allocated_blocks().count(), 0);
  }
}

proptest! {
  #[test]
  fn snapshot_does_not_change_state(sizes in vec(1usize..64, 0..20)) {
    let mut heap = Heap::<1024, 4>::new();
    for size in sizes {
      let _ = heap.allocate(size);
    }

    let first = heap.snapshot();
    heap.report();
    prop_assert_eq!(heap.snapshot(), first);
  }
}
