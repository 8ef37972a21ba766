//! Build-time configuration of the process-wide heap.
//!
//! Values come from `build.rs`, which reads `PRIVHEAP_BUFFER_SIZE` and
//! `PRIVHEAP_ALIGNMENT` (decimal or `0x` hex) from the build environment.

include!(concat!(env!("OUT_DIR"), "/heap_config.rs"));

/// Size in bytes of the buffer backing [`global`](crate::global).
pub const HEAP_BUFFER_SIZE: usize = HEAP_BUFFER_SIZE_CFG;

/// Allocation granularity of the process-wide heap. Always a power of two.
pub const BYTE_ALIGNMENT: usize = BYTE_ALIGNMENT_CFG;

/// Whether the heap is placed in the privileged RAM link sections.
pub const PRIVILEGED_RAM: bool = cfg!(feature = "privileged-ram");

/// Link section holding the process-wide heap, if placement is enabled.
pub const HEAP_SECTION: Option<&str> = if PRIVILEGED_RAM { Some(".lmudata.heap") } else { None };

/// Link section holding the `global` entry points, if placement is enabled.
pub const CODE_SECTION: Option<&str> = if PRIVILEGED_RAM { Some(".lmutext.heap") } else { None };

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_generated_values_are_usable() {
    assert!(BYTE_ALIGNMENT.is_power_of_two());
    assert!(BYTE_ALIGNMENT <= crate::heap::ARENA_ALIGNMENT);
    assert!(HEAP_BUFFER_SIZE > 0);
    assert_eq!(HEAP_SECTION.is_some(), PRIVILEGED_RAM);
    assert_eq!(CODE_SECTION.is_some(), PRIVILEGED_RAM);
    if let (Some(data), Some(code)) = (HEAP_SECTION, CODE_SECTION) {
      assert_eq!(data, ".lmudata.heap");
      assert_eq!(code, ".lmutext.heap");
    }
  }
}
