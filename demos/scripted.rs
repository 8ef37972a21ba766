use privheap::{config, global};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Routes the heap's `log` records to stdout; `PRIVHEAP_LOG` overrides the
/// default `info` filter.
fn init_logging() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_env("PRIVHEAP_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();
}

/// Prints the program break using `sbrk(0)`.
/// The fixed heap lives in a static buffer, so the break should not move.
#[cfg(unix)]
fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { libc::sbrk(0) },
  );
}

#[cfg(not(unix))]
fn print_program_break(_label: &str) {}

/// Allocates `size` bytes and prints the heap statistics.
unsafe fn step(
  label: &str,
  size: usize,
) -> *mut u8 {
  let ptr = unsafe { global::malloc(size) };

  if ptr.is_null() {
    println!("\n[{}] malloc({:#x}) failed: out of memory", label, size);
  } else {
    println!("\n[{}] malloc({:#x}) = {:?}", label, size, ptr);
  }
  print_stats();

  ptr
}

/// Frees `ptr` and prints the heap statistics.
unsafe fn release(
  label: &str,
  ptr: *mut u8,
) {
  unsafe { global::free(ptr) };
  println!("\n[{}] free({:?})", label, ptr);
  print_stats();
}

/// Prints the statistics and logs the full heap state.
fn print_stats() {
  let stats = unsafe { global::snapshot() };
  println!("{stats}");
  unsafe { global::report() };
}

fn main() {
  init_logging();

  println!(
    "heap buffer = {} bytes, alignment = {}, section = {:?}",
    config::HEAP_BUFFER_SIZE,
    config::BYTE_ALIGNMENT,
    config::HEAP_SECTION,
  );
  print_stats();
  print_program_break("start");

  // The demo is the only execution context touching the global heap.
  unsafe {
    let pt1 = step("1", 0x10);
    let mut pt2 = step("2", 0x15);
    let mut pt3 = step("3", 0x20);
    let pt4 = step("4", 0x10);
    let pt5 = step("5", 0x6c);

    release("free 2", pt2);
    pt2 = step("6", 0x1);

    release("7", pt4);
    release("8", pt3);

    // pt3 and pt4 were neighbours; their merged block serves this request
    pt3 = step("9", 0x38);

    release("10", pt1);
    release("11", pt5);
    release("12", pt2);
    release("13", pt3);
  }

  print_program_break("end");
}
