use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record};
use privheap::Heap;

static LINES: Mutex<Vec<(Level, String)>> = Mutex::new(Vec::new());

struct Capture;

impl Log for Capture {
  fn enabled(
    &self,
    _metadata: &Metadata,
  ) -> bool {
    true
  }

  fn log(
    &self,
    record: &Record,
  ) {
    LINES.lock().unwrap().push((record.level(), record.args().to_string()));
  }

  fn flush(&self) {}
}

static CAPTURE: Capture = Capture;

fn info_lines() -> Vec<String> {
  LINES
    .lock()
    .unwrap()
    .iter()
    .filter(|(level, _)| *level == Level::Info)
    .map(|(_, line)| line.clone())
    .collect()
}

// One test per binary: the logger is process-wide.
#[test]
fn report_logs_heads_terminator_and_max_free_block() {
  log::set_logger(&CAPTURE).unwrap();
  log::set_max_level(LevelFilter::Trace);

  type SmallHeap = Heap<257, 4>;
  const H: usize = SmallHeap::HEADER_SIZE;

  let mut heap = SmallHeap::new();
  let block = heap.allocate(16).unwrap();
  assert_eq!(block.offset(), H);

  heap.report();
  let lines = info_lines();

  let terminator = 256 - H;
  let free_head = H + 16;
  let max_free = terminator - free_head - H;
  assert_eq!(heap.max_free_block(), max_free);

  let expected = [
    format!("free list head         = {:#010x}", free_head),
    format!("allocated list head    = {:#010x}", 0),
    format!("terminator             = {:#010x}", terminator),
    format!("max free block         = {:#010x}", max_free),
    format!("heap total size        = {:#010x}", terminator),
    "free blocks            = 1".to_string(),
    format!("max free block         = {}", max_free),
    "allocated blocks       = 1".to_string(),
    "max allocated block    = 16".to_string(),
    format!("heap total bytes       = {}", terminator),
  ];
  for line in &expected {
    assert!(lines.contains(line), "missing {line:?} in {lines:#?}");
  }

  // a rejected free is reported as a warning, not as state
  heap.free(block);
  heap.free(block);
  let warnings = LINES
    .lock()
    .unwrap()
    .iter()
    .filter(|(level, line)| *level == Level::Warn && line.contains("not allocated"))
    .count();
  assert_eq!(warnings, 1);
}
