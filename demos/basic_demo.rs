//! Walks through allocate/write/free/reallocate against a real `sbrk`-backed
//! heap, printing the program break at each step. Useful for inspecting the
//! process with `pmap`, `htop`, or `gdb` while it runs.

use segfit::provider::SbrkProvider;
use segfit::Heap;

fn print_program_break(label: &str, heap: &Heap<SbrkProvider>) {
  println!("[{label}] arena_hi (program break) = {:#x}", heap.arena_hi());
}

fn main() {
  env_logger::init();

  let provider = SbrkProvider::new().expect("sbrk provider should initialize");
  let mut heap = Heap::new(provider).expect("heap should initialize");

  print_program_break("start", &heap);

  println!("\n[1] allocate 100 bytes");
  let a = heap.allocate(100).expect("allocate should succeed");
  unsafe { a.as_ptr().write_bytes(0x11, 100) };
  println!("    a = {:?}", a);

  println!("\n[2] allocate 200 bytes");
  let b = heap.allocate(200).expect("allocate should succeed");
  unsafe { b.as_ptr().write_bytes(0x22, 200) };
  println!("    b = {:?}", b);

  println!("\n[3] free a, then allocate 100 bytes again (expect reuse)");
  heap.free(Some(a));
  let c = heap.allocate(100).expect("allocate should succeed");
  println!("    c = {:?}, reused a's block? {}", c, c == a);

  println!("\n[4] reallocate b to 4096 bytes, verify content survives");
  let grown = heap.reallocate(Some(b), 4096).expect("reallocate should succeed");
  let bytes = unsafe { std::slice::from_raw_parts(grown.as_ptr(), 200) };
  println!("    content preserved: {}", bytes.iter().all(|&byte| byte == 0x22));

  print_program_break("before large allocation", &heap);
  let big = heap.allocate(64 * 1024).expect("allocate should succeed");
  println!("\n[5] allocated 64 KiB block at {:?}", big);
  print_program_break("after large allocation", &heap);

  let report = heap.check(true);
  println!("\n[6] consistency check: {} blocks walked, consistent = {}",
    report.blocks_walked, report.is_consistent());
}
