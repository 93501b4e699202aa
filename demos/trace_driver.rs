//! A minimal replay driver for malloc-lab-style traces, letting you
//! sanity-check a trace file against the allocator from the command line.
//!
//! Trace format, one operation per line:
//!
//! ```text
//! a <id> <size>     allocate <size> bytes, remember the result as <id>
//! f <id>            free the block remembered as <id>
//! r <id> <size>     reallocate the block remembered as <id> to <size> bytes
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::process::ExitCode;
use std::ptr::NonNull;

use segfit::provider::SbrkProvider;
use segfit::Heap;

struct Args {
  trace_path: String,
  verbose: bool,
}

fn parse_args() -> Option<Args> {
  let mut trace_path = None;
  let mut verbose = false;

  for arg in env::args().skip(1) {
    match arg.as_str() {
      "-v" | "--verbose" => verbose = true,
      other => trace_path = Some(other.to_string()),
    }
  }

  Some(Args { trace_path: trace_path?, verbose })
}

fn main() -> ExitCode {
  env_logger::init();

  let Some(args) = parse_args() else {
    eprintln!("usage: trace_driver [-v|--verbose] <trace-file>");
    return ExitCode::FAILURE;
  };

  let contents = match fs::read_to_string(&args.trace_path) {
    Ok(c) => c,
    Err(e) => {
      eprintln!("failed to read {}: {e}", args.trace_path);
      return ExitCode::FAILURE;
    }
  };

  let provider = match SbrkProvider::new() {
    Ok(p) => p,
    Err(e) => {
      eprintln!("failed to start memory provider: {e}");
      return ExitCode::FAILURE;
    }
  };
  let mut heap = match Heap::new(provider) {
    Ok(h) => h,
    Err(e) => {
      eprintln!("failed to initialize heap: {e}");
      return ExitCode::FAILURE;
    }
  };

  let mut live: HashMap<u64, NonNull<u8>> = HashMap::new();
  let mut ops = 0usize;
  let mut failures = 0usize;

  for (lineno, line) in contents.lines().enumerate() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
      continue;
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    ops += 1;

    let ok = match fields.as_slice() {
      ["a", id, size] => match (id.parse::<u64>(), size.parse::<usize>()) {
        (Ok(id), Ok(size)) => match heap.allocate(size) {
          Some(ptr) => {
            live.insert(id, ptr);
            true
          }
          None => false,
        },
        _ => false,
      },
      ["f", id] => match id.parse::<u64>() {
        Ok(id) => {
          heap.free(live.remove(&id));
          true
        }
        Err(_) => false,
      },
      ["r", id, size] => match (id.parse::<u64>(), size.parse::<usize>()) {
        (Ok(id), Ok(size)) => {
          let old = live.remove(&id);
          match heap.reallocate(old, size) {
            Some(ptr) => {
              live.insert(id, ptr);
              true
            }
            None => size == 0,
          }
        }
        _ => false,
      },
      _ => {
        eprintln!("line {}: unrecognized trace op: {line:?}", lineno + 1);
        false
      }
    };

    if !ok {
      failures += 1;
    }

    if args.verbose {
      let report = heap.check(false);
      if !report.is_consistent() {
        eprintln!("line {}: heap check failed: {:?}", lineno + 1, report.violations);
      }
    }
  }

  let report = heap.check(args.verbose);
  println!(
    "{ops} ops replayed, {failures} failures, {} live allocations, consistent = {}",
    live.len(),
    report.is_consistent()
  );

  if report.is_consistent() && failures == 0 {
    ExitCode::SUCCESS
  } else {
    ExitCode::FAILURE
  }
}
