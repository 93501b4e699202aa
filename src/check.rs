//! Consistency checker: walks the arena and the free lists, verifying the
//! structural invariants a well-formed heap must hold. Reports violations;
//! never repairs.

use log::warn;

use crate::block;
use crate::config::CLASS_BOUNDS;
use crate::freelist::FreeLists;

/// Result of a single [`crate::Heap::check`] call.
#[derive(Debug, Default, Clone)]
pub struct CheckReport {
  /// Number of blocks visited walking the arena from prologue to epilogue.
  pub blocks_walked: usize,
  /// Number of free blocks found across all class lists.
  pub free_blocks_in_lists: usize,
  /// Human-readable descriptions of any invariant violations found.
  pub violations: Vec<String>,
}

impl CheckReport {
  /// Whether the heap was found to satisfy every checked invariant.
  pub fn is_consistent(&self) -> bool {
    self.violations.is_empty()
  }
}

/// Walks the arena from the first real block (just after the prologue,
/// at `first_block`) to the epilogue (whose header sits at
/// `epilogue_addr`), then walks every class list in `lists`.
pub(crate) unsafe fn walk(
  first_block: usize,
  epilogue_addr: usize,
  lists: &FreeLists,
  verbose: bool,
) -> CheckReport {
  let mut report = CheckReport::default();
  let mut prev_was_free = false;
  let mut p = first_block;

  unsafe {
    loop {
      let size = block::size(p);
      if size == 0 {
        if p != epilogue_addr {
          report.violations.push(format!(
            "zero-size block at {p:#x} before reaching recorded epilogue {epilogue_addr:#x}"
          ));
        }
        if block::is_free(p) {
          report.violations.push(format!("epilogue at {p:#x} is not marked allocated"));
        }
        break;
      }

      let hdr = block::read_word(block::header_addr(p));
      let ftr = block::read_word(block::footer_addr(p, size));
      if hdr != ftr {
        report.violations.push(format!(
          "header/footer mismatch at payload {p:#x}: header={hdr:#x} footer={ftr:#x}"
        ));
      }

      if p % crate::config::ALIGNMENT != 0 {
        report.violations.push(format!("payload {p:#x} is not 8-byte aligned"));
      }

      let free = block::is_free(p);
      if free && prev_was_free {
        report.violations.push(format!(
          "two adjacent free blocks at/around payload {p:#x} (coalescing missed a merge)"
        ));
      }
      prev_was_free = free;

      if verbose {
        log::debug!(
          "check: block payload={p:#x} size={size} {}",
          if free { "free" } else { "allocated" }
        );
      }

      report.blocks_walked += 1;
      p = block::next_payload(p);
    }

    for (class, &head) in lists.heads().iter().enumerate() {
      let lower_bound = if class == 0 { 0 } else { CLASS_BOUNDS[class - 1] + 1 };
      let upper_bound = CLASS_BOUNDS[class];

      let Some(head) = head else { continue };
      if block::pred_of(head).is_some() {
        report.violations.push(format!(
          "class {class} head {head:#x} has a non-zero predecessor delta"
        ));
      }

      let mut node = Some(head);
      let mut prev: Option<usize> = None;
      while let Some(n) = node {
        if !block::is_free(n) {
          report.violations.push(format!(
            "class {class} list contains allocated block at {n:#x}"
          ));
        }
        let size = block::size(n);
        if size < lower_bound || size > upper_bound {
          report.violations.push(format!(
            "class {class} list member {n:#x} has size {size}, outside bounds [{lower_bound}, {upper_bound}]"
          ));
        }

        report.free_blocks_in_lists += 1;
        prev = Some(n);
        node = block::succ_of(n);
      }

      if let Some(tail) = prev {
        if block::succ_of(tail).is_some() {
          report.violations.push(format!(
            "class {class} tail {tail:#x} has a non-zero successor delta"
          ));
        }
      }
    }
  }

  if !report.violations.is_empty() {
    for v in &report.violations {
      warn!("heap check: {v}");
    }
  }

  report
}
