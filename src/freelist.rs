//! Free-list link operations: insert/remove a free block from its size
//! class's doubly linked list, using the 32-bit signed deltas stored in
//! the block's own payload bytes (see [`crate::block`]).

use log::trace;

use crate::block;
use crate::config::NUM_CLASSES;
use crate::sclass::class_of;

/// The 7-slot segregated index: one head payload-address per size class.
#[derive(Debug)]
pub(crate) struct FreeLists {
  heads: [Option<usize>; NUM_CLASSES],
}

impl FreeLists {
  pub(crate) fn new() -> Self {
    Self { heads: [None; NUM_CLASSES] }
  }

  pub(crate) fn heads(&self) -> &[Option<usize>; NUM_CLASSES] {
    &self.heads
  }

  /// Prepends `payload` (a free block of `size` bytes) to its class's
  /// list, making it the new head.
  pub(crate) unsafe fn insert(&mut self, payload: usize, size: usize) {
    let c = class_of(size);
    trace!("freelist: insert payload={payload:#x} size={size} class={c}");

    match self.heads[c] {
      None => unsafe {
        block::write_pred_delta(payload, 0);
        block::write_succ_delta(payload, 0);
      },
      Some(old_head) => unsafe {
        block::write_succ_delta(payload, block::delta_between(payload, old_head));
        block::write_pred_delta(payload, 0);
        block::write_pred_delta(old_head, block::delta_between(old_head, payload));
      },
    }
    self.heads[c] = Some(payload);
  }

  /// Removes `payload` (a free block of `size` bytes) from its class's
  /// list. `payload` must currently be a member of that list.
  pub(crate) unsafe fn remove(&mut self, payload: usize, size: usize) {
    let c = class_of(size);
    trace!("freelist: remove payload={payload:#x} size={size} class={c}");

    if self.heads[c] == Some(payload) {
      let succ = unsafe { block::succ_of(payload) };
      self.heads[c] = succ;
      if let Some(s) = succ {
        unsafe { block::write_pred_delta(s, 0) };
      }
      return;
    }

    let pred = unsafe { block::pred_of(payload) }
      .expect("non-head free block must have a predecessor");
    let succ = unsafe { block::succ_of(payload) };

    match succ {
      None => unsafe { block::write_succ_delta(pred, 0) },
      Some(s) => unsafe {
        block::write_succ_delta(pred, block::delta_between(pred, s));
        block::write_pred_delta(s, block::delta_between(s, pred));
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::alloc::{Layout, alloc_zeroed, dealloc};

  /// A small heap-backed scratch arena for exercising link ops directly,
  /// independent of the full `Heap`/`MemoryProvider` machinery.
  struct Scratch {
    ptr: *mut u8,
    layout: Layout,
  }

  impl Scratch {
    fn new(bytes: usize) -> Self {
      let layout = Layout::from_size_align(bytes, 8).unwrap();
      let ptr = unsafe { alloc_zeroed(layout) };
      Self { ptr, layout }
    }

    fn payload_at(&self, offset: usize) -> usize {
      self.ptr as usize + offset
    }
  }

  impl Drop for Scratch {
    fn drop(&mut self) {
      unsafe { dealloc(self.ptr, self.layout) };
    }
  }

  #[test]
  fn insert_and_remove_single_block() {
    let scratch = Scratch::new(256);
    let p = scratch.payload_at(16);
    let mut lists = FreeLists::new();

    unsafe {
      lists.insert(p, 32);
      assert_eq!(lists.heads()[class_of(32)], Some(p));
      assert_eq!(block::pred_of(p), None);
      assert_eq!(block::succ_of(p), None);

      lists.remove(p, 32);
      assert_eq!(lists.heads()[class_of(32)], None);
    }
  }

  #[test]
  fn insert_prepends_and_remove_middle_relinks_neighbors() {
    let scratch = Scratch::new(256);
    let a = scratch.payload_at(16);
    let b = scratch.payload_at(64);
    let c = scratch.payload_at(128);
    let mut lists = FreeLists::new();

    unsafe {
      // All in the same class (size 32 -> class 0).
      lists.insert(a, 32);
      lists.insert(b, 32);
      lists.insert(c, 32);

      // Most recently inserted is head: c -> b -> a.
      let class = class_of(32);
      assert_eq!(lists.heads()[class], Some(c));
      assert_eq!(block::succ_of(c), Some(b));
      assert_eq!(block::succ_of(b), Some(a));
      assert_eq!(block::succ_of(a), None);
      assert_eq!(block::pred_of(c), None);
      assert_eq!(block::pred_of(b), Some(c));
      assert_eq!(block::pred_of(a), Some(b));

      // Remove the middle element; c and a should now link directly.
      lists.remove(b, 32);
      assert_eq!(block::succ_of(c), Some(a));
      assert_eq!(block::pred_of(a), Some(c));
    }
  }
}
