//! Boundary-tag coalescing: merges a freshly-freed block with adjacent
//! free neighbors. The four cases below must between them consume every
//! free neighbor, preserving the invariant that no two adjacent blocks are
//! both free.

use log::trace;

use crate::block;
use crate::freelist::FreeLists;

/// Coalesces the block at `payload`, which must already have its
/// header/footer written as free, with any free neighbors. Returns the
/// payload address of the resulting block and leaves it inserted into its
/// class list.
pub(crate) unsafe fn coalesce(lists: &mut FreeLists, payload: usize) -> usize {
  unsafe {
    let size = block::size(payload);
    let prev = block::prev_payload(payload);
    let next = block::next_payload(payload);
    let prev_free = block::is_free(prev);
    let next_free = block::is_free(next);

    match (prev_free, next_free) {
      (false, false) => {
        trace!("coalesce: no free neighbors, payload={payload:#x} size={size}");
        lists.insert(payload, size);
        payload
      }
      (false, true) => {
        let next_size = block::size(next);
        trace!("coalesce: merging with next, payload={payload:#x} next={next:#x}");
        lists.remove(next, next_size);
        let new_size = size + next_size;
        block::set_header_footer(payload, new_size, false);
        lists.insert(payload, new_size);
        payload
      }
      (true, false) => {
        let prev_size = block::size(prev);
        trace!("coalesce: merging with prev, payload={payload:#x} prev={prev:#x}");
        lists.remove(prev, prev_size);
        let new_size = size + prev_size;
        block::set_header_footer(prev, new_size, false);
        lists.insert(prev, new_size);
        prev
      }
      (true, true) => {
        let prev_size = block::size(prev);
        let next_size = block::size(next);
        trace!("coalesce: merging with prev and next, payload={payload:#x}");
        lists.remove(prev, prev_size);
        lists.remove(next, next_size);
        let new_size = size + prev_size + next_size;
        block::set_header_footer(prev, new_size, false);
        lists.insert(prev, new_size);
        prev
      }
    }
  }
}
