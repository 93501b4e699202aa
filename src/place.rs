//! Placement: splits a free block on allocation when the remainder would
//! still be a viable block.

use log::trace;

use crate::block;
use crate::config::MIN_BLOCK;
use crate::freelist::FreeLists;

/// Places an allocation of `asize` bytes into the free block at `payload`,
/// which must currently be free, a member of its class list, and have
/// `size(payload) >= asize`. Splits off and re-inserts the remainder when
/// it would be at least [`MIN_BLOCK`] bytes; otherwise allocates the whole
/// block to avoid leaving an unusable sub-minimum fragment.
pub(crate) unsafe fn place(lists: &mut FreeLists, payload: usize, asize: usize) {
  unsafe {
    let csize = block::size(payload);
    lists.remove(payload, csize);

    if csize - asize >= MIN_BLOCK {
      trace!("place: splitting payload={payload:#x} csize={csize} asize={asize}");
      block::set_header_footer(payload, asize, true);

      let remainder = block::next_payload(payload);
      let remainder_size = csize - asize;
      block::set_header_footer(remainder, remainder_size, false);
      lists.insert(remainder, remainder_size);
    } else {
      trace!("place: allocating whole block payload={payload:#x} csize={csize}");
      block::set_header_footer(payload, csize, true);
    }
  }
}
