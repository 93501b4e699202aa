//! The public allocator: ties the block layer, segregated index,
//! coalescer, and placement policy together over a [`MemoryProvider`], and
//! dispatches `allocate`/`free`/`reallocate`/`check`.
//!
//! ## Arena prefix
//!
//! The 7 segregated-list heads live in `Heap` itself rather than inside the
//! arena bytes (see DESIGN.md for the rationale). The arena itself only
//! carries the classic prologue/epilogue prefix:
//!
//! ```text
//! [ pad(4) ][ prologue header(4) ][ prologue footer(4) ][ epilogue header(4) ]
//! ```
//!
//! The prologue is a zero-payload allocated block of size 8 (header +
//! footer, no payload bytes) and the epilogue is a zero-size allocated
//! header sentinel. Both exist purely to remove edge cases from
//! coalescing: every real block always has a header+footer to its left
//! and a header to its right.

use std::ptr::{self, NonNull};

use log::{debug, trace};

use crate::align_up;
use crate::block;
use crate::check::{self, CheckReport};
use crate::coalesce::coalesce;
use crate::config::{AllocatorConfig, DWORD, MIN_BLOCK, OVERHEAD, WORD};
use crate::error::AllocError;
use crate::freelist::FreeLists;
use crate::place::place;
use crate::provider::MemoryProvider;

/// A segregated-fit allocator over a single growable arena.
///
/// `Heap` owns all of the allocator's mutable state: the segregated index,
/// the provider it grows through, and the two addresses (`heap_listp`,
/// `epilogue_addr`) that bound the walkable block chain. It is plain
/// single-threaded state — wrap it in a `Mutex` for multi-threaded use.
pub struct Heap<P: MemoryProvider> {
  provider: P,
  freelists: FreeLists,
  /// Payload address of the first real block (right after the
  /// prologue).
  heap_listp: usize,
  /// Address of the current epilogue header (a zero-size allocated
  /// sentinel one past the last real block).
  epilogue_addr: usize,
  config: AllocatorConfig,
}

impl<P: MemoryProvider> Heap<P> {
  /// Lays down the prologue/epilogue prefix and performs the initial
  /// heap extension.
  pub fn with_config(config: AllocatorConfig, mut provider: P) -> Result<Self, AllocError> {
    // pad(4) + prologue header(4) + prologue footer(4) + epilogue header(4)
    let prefix_bytes = 4 * WORD;
    let prefix_base = provider.extend(prefix_bytes)?;

    let prologue_payload = prefix_base + 2 * WORD; // skip the alignment pad
    unsafe {
      block::set_header_footer(prologue_payload, DWORD, true);
      // epilogue_addr is the epilogue's *payload* address (zero-size
      // block), matching the convention every other block.rs helper
      // uses; its header word lives at header_addr(epilogue_addr).
      let epilogue_addr = block::next_payload(prologue_payload);
      block::write_word(block::header_addr(epilogue_addr), block::pack(0, true));

      let mut heap = Self {
        provider,
        freelists: FreeLists::new(),
        heap_listp: prologue_payload,
        epilogue_addr,
        config,
      };

      let initial_words = heap.config.chunk_bytes / WORD;
      heap.extend(initial_words)?;

      debug!(
        "heap initialized: heap_listp={:#x} epilogue={:#x}",
        heap.heap_listp, heap.epilogue_addr
      );
      Ok(heap)
    }
  }

  /// Constructs a heap with the default configuration.
  pub fn new(provider: P) -> Result<Self, AllocError> {
    Self::with_config(AllocatorConfig::default(), provider)
  }

  /// Requests heap growth of at least `words` words (rounded up to an
  /// even count to stay 8-byte aligned), overwrites the old epilogue
  /// with a new free block header, writes a fresh epilogue after it,
  /// then coalesces. Returns the resulting free block's payload address.
  fn extend(&mut self, words: usize) -> Result<usize, AllocError> {
    let words = if words % 2 != 0 { words + 1 } else { words };
    let bytes = words * WORD;

    trace!("extend: requesting {bytes} bytes (rounded from {words} words)");
    let new_region = self.provider.extend(bytes)?;
    debug_assert_eq!(
      new_region,
      self.epilogue_addr,
      "provider did not extend contiguously from the old epilogue"
    );

    // new_region is the old epilogue's payload-style address (a
    // zero-size block), so it's already the new free block's payload
    // address; its header overwrites the old epilogue's header at
    // header_addr(new_region).
    let new_payload = new_region;
    unsafe {
      block::set_header_footer(new_payload, bytes, false);

      let epilogue_addr = block::next_payload(new_payload);
      block::write_word(block::header_addr(epilogue_addr), block::pack(0, true));
      self.epilogue_addr = epilogue_addr;

      Ok(coalesce(&mut self.freelists, new_payload))
    }
  }

  /// First-fit-at-head search across classes `class_of(asize)..7`:
  /// O(1) per class examined, O(7) worst case.
  fn find_fit(&self, asize: usize) -> Option<usize> {
    let c0 = crate::sclass::class_of(asize);
    let heads = self.freelists.heads();
    for &head in &heads[c0..] {
      if let Some(candidate) = head {
        if unsafe { block::size(candidate) } >= asize {
          return Some(candidate);
        }
      }
    }
    None
  }

  /// Computes the adjusted block size for a client request of `size`
  /// bytes: `16` if `size <= 8`, else the smallest multiple of 8 that
  /// fits `size` plus header/footer overhead.
  fn adjusted_size(size: usize) -> usize {
    if size <= DWORD {
      MIN_BLOCK
    } else {
      align_up!(size + OVERHEAD, DWORD)
    }
  }

  /// Allocates `size` bytes, returning an 8-byte-aligned pointer, or
  /// `None` if `size` is zero or the provider is exhausted.
  pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
    if size == 0 {
      return None;
    }
    let asize = Self::adjusted_size(size);

    let payload = match self.find_fit(asize) {
      Some(p) => {
        trace!("allocate: find_fit hit for asize={asize} at {p:#x}");
        p
      }
      None => {
        // Extension is capped at one chunk even when asize is
        // larger: a request bigger than a chunk can legitimately
        // still miss after extending, if the new free
        // block (possibly coalesced with a leftover neighbor) isn't
        // big enough yet. The extension itself always happens and
        // is never lost — it stays in its class list for the next
        // call to build on.
        let extend_words = asize.min(self.config.chunk_bytes) / WORD;
        match self.extend(extend_words) {
          Ok(p) => {
            if unsafe { block::size(p) } < asize {
              debug!(
                "allocate: extension at {p:#x} too small for asize={asize}, returning nil"
              );
              return None;
            }
            debug!("allocate: extended heap, new free block at {p:#x}");
            p
          }
          Err(_) => {
            debug!("allocate: provider exhausted for size={size}");
            return None;
          }
        }
      }
    };

    unsafe { place(&mut self.freelists, payload, asize) };
    NonNull::new(payload as *mut u8)
  }

  /// Frees a block previously returned by [`Heap::allocate`] or
  /// [`Heap::reallocate`]. A `None` pointer is a no-op.
  ///
  /// # Safety invariants (not enforced)
  ///
  /// `ptr` must have been returned by this heap and not already freed.
  /// Violating this is undefined behavior; detection is not required.
  pub fn free(&mut self, ptr: Option<NonNull<u8>>) {
    let Some(ptr) = ptr else { return };
    let payload = ptr.as_ptr() as usize;

    unsafe {
      let size = block::size(payload);
      trace!("free: payload={payload:#x} size={size}");
      block::set_header_footer(payload, size, false);
      coalesce(&mut self.freelists, payload);
    }
  }

  /// Reallocates `ptr` to `size` bytes. `None` behaves as `allocate`;
  /// `size == 0` behaves as `free` and returns `None`. Otherwise this is
  /// the naive allocate-copy-free policy: no in-place extension is
  /// attempted even when the next block is free.
  pub fn reallocate(&mut self, ptr: Option<NonNull<u8>>, size: usize) -> Option<NonNull<u8>> {
    let Some(old) = ptr else {
      return self.allocate(size);
    };
    if size == 0 {
      self.free(Some(old));
      return None;
    }

    let old_payload = old.as_ptr() as usize;
    let old_payload_size = unsafe { block::size(old_payload) } - OVERHEAD;

    let new = self.allocate(size)?;

    let copy_len = old_payload_size.min(size);
    unsafe {
      ptr::copy_nonoverlapping(old_payload as *const u8, new.as_ptr(), copy_len);
    }
    self.free(Some(old));
    Some(new)
  }

  /// Walks the arena and free lists, reporting any invariant violations
  /// found. Never panics or repairs.
  pub fn check(&self, verbose: bool) -> CheckReport {
    unsafe {
      let first_block = block::next_payload(self.heap_listp);
      check::walk(first_block, self.epilogue_addr, &self.freelists, verbose)
    }
  }

  /// Lowest address ever handed out by the underlying provider.
  pub fn arena_lo(&self) -> usize {
    self.provider.lo()
  }

  /// Current upper bound of the arena.
  pub fn arena_hi(&self) -> usize {
    self.provider.hi()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::provider::VecProvider;

  fn small_heap() -> Heap<VecProvider> {
    let config = AllocatorConfig::with_chunk_bytes(4096);
    let provider = VecProvider::with_capacity(4 * 1024 * 1024);
    Heap::with_config(config, provider).unwrap()
  }

  fn addr(p: NonNull<u8>) -> usize {
    p.as_ptr() as usize
  }

  #[test]
  fn p1_alignment() {
    let mut heap = small_heap();
    for size in [1, 2, 7, 8, 9, 100, 4097] {
      let p = heap.allocate(size).unwrap();
      assert_eq!(addr(p) % 8, 0, "allocation of size {size} was not 8-byte aligned");
    }
  }

  #[test]
  fn allocate_zero_and_negative_cast_are_nil() {
    let mut heap = small_heap();
    assert!(heap.allocate(0).is_none());
    let report = heap.check(false);
    assert!(report.is_consistent());
  }

  #[test]
  fn allocate_one_yields_minimum_block() {
    let mut heap = small_heap();
    let p = heap.allocate(1).unwrap();
    assert_eq!(unsafe { block::size(addr(p)) }, MIN_BLOCK);
  }

  #[test]
  fn scenario_free_then_reallocate_reuses_block() {
    let mut heap = small_heap();
    let a = heap.allocate(100).unwrap();
    heap.free(Some(a));
    let b = heap.allocate(100).unwrap();
    assert!(!b.as_ptr().is_null());
    assert_eq!(unsafe { block::size(addr(b)) }, 112);
    assert!(heap.check(false).is_consistent());
  }

  #[test]
  fn scenario_middle_free_reuse_without_split() {
    let mut heap = small_heap();
    let _a = heap.allocate(64).unwrap();
    let b = heap.allocate(64).unwrap();
    let _c = heap.allocate(64).unwrap();
    heap.free(Some(b));
    let d = heap.allocate(64).unwrap();
    assert_eq!(addr(d), addr(b));
    assert!(heap.check(false).is_consistent());
  }

  #[test]
  fn scenario_coalesce_on_double_free() {
    let mut heap = small_heap();
    let a = heap.allocate(200).unwrap();
    let b = heap.allocate(200).unwrap();
    heap.free(Some(a));
    heap.free(Some(b));

    let report = heap.check(false);
    assert!(report.is_consistent());
    // Exactly one free block should remain after the coalesce,
    // starting at a's former position and covering at least both.
    assert_eq!(report.free_blocks_in_lists, 1);
  }

  #[test]
  fn scenario_same_class_head_reuse_no_extension() {
    let mut heap = small_heap();
    let a = heap.allocate(600).unwrap();
    let _b = heap.allocate(600).unwrap();
    heap.free(Some(a));
    let c = heap.allocate(600).unwrap();
    assert_eq!(addr(c), addr(a));
  }

  #[test]
  fn reallocate_preserves_content_and_grows() {
    let mut heap = small_heap();
    let p = heap.allocate(8).unwrap();
    unsafe { ptr::write_bytes(p.as_ptr(), 0x11, 8) };

    let q = heap.reallocate(Some(p), 4096).unwrap();
    assert!(!q.as_ptr().is_null());
    let bytes = unsafe { std::slice::from_raw_parts(q.as_ptr(), 8) };
    assert_eq!(bytes, &[0x11; 8]);
    assert!(heap.check(false).is_consistent());
  }

  #[test]
  fn reallocate_none_is_allocate() {
    let mut heap = small_heap();
    let p = heap.reallocate(None, 64);
    assert!(p.is_some());
  }

  #[test]
  fn reallocate_zero_is_free() {
    let mut heap = small_heap();
    let p = heap.allocate(64).unwrap();
    let q = heap.reallocate(Some(p), 0);
    assert!(q.is_none());
  }

  #[test]
  fn free_of_none_is_noop() {
    let mut heap = small_heap();
    heap.free(None);
    assert!(heap.check(false).is_consistent());
  }

  #[test]
  fn p6_non_overlap_of_live_allocations() {
    let mut heap = small_heap();
    let sizes = [16, 32, 48, 64, 128, 256];
    let mut ranges = Vec::new();
    for &size in &sizes {
      let p = heap.allocate(size).unwrap();
      ranges.push((addr(p), size));
    }
    for i in 0..ranges.len() {
      for j in (i + 1)..ranges.len() {
        let (pi, si) = ranges[i];
        let (pj, sj) = ranges[j];
        let disjoint = pi + si <= pj || pj + sj <= pi;
        assert!(disjoint, "live allocations {i} and {j} overlap");
      }
    }
  }

  #[test]
  fn p9_heap_walk_reaches_epilogue_and_sums_match() {
    let mut heap = small_heap();
    for size in [16, 500, 1200, 9000] {
      heap.allocate(size).unwrap();
    }
    let report = heap.check(false);
    assert!(report.is_consistent());
    assert!(report.blocks_walked > 0);
  }

  #[test]
  fn extend_stress_triggers_multiple_extensions() {
    // Requests bigger than one chunk (4096 bytes here) force an
    // extension of min(asize, CHUNK) = CHUNK bytes on every miss. That
    // extension is capped below asize, so whether an individual call
    // succeeds depends on how much free space it coalesces with from
    // the previous miss; only the extension itself, and heap
    // consistency, are guaranteed here — not that every such call
    // succeeds.
    let mut heap = small_heap();
    let before = heap.arena_hi();
    for _ in 0..8 {
      heap.allocate(5000);
    }
    assert!(heap.arena_hi() > before, "heap should have grown via repeated extensions");
    assert!(heap.check(false).is_consistent());
  }

  #[test]
  fn out_of_memory_returns_none_without_corrupting_heap() {
    let config = AllocatorConfig::with_chunk_bytes(64);
    let provider = VecProvider::with_capacity(256);
    let mut heap = Heap::with_config(config, provider).unwrap();

    // Exhaust the tiny provider.
    while heap.allocate(48).is_some() {}

    assert!(heap.check(false).is_consistent());
  }
}
