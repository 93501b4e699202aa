//! Magic numbers and tunables, preserved bit-for-bit from the reference
//! allocator for benchmark compatibility.

/// Bytes in a machine word. Header and footer tags are one word wide.
pub const WORD: usize = 4;
/// Bytes in a double word. All payload addresses are aligned to this.
pub const DWORD: usize = 8;
/// Header + footer cost of a block, in bytes.
pub const OVERHEAD: usize = DWORD;
/// Default heap-extension granularity: 64 KiB.
pub const CHUNK: usize = 1 << 16;
/// Required payload alignment.
pub const ALIGNMENT: usize = DWORD;
/// Smallest viable block: header + footer + 8 bytes of payload/link area.
pub const MIN_BLOCK: usize = 16;
/// Number of segregated size classes.
pub const NUM_CLASSES: usize = 7;
/// Upper bound (inclusive) in bytes for each size class, by block size
/// (header + footer included).
pub const CLASS_BOUNDS: [usize; NUM_CLASSES] = [512, 1024, 2048, 4096, 8192, 16384, usize::MAX];

/// Tunable knobs for a `Heap`. Defaults reproduce the reference allocator's
/// magic numbers; tests shrink `chunk_bytes` to exercise heap-extension
/// paths without allocating a full 64 KiB chunk every time.
#[derive(Debug, Clone)]
pub struct AllocatorConfig {
  /// Bytes requested per heap-extension chunk, capped per request by
  /// `allocate`'s `min(asize, chunk_bytes)` policy.
  pub chunk_bytes: usize,
}

impl AllocatorConfig {
  /// Builds a config with a custom chunk size. Must be a multiple of
  /// [`DWORD`] to preserve alignment across heap extensions.
  pub fn with_chunk_bytes(chunk_bytes: usize) -> Self {
    debug_assert_eq!(chunk_bytes % DWORD, 0, "chunk_bytes must be 8-byte aligned");
    Self { chunk_bytes }
  }
}

impl Default for AllocatorConfig {
  fn default() -> Self {
    Self { chunk_bytes: CHUNK }
  }
}
