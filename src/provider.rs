//! The memory provider: a minimal sbrk-like primitive. `SbrkProvider` is
//! the concrete default backed by the real process break; `VecProvider` is
//! a test double the rest of the crate can be exercised against without
//! touching it.

use crate::error::AllocError;

/// A contiguous, growable byte arena provider.
///
/// Implementors must guarantee that `extend` returns a freshly-extended,
/// contiguous range immediately following the previous one, and that
/// addresses handed out remain valid (and are never moved) for the
/// lifetime of the provider — the allocator stores raw deltas between
/// addresses and cannot tolerate relocation.
pub trait MemoryProvider {
  /// Extends the arena by exactly `n_bytes` (a multiple of 8), returning
  /// the address of the first new byte.
  fn extend(&mut self, n_bytes: usize) -> Result<usize, AllocError>;

  /// The lowest address ever handed out by this provider.
  fn lo(&self) -> usize;

  /// The current upper bound of the arena (one past the last byte handed
  /// out).
  fn hi(&self) -> usize;
}

/// A provider that grows the process's data segment via `sbrk(2)`.
pub struct SbrkProvider {
  base: usize,
}

impl SbrkProvider {
  /// Records the current program break as the arena's base address.
  pub fn new() -> Result<Self, AllocError> {
    let base = unsafe { libc::sbrk(0) };
    if base as isize == -1 {
      return Err(AllocError::ProviderFailure);
    }
    Ok(Self { base: base as usize })
  }
}

impl MemoryProvider for SbrkProvider {
  fn extend(&mut self, n_bytes: usize) -> Result<usize, AllocError> {
    debug_assert_eq!(n_bytes % 8, 0, "sbrk extension must stay 8-byte aligned");
    let old_break = unsafe { libc::sbrk(n_bytes as libc::intptr_t) };
    if old_break as isize == -1 {
      return Err(AllocError::OutOfMemory);
    }
    Ok(old_break as usize)
  }

  fn lo(&self) -> usize {
    self.base
  }

  fn hi(&self) -> usize {
    unsafe { libc::sbrk(0) as usize }
  }
}

/// A test double that simulates `sbrk` over a pre-reserved, fixed-capacity
/// buffer. The buffer is never reallocated after construction, so
/// addresses handed out by `extend` stay valid for the provider's
/// lifetime — the same guarantee a real process break gives.
pub struct VecProvider {
  buf: Vec<u8>,
  used: usize,
}

impl VecProvider {
  /// Reserves `capacity_bytes` up front. `extend` fails once that cap is
  /// reached, simulating an out-of-memory provider.
  pub fn with_capacity(capacity_bytes: usize) -> Self {
    Self { buf: vec![0u8; capacity_bytes], used: 0 }
  }
}

impl MemoryProvider for VecProvider {
  fn extend(&mut self, n_bytes: usize) -> Result<usize, AllocError> {
    debug_assert_eq!(n_bytes % 8, 0, "extension must stay 8-byte aligned");
    if self.used + n_bytes > self.buf.len() {
      return Err(AllocError::OutOfMemory);
    }
    let addr = self.buf.as_ptr() as usize + self.used;
    self.used += n_bytes;
    Ok(addr)
  }

  fn lo(&self) -> usize {
    self.buf.as_ptr() as usize
  }

  fn hi(&self) -> usize {
    self.buf.as_ptr() as usize + self.used
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn vec_provider_extends_contiguously() {
    let mut p = VecProvider::with_capacity(256);
    let a = p.extend(64).unwrap();
    let b = p.extend(32).unwrap();
    assert_eq!(b, a + 64);
    assert_eq!(p.hi(), a + 96);
  }

  #[test]
  fn vec_provider_reports_out_of_memory() {
    let mut p = VecProvider::with_capacity(64);
    assert!(p.extend(64).is_ok());
    assert!(matches!(p.extend(8), Err(AllocError::OutOfMemory)));
  }
}
