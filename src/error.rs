use thiserror::Error;

/// Failure modes surfaced by the allocator's public API.
///
/// Client misuse (double free, passing a foreign pointer) is undefined
/// behavior and has no corresponding variant here; this enum only covers
/// the genuine failures (provider exhaustion, bad construction).
#[derive(Debug, Error)]
pub enum AllocError {
  /// The memory provider refused to grow the arena.
  #[error("memory provider could not grow the arena")]
  OutOfMemory,
  /// The provider failed while laying down the prologue/epilogue prefix
  /// or the first chunk during construction.
  #[error("memory provider failed during heap initialization")]
  ProviderFailure,
}
