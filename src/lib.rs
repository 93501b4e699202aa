//! # segfit — a segregated-fit dynamic storage allocator
//!
//! This crate manages a single contiguous, growable byte arena (obtained
//! from a `sbrk`-like [`MemoryProvider`]) and services variable-size
//! allocation requests from it: `allocate`, `free`, `reallocate`, guarded
//! by a `check` consistency walk.
//!
//! ## Design
//!
//! Free blocks are tracked in 7 segregated size-class lists. Each free
//! block stores its list links as two signed 32-bit deltas in its own
//! payload bytes rather than full pointers — the arena is bounded in size,
//! so every intra-list neighbor distance fits in 32 bits, and this halves
//! the per-free-block bookkeeping cost on 64-bit hosts.
//!
//! ```text
//!   segfit
//!   ├── align     - alignment macro (align_up!)
//!   ├── config    - magic numbers and tunables
//!   ├── error     - AllocError
//!   ├── provider  - MemoryProvider trait, SbrkProvider, VecProvider
//!   ├── block     - header/footer/link tag helpers (internal)
//!   ├── sclass    - size-class index (internal)
//!   ├── freelist  - free-list link ops (internal)
//!   ├── coalesce  - boundary-tag coalescing (internal)
//!   ├── place     - split-on-allocate policy (internal)
//!   ├── check     - consistency checker
//!   └── heap      - Heap<P>: the public allocate/free/reallocate/check API
//! ```
//!
//! ## Quick start
//!
//! ```rust
//! use segfit::{Heap, provider::VecProvider};
//!
//! let provider = VecProvider::with_capacity(1024 * 1024);
//! let mut heap = Heap::new(provider).unwrap();
//!
//! let p = heap.allocate(64).unwrap();
//! unsafe { p.as_ptr().write_bytes(0xAB, 64) };
//! heap.free(Some(p));
//! assert!(heap.check(false).is_consistent());
//! ```
//!
//! ## Safety
//!
//! This crate manages raw memory directly; every public entry point that
//! touches the arena does so through `unsafe` internally. Double-freeing a
//! pointer or passing one this heap did not return is undefined behavior,
//! not a detected error.
//!
//! ## Thread safety
//!
//! `Heap` is not `Sync`. Wrap it in a `Mutex` for multi-threaded use; no
//! internal locking protocol is provided.

pub mod align;
pub mod check;
pub mod config;
pub mod error;
pub mod provider;

mod block;
mod coalesce;
mod freelist;
mod heap;
mod place;
mod sclass;

pub use check::CheckReport;
pub use config::AllocatorConfig;
pub use error::AllocError;
pub use heap::Heap;
pub use provider::MemoryProvider;
