//! # fxledger-store
//!
//! The world state the settlement engine reads and writes.
//!
//! ## Architecture
//!
//! - [`WorldState`]: keyed get/put plus lazy prefix scans
//! - [`composite`]: composite keys for secondary indexes
//!   (`\0index\0part\0part\0…`), built and split here
//! - [`MemoryWorldState`]: versioned in-memory backend
//! - [`StateTx`]: write overlay over a backend; reads see staged writes,
//!   nothing reaches the backend until [`CommitBatch::apply_batch`] runs
//!
//! ## Atomic invocation
//!
//! ```text
//! StateTx::begin(&store) → engine ops → into_write_set() → store.apply_batch()
//! ```
//!
//! `apply_batch` validates every key version the transaction observed, so a
//! concurrent write to the same key aborts the whole batch with
//! [`StoreError::Conflict`] and the caller retries from scratch.

pub mod composite;
pub mod memory;
pub mod state;
pub mod tx;

pub use composite::{create_composite_key, split_composite_key};
pub use fxledger_types::StoreError;
pub use memory::MemoryWorldState;
pub use state::{CommitBatch, KvPair, ScanIter, WorldState};
pub use tx::{StateTx, WriteSet, run_atomic};

/// Store-level `Result` alias.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
