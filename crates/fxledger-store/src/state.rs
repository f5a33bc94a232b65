//! World-state traits.

use crate::{StoreResult, WriteSet, create_composite_key};

/// A stored key and its value.
pub type KvPair = (String, Vec<u8>);

/// Lazy, finite scan over a key range. Calling the scan again restarts it.
pub type ScanIter<'a> = Box<dyn Iterator<Item = StoreResult<KvPair>> + 'a>;

/// Keyed byte store with ordered prefix scans.
///
/// Every engine operation takes the state it works on as an explicit
/// parameter; implementations hold no per-call state.
pub trait WorldState {
    /// Read the value under `key`.
    fn get_state(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Write `value` under `key`.
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> StoreResult<()>;

    /// All entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &str) -> StoreResult<ScanIter<'_>>;

    /// Whether writes are staged and land together as one unit.
    ///
    /// On a non-atomic state each `put_state` is immediately durable.
    fn is_atomic(&self) -> bool {
        false
    }

    /// All entries of `index` whose leading attributes equal `parts`.
    fn scan_partial_composite(&self, index: &str, parts: &[&str]) -> StoreResult<ScanIter<'_>> {
        let prefix = create_composite_key(index, parts)?;
        self.scan_prefix(&prefix)
    }
}

/// A backend that can apply a transaction's write set as one unit.
pub trait CommitBatch: WorldState {
    /// Current version of `key`; `0` when the key was never written.
    fn version_of(&self, key: &str) -> StoreResult<u64>;

    /// Validate the versions the transaction observed and apply every
    /// write, or apply nothing.
    fn apply_batch(&mut self, set: WriteSet) -> StoreResult<()>;
}
