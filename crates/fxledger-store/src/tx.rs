//! Atomic write overlay.
//!
//! A [`StateTx`] borrows its backend immutably. Writes are staged in the
//! overlay and reads go through it, so an operation sees its own writes.
//! The backend only changes when the finished [`WriteSet`] is handed to
//! [`CommitBatch::apply_batch`]; dropping the transaction discards it.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::ops::Bound;

use fxledger_types::StoreError;

use crate::{CommitBatch, KvPair, ScanIter, StoreResult, WorldState};

/// Everything a transaction observed and staged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    /// Backend version of every key the transaction read or overwrote.
    pub reads: BTreeMap<String, u64>,
    /// Staged values, applied together.
    pub writes: BTreeMap<String, Vec<u8>>,
}

impl WriteSet {
    /// Whether nothing was staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// A staged transaction over a [`CommitBatch`] backend.
pub struct StateTx<'a, B: CommitBatch + ?Sized> {
    base: &'a B,
    reads: RefCell<BTreeMap<String, u64>>,
    writes: BTreeMap<String, Vec<u8>>,
}

impl<'a, B: CommitBatch + ?Sized> StateTx<'a, B> {
    /// Start a transaction on `base`.
    pub fn begin(base: &'a B) -> Self {
        Self {
            base,
            reads: RefCell::new(BTreeMap::new()),
            writes: BTreeMap::new(),
        }
    }

    /// Finish the transaction, yielding what must be applied.
    #[must_use]
    pub fn into_write_set(self) -> WriteSet {
        WriteSet {
            reads: self.reads.into_inner(),
            writes: self.writes,
        }
    }

    // First observation wins: later reads of the same key must not hide a
    // change that happened between them.
    fn observe(&self, key: &str) -> StoreResult<()> {
        if self.reads.borrow().contains_key(key) {
            return Ok(());
        }
        let version = self.base.version_of(key)?;
        self.reads.borrow_mut().insert(key.to_string(), version);
        Ok(())
    }
}

impl<B: CommitBatch + ?Sized> std::fmt::Debug for StateTx<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateTx")
            .field("reads", &self.reads.borrow().len())
            .field("writes", &self.writes.len())
            .finish_non_exhaustive()
    }
}

impl<B: CommitBatch + ?Sized> WorldState for StateTx<'_, B> {
    fn get_state(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        if let Some(value) = self.writes.get(key) {
            return Ok(Some(value.clone()));
        }
        self.observe(key)?;
        self.base.get_state(key)
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.observe(key)?;
        self.writes.insert(key.to_string(), value);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> StoreResult<ScanIter<'_>> {
        let overlay: Vec<KvPair> = self
            .writes
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let base = self.base.scan_prefix(prefix)?;
        Ok(Box::new(MergeScan {
            tx: self,
            base: base.peekable(),
            overlay: overlay.into_iter().peekable(),
        }))
    }

    fn is_atomic(&self) -> bool {
        true
    }
}

/// Ordered merge of a backend scan with the staged overlay. On equal keys
/// the staged value wins.
struct MergeScan<'s, 'a, B: CommitBatch + ?Sized> {
    tx: &'s StateTx<'a, B>,
    base: Peekable<ScanIter<'s>>,
    overlay: Peekable<std::vec::IntoIter<KvPair>>,
}

impl<B: CommitBatch + ?Sized> Iterator for MergeScan<'_, '_, B> {
    type Item = StoreResult<KvPair>;

    fn next(&mut self) -> Option<Self::Item> {
        let pick = match (self.base.peek(), self.overlay.peek()) {
            (None, None) => return None,
            (Some(Err(_)), _) | (Some(Ok(_)), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(Ok((base_key, _))), Some((staged_key, _))) => base_key.cmp(staged_key),
        };
        match pick {
            Ordering::Less => {
                let item = self.base.next()?;
                Some(item.and_then(|(key, value)| {
                    self.tx.observe(&key)?;
                    Ok((key, value))
                }))
            }
            Ordering::Equal => {
                self.base.next();
                self.overlay.next().map(Ok)
            }
            Ordering::Greater => self.overlay.next().map(Ok),
        }
    }
}

/// Run `f` on a fresh transaction over `store` and apply its writes only
/// if `f` succeeds.
///
/// # Errors
/// Whatever `f` returns, or the store's error when the batch is refused.
pub fn run_atomic<B, T, E, F>(store: &mut B, f: F) -> Result<T, E>
where
    B: CommitBatch + ?Sized,
    E: From<StoreError>,
    F: FnOnce(&mut StateTx<'_, B>) -> Result<T, E>,
{
    let (value, set) = {
        let mut tx = StateTx::begin(&*store);
        let value = f(&mut tx)?;
        (value, tx.into_write_set())
    };
    tracing::debug!(
        writes = set.writes.len(),
        reads = set.reads.len(),
        "applying write set"
    );
    store.apply_batch(set)?;
    Ok(value)
}
