//! In-memory world state.
//!
//! Entries live in a `BTreeMap`, so prefix scans are ordered range reads.
//! Every key carries a version that is bumped on each write; transactions
//! record the versions they read and [`CommitBatch::apply_batch`] refuses the
//! batch when any of them moved.

use std::collections::BTreeMap;
use std::ops::Bound;

use fxledger_types::StoreError;

use crate::{CommitBatch, KvPair, ScanIter, StoreResult, WorldState, WriteSet};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    version: u64,
    value: Vec<u8>,
}

/// Versioned in-memory world state.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorldState {
    entries: BTreeMap<String, Entry>,
    #[cfg(any(test, feature = "test-helpers"))]
    failing_prefixes: Vec<String>,
}

impl MemoryWorldState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every key and value, in key order. Versions are not included.
    #[must_use]
    pub fn snapshot(&self) -> Vec<KvPair> {
        self.entries
            .iter()
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect()
    }

    /// Make every write to a key starting with `prefix` fail with
    /// [`StoreError::Backend`], both direct and batched.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn fail_writes_with_prefix(&mut self, prefix: impl Into<String>) {
        self.failing_prefixes.push(prefix.into());
    }

    /// Remove all injected write faults.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn clear_write_faults(&mut self) {
        self.failing_prefixes.clear();
    }

    #[cfg(any(test, feature = "test-helpers"))]
    fn check_fault(&self, key: &str) -> StoreResult<()> {
        if self.failing_prefixes.iter().any(|p| key.starts_with(p.as_str())) {
            return Err(StoreError::Backend(format!(
                "injected write failure for key {key:?}"
            )));
        }
        Ok(())
    }

    #[cfg(not(any(test, feature = "test-helpers")))]
    #[allow(clippy::unused_self, clippy::unnecessary_wraps)]
    fn check_fault(&self, _key: &str) -> StoreResult<()> {
        Ok(())
    }

    fn write(&mut self, key: &str, value: Vec<u8>) {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.version += 1;
                entry.value = value;
            }
            None => {
                self.entries
                    .insert(key.to_string(), Entry { version: 1, value });
            }
        }
    }
}

impl WorldState for MemoryWorldState {
    fn get_state(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|e| e.value.clone()))
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.check_fault(key)?;
        self.write(key, value);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> StoreResult<ScanIter<'_>> {
        let prefix = prefix.to_string();
        let iter = self
            .entries
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix.as_str()))
            .map(|(k, e)| -> StoreResult<KvPair> { Ok((k.clone(), e.value.clone())) });
        Ok(Box::new(iter))
    }
}

impl CommitBatch for MemoryWorldState {
    fn version_of(&self, key: &str) -> StoreResult<u64> {
        Ok(self.entries.get(key).map_or(0, |e| e.version))
    }

    fn apply_batch(&mut self, set: WriteSet) -> StoreResult<()> {
        for (key, seen) in &set.reads {
            if self.version_of(key)? != *seen {
                tracing::debug!(key = %key.escape_default(), "write-set conflict");
                return Err(StoreError::Conflict { key: key.clone() });
            }
        }
        for key in set.writes.keys() {
            self.check_fault(key)?;
        }
        for (key, value) in set.writes {
            self.write(&key, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_composite_key;

    #[test]
    fn put_get() {
        let mut state = MemoryWorldState::new();
        assert!(state.get_state("k").unwrap().is_none());
        state.put_state("k", b"v".to_vec()).unwrap();
        assert_eq!(state.get_state("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn versions_bump_on_write() {
        let mut state = MemoryWorldState::new();
        assert_eq!(state.version_of("k").unwrap(), 0);
        state.put_state("k", b"1".to_vec()).unwrap();
        assert_eq!(state.version_of("k").unwrap(), 1);
        state.put_state("k", b"2".to_vec()).unwrap();
        assert_eq!(state.version_of("k").unwrap(), 2);
    }

    #[test]
    fn scan_prefix_is_ordered_and_bounded() {
        let mut state = MemoryWorldState::new();
        for (owner, cur) in [("bob", "USD"), ("alice", "USD"), ("alice", "EUR"), ("alicia", "X")] {
            let key = create_composite_key("idx", &[owner, cur]).unwrap();
            state.put_state(&key, owner.as_bytes().to_vec()).unwrap();
        }
        state.put_state("zzz", b"plain".to_vec()).unwrap();

        let keys: Vec<String> = state
            .scan_partial_composite("idx", &["alice"])
            .unwrap()
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(
            keys,
            vec![
                create_composite_key("idx", &["alice", "EUR"]).unwrap(),
                create_composite_key("idx", &["alice", "USD"]).unwrap(),
            ]
        );

        // Restartable: a second scan yields the same sequence.
        assert_eq!(
            state.scan_partial_composite("idx", &["alice"]).unwrap().count(),
            2
        );
        assert_eq!(state.scan_partial_composite("idx", &[]).unwrap().count(), 4);
    }

    #[test]
    fn injected_fault_fails_put() {
        let mut state = MemoryWorldState::new();
        state.fail_writes_with_prefix("bad");
        assert!(matches!(
            state.put_state("bad/key", vec![1]),
            Err(StoreError::Backend(_))
        ));
        state.put_state("good", vec![1]).unwrap();
        state.clear_write_faults();
        state.put_state("bad/key", vec![1]).unwrap();
    }

    #[test]
    fn batch_with_stale_read_is_rejected_whole() {
        let mut state = MemoryWorldState::new();
        state.put_state("a", b"1".to_vec()).unwrap();

        let mut set = WriteSet::default();
        set.reads.insert("a".into(), 0);
        set.writes.insert("a".into(), b"2".to_vec());
        set.writes.insert("b".into(), b"2".to_vec());

        let before = state.snapshot();
        let err = state.apply_batch(set).unwrap_err();
        assert_eq!(err, StoreError::Conflict { key: "a".into() });
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn batch_with_faulty_key_writes_nothing() {
        let mut state = MemoryWorldState::new();
        state.fail_writes_with_prefix("z");

        let mut set = WriteSet::default();
        set.writes.insert("a".into(), b"1".to_vec());
        set.writes.insert("z".into(), b"1".to_vec());

        assert!(state.apply_batch(set).is_err());
        assert!(state.is_empty());
    }
}
