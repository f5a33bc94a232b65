//! Lock ledger: one immutable entry per (owner, currency, order, direction).
//!
//! The entry's existence is the idempotency guard for lock and unlock
//! actions, and the Lock entry's amount is what settlement reconciles a
//! take-all order against.

use chrono::{DateTime, Utc};
use fxledger_store::{WorldState, create_composite_key};
use fxledger_types::constants::LOCK_LEDGER_INDEX;
use fxledger_types::{Amount, LedgerError, LockDirection, LockEntry, RecordKind, Result};

use crate::asset_store::ensure_positive;
use crate::records::{self, RecordIter};

/// Lock/unlock history in the world state.
pub struct LockLedger;

impl LockLedger {
    fn key(
        owner: &str,
        currency: &str,
        order_id: &str,
        direction: LockDirection,
    ) -> Result<String> {
        Ok(create_composite_key(
            LOCK_LEDGER_INDEX,
            &[owner, currency, order_id, direction.as_key_part()],
        )?)
    }

    /// The entry for the exact tuple, if recorded.
    pub fn find<S: WorldState + ?Sized>(
        state: &S,
        owner: &str,
        currency: &str,
        order_id: &str,
        direction: LockDirection,
    ) -> Result<Option<LockEntry>> {
        records::load(state, &Self::key(owner, currency, order_id, direction)?)
    }

    /// Record a lock or unlock action.
    ///
    /// # Errors
    /// [`LedgerError::AlreadyExecuted`] when the tuple is already recorded.
    pub fn record_action<S: WorldState + ?Sized>(
        state: &mut S,
        owner: &str,
        currency: &str,
        order_id: &str,
        direction: LockDirection,
        amount: Amount,
        at: DateTime<Utc>,
    ) -> Result<LockEntry> {
        ensure_positive(amount)?;
        let key = Self::key(owner, currency, order_id, direction)?;
        if state.get_state(&key)?.is_some() {
            return Err(LedgerError::AlreadyExecuted {
                owner: owner.to_string(),
                currency: currency.to_string(),
                order_id: order_id.to_string(),
                direction,
            });
        }
        let entry = LockEntry {
            owner: owner.to_string(),
            currency: currency.to_string(),
            order_id: order_id.to_string(),
            direction,
            amount,
            timestamp: at,
        };
        records::save(state, &key, &entry)?;
        Ok(entry)
    }

    /// Amount originally locked for `order_id`.
    ///
    /// # Errors
    /// [`LedgerError::NotFound`] when the order was never locked.
    pub fn amount_locked_for<S: WorldState + ?Sized>(
        state: &S,
        owner: &str,
        currency: &str,
        order_id: &str,
    ) -> Result<Amount> {
        Self::find(state, owner, currency, order_id, LockDirection::Lock)?
            .map(|entry| entry.amount)
            .ok_or_else(|| {
                LedgerError::not_found(
                    RecordKind::LockEntry,
                    format!("{owner}/{currency}/{order_id}/{}", LockDirection::Lock),
                )
            })
    }

    /// Every entry for (owner, currency), across orders and directions.
    pub fn entries_for<'s, S: WorldState + ?Sized>(
        state: &'s S,
        owner: &str,
        currency: &str,
    ) -> Result<RecordIter<'s, LockEntry>> {
        records::scan_records(state, LOCK_LEDGER_INDEX, &[owner, currency])
    }

    /// Σ lock − Σ unlock for (owner, currency).
    pub fn net_locked<S: WorldState + ?Sized>(
        state: &S,
        owner: &str,
        currency: &str,
    ) -> Result<Amount> {
        Self::entries_for(state, owner, currency)?
            .map(|entry| entry.map(|e| e.signed_amount()))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxledger_store::MemoryWorldState;

    #[test]
    fn record_and_find() {
        let mut state = MemoryWorldState::new();
        let now = Utc::now();
        let entry = LockLedger::record_action(
            &mut state,
            "alice",
            "USD",
            "o1",
            LockDirection::Lock,
            40,
            now,
        )
        .unwrap();
        assert_eq!(entry.amount, 40);

        let found = LockLedger::find(&state, "alice", "USD", "o1", LockDirection::Lock)
            .unwrap()
            .unwrap();
        assert_eq!(found, entry);
        assert!(
            LockLedger::find(&state, "alice", "USD", "o1", LockDirection::Unlock)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn duplicate_tuple_is_already_executed() {
        let mut state = MemoryWorldState::new();
        let now = Utc::now();
        LockLedger::record_action(&mut state, "alice", "USD", "o1", LockDirection::Lock, 40, now)
            .unwrap();
        let before = state.snapshot();

        let err = LockLedger::record_action(
            &mut state,
            "alice",
            "USD",
            "o1",
            LockDirection::Lock,
            40,
            now,
        )
        .unwrap_err();
        assert!(err.is_replay());
        assert_eq!(state.snapshot(), before);

        // Other direction of the same order is a distinct tuple.
        LockLedger::record_action(&mut state, "alice", "USD", "o1", LockDirection::Unlock, 10, now)
            .unwrap();
    }

    #[test]
    fn amount_locked_for_order() {
        let mut state = MemoryWorldState::new();
        assert!(matches!(
            LockLedger::amount_locked_for(&state, "alice", "USD", "o1"),
            Err(LedgerError::NotFound { kind: RecordKind::LockEntry, .. })
        ));
        LockLedger::record_action(
            &mut state,
            "alice",
            "USD",
            "o1",
            LockDirection::Lock,
            100,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(
            LockLedger::amount_locked_for(&state, "alice", "USD", "o1").unwrap(),
            100
        );
    }

    #[test]
    fn net_locked_sums_directions() {
        let mut state = MemoryWorldState::new();
        let now = Utc::now();
        for (order, direction, amount) in [
            ("o1", LockDirection::Lock, 50),
            ("o2", LockDirection::Lock, 30),
            ("o1", LockDirection::Unlock, 20),
        ] {
            LockLedger::record_action(&mut state, "alice", "USD", order, direction, amount, now)
                .unwrap();
        }
        LockLedger::record_action(&mut state, "alice", "EUR", "o9", LockDirection::Lock, 7, now)
            .unwrap();

        assert_eq!(LockLedger::net_locked(&state, "alice", "USD").unwrap(), 60);
        assert_eq!(LockLedger::entries_for(&state, "alice", "USD").unwrap().count(), 3);
        assert_eq!(LockLedger::net_locked(&state, "bob", "USD").unwrap(), 0);
    }
}
