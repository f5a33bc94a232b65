//! Append-only log of settled fills.
//!
//! Each fill is written twice:
//!
//! ```text
//! txlog~account~src~des~root~uuid   reconciliation of a root order's fills
//! txfill~uuid                       lookup and replay detection
//! ```

use chrono::{DateTime, Utc};
use fxledger_store::{WorldState, create_composite_key};
use fxledger_types::constants::{TX_LOG_BY_FILL_INDEX, TX_LOG_BY_ROOT_INDEX};
use fxledger_types::{Order, Result, TxLogEntry};

use crate::records::{self, RecordIter};

/// Settled fills in the world state.
pub struct TransactionLog;

impl TransactionLog {
    /// Log one settled fill under both indexes.
    ///
    /// Replay detection is the caller's job: appending an already logged
    /// fill overwrites its entries.
    pub fn append<S: WorldState + ?Sized>(
        state: &mut S,
        order: &Order,
        at: DateTime<Utc>,
    ) -> Result<TxLogEntry> {
        let entry = TxLogEntry::for_order(order, at);
        let by_root = create_composite_key(
            TX_LOG_BY_ROOT_INDEX,
            &[
                order.account.as_str(),
                order.src_currency.as_str(),
                order.des_currency.as_str(),
                order.raw_uuid.as_str(),
                order.uuid.as_str(),
            ],
        )?;
        records::save(state, &by_root, &entry)?;
        let by_fill = create_composite_key(TX_LOG_BY_FILL_INDEX, &[order.uuid.as_str()])?;
        records::save(state, &by_fill, &entry)?;
        Ok(entry)
    }

    /// The logged entry for a fill.
    pub fn entry_by_uuid<S: WorldState + ?Sized>(
        state: &S,
        fill_id: &str,
    ) -> Result<Option<TxLogEntry>> {
        let key = create_composite_key(TX_LOG_BY_FILL_INDEX, &[fill_id])?;
        records::load(state, &key)
    }

    /// The settled order payload for a fill.
    pub fn get_by_uuid<S: WorldState + ?Sized>(state: &S, fill_id: &str) -> Result<Option<Order>> {
        Ok(Self::entry_by_uuid(state, fill_id)?.map(|entry| entry.order))
    }

    /// Every settled fill of root order `root` for (owner, src, des).
    pub fn list_by_root<'s, S: WorldState + ?Sized>(
        state: &'s S,
        owner: &str,
        src: &str,
        des: &str,
        root: &str,
    ) -> Result<RecordIter<'s, Order>> {
        let entries = records::scan_records::<TxLogEntry, S>(
            state,
            TX_LOG_BY_ROOT_INDEX,
            &[owner, src, des, root],
        )?;
        Ok(Box::new(entries.map(|entry| entry.map(|e| e.order))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxledger_store::MemoryWorldState;

    #[test]
    fn append_and_lookup() {
        let mut state = MemoryWorldState::new();
        let order = Order::dummy_fill("alice", "X", "Y", 40, 5);
        let entry = TransactionLog::append(&mut state, &order, Utc::now()).unwrap();
        assert_eq!(entry.root_order_id, order.raw_uuid);

        assert_eq!(
            TransactionLog::get_by_uuid(&state, &order.uuid).unwrap(),
            Some(order.clone())
        );
        assert!(TransactionLog::get_by_uuid(&state, "nope").unwrap().is_none());
    }

    #[test]
    fn list_by_root_collects_every_fill() {
        let mut state = MemoryWorldState::new();
        let first = Order::dummy_fill("alice", "X", "Y", 30, 3);
        let second = first.next_fill(10, 1);
        let unrelated = Order::dummy_fill("alice", "X", "Y", 99, 9);
        for order in [&first, &second, &unrelated] {
            TransactionLog::append(&mut state, order, Utc::now()).unwrap();
        }

        let cost: i64 = TransactionLog::list_by_root(&state, "alice", "X", "Y", &first.raw_uuid)
            .unwrap()
            .map(|o| o.unwrap().final_cost)
            .sum();
        assert_eq!(cost, 40);

        // Different currency pair under the same root sees nothing.
        assert_eq!(
            TransactionLog::list_by_root(&state, "alice", "Y", "X", &first.raw_uuid)
                .unwrap()
                .count(),
            0
        );
    }
}
