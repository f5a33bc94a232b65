//! Transaction log entries: one per settled fill.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CurrencyId, Order, OrderRef, OwnerId, Record, RecordKind};

/// Durable record of one executed fill.
///
/// The same entry is stored under two keys: by account, currency pair and
/// root order id (for partial-fill reconciliation) and by fill id (for
/// lookup and replay detection).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TxLogEntry {
    pub account: OwnerId,
    pub src_currency: CurrencyId,
    pub des_currency: CurrencyId,
    pub root_order_id: OrderRef,
    pub order: Order,
    pub settled_at: DateTime<Utc>,
}

impl TxLogEntry {
    #[must_use]
    pub fn for_order(order: &Order, settled_at: DateTime<Utc>) -> Self {
        Self {
            account: order.account.clone(),
            src_currency: order.src_currency.clone(),
            des_currency: order.des_currency.clone(),
            root_order_id: order.raw_uuid.clone(),
            order: order.clone(),
            settled_at,
        }
    }
}

impl Record for TxLogEntry {
    const KIND: RecordKind = RecordKind::TxLog;
}
