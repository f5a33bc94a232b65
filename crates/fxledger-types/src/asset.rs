//! Balance positions.
//!
//! Every owner holds one [`Asset`] per currency: a `count` that is available
//! for new orders and a `lock_count` reserved by pending orders.

use serde::{Deserialize, Serialize};

use crate::{CurrencyId, OwnerId, Record, RecordId, RecordKind};

/// Integer unit count of a currency.
pub type Amount = i64;

/// A single balance position for an (owner, currency) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Primary key. Nil until the position is first stored.
    #[serde(default)]
    pub uuid: RecordId,
    pub owner: OwnerId,
    pub currency: CurrencyId,
    /// Available for new orders.
    #[serde(default)]
    pub count: Amount,
    /// Locked by pending orders.
    #[serde(default)]
    pub lock_count: Amount,
}

impl Asset {
    /// Create an empty, not yet stored position.
    #[must_use]
    pub fn new(owner: impl Into<OwnerId>, currency: impl Into<CurrencyId>) -> Self {
        Self {
            uuid: RecordId::nil(),
            owner: owner.into(),
            currency: currency.into(),
            count: 0,
            lock_count: 0,
        }
    }

    /// Total balance (available + locked).
    #[must_use]
    pub fn total(&self) -> Amount {
        self.count + self.lock_count
    }

    /// Whether this position has no balance at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.count == 0 && self.lock_count == 0
    }

    /// Both counts are non-negative.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.count >= 0 && self.lock_count >= 0
    }
}

impl Record for Asset {
    const KIND: RecordKind = RecordKind::Asset;
}
