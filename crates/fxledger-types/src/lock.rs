//! Lock ledger entries.
//!
//! One [`LockEntry`] exists per (owner, currency, order, direction). Its
//! existence is what makes a repeated lock or unlock request a replay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, CurrencyId, OrderRef, OwnerId, Record, RecordKind};

/// Whether an entry reserved or released funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockDirection {
    /// available → locked
    Lock,
    /// locked → available
    Unlock,
}

impl LockDirection {
    #[must_use]
    pub fn from_is_lock(is_lock: bool) -> Self {
        if is_lock { Self::Lock } else { Self::Unlock }
    }

    #[must_use]
    pub fn is_lock(&self) -> bool {
        matches!(self, Self::Lock)
    }

    /// Key segment used in the lock ledger's composite key.
    #[must_use]
    pub fn as_key_part(&self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Unlock => "unlock",
        }
    }

    /// Parse the key segment (or a user-facing argument).
    #[must_use]
    pub fn from_key_part(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lock" | "true" => Some(Self::Lock),
            "unlock" | "false" => Some(Self::Unlock),
            _ => None,
        }
    }
}

impl std::fmt::Display for LockDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lock => write!(f, "LOCK"),
            Self::Unlock => write!(f, "UNLOCK"),
        }
    }
}

/// Immutable record of one lock or unlock action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LockEntry {
    pub owner: OwnerId,
    pub currency: CurrencyId,
    pub order_id: OrderRef,
    pub direction: LockDirection,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
}

impl LockEntry {
    /// Signed effect on the locked balance: `+amount` for a lock,
    /// `-amount` for an unlock.
    #[must_use]
    pub fn signed_amount(&self) -> Amount {
        match self.direction {
            LockDirection::Lock => self.amount,
            LockDirection::Unlock => -self.amount,
        }
    }
}

impl Record for LockEntry {
    const KIND: RecordKind = RecordKind::LockEntry;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_key_parts() {
        assert_eq!(LockDirection::Lock.as_key_part(), "lock");
        assert_eq!(LockDirection::from_key_part("UNLOCK"), Some(LockDirection::Unlock));
        assert_eq!(LockDirection::from_key_part("true"), Some(LockDirection::Lock));
        assert_eq!(LockDirection::from_key_part("sideways"), None);
        assert_eq!(LockDirection::from_is_lock(false), LockDirection::Unlock);
    }

    #[test]
    fn signed_amount_follows_direction() {
        let mut entry = LockEntry {
            owner: "alice".into(),
            currency: "USD".into(),
            order_id: "o1".into(),
            direction: LockDirection::Lock,
            amount: 40,
            timestamp: Utc::now(),
        };
        assert_eq!(entry.signed_amount(), 40);
        entry.direction = LockDirection::Unlock;
        assert_eq!(entry.signed_amount(), -40);
    }
}
