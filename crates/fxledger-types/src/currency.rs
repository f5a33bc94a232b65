//! Issued currencies and their issuance history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, CurrencyId, OwnerId, Record, RecordId, RecordKind};

/// An issued currency.
///
/// `count` is everything ever issued; `left_count` is the part not yet
/// distributed to any owner. `count - left_count` is therefore what all
/// owners hold between them, available and locked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    #[serde(default)]
    pub uuid: RecordId,
    /// Public identifier.
    pub id: CurrencyId,
    #[serde(default)]
    pub count: Amount,
    #[serde(default)]
    pub left_count: Amount,
    pub creator: OwnerId,
    pub create_time: DateTime<Utc>,
}

impl Currency {
    /// Units held by owners (issued minus undistributed).
    #[must_use]
    pub fn distributed(&self) -> Amount {
        self.count - self.left_count
    }
}

impl Record for Currency {
    const KIND: RecordKind = RecordKind::Currency;
}

/// What an issuance log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuanceKind {
    /// New units issued to the undistributed pool.
    Release,
    /// Undistributed units assigned to an owner.
    Assign,
}

impl std::fmt::Display for IssuanceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Release => write!(f, "RELEASE"),
            Self::Assign => write!(f, "ASSIGN"),
        }
    }
}

/// Append-only record of one release or assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceLog {
    pub uuid: RecordId,
    pub currency: CurrencyId,
    pub kind: IssuanceKind,
    /// Receiving owner, for assignments.
    #[serde(default)]
    pub owner: Option<OwnerId>,
    pub count: Amount,
    pub timestamp: DateTime<Utc>,
}

impl Record for IssuanceLog {
    const KIND: RecordKind = RecordKind::IssuanceLog;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distributed_is_issued_minus_left() {
        let c = Currency {
            uuid: RecordId::new(),
            id: "XPT".into(),
            count: 1000,
            left_count: 400,
            creator: "issuer".into(),
            create_time: Utc::now(),
        };
        assert_eq!(c.distributed(), 600);
    }

    #[test]
    fn issuance_kind_display() {
        assert_eq!(format!("{}", IssuanceKind::Release), "RELEASE");
        assert_eq!(format!("{}", IssuanceKind::Assign), "ASSIGN");
    }
}
