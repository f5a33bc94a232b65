//! Identifiers used throughout fxledger.
//!
//! Stored records get a [`RecordId`] (UUIDv7, time-ordered). Owners,
//! currencies and orders are identified by the opaque strings the platform
//! and the matcher hand us.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account / owner identifier (e.g. an enrollment id).
pub type OwnerId = String;

/// Public currency identifier (e.g. "USD", "CNY", "XPT").
pub type CurrencyId = String;

/// Order identifier as produced by the matcher (root order id or fill id).
pub type OrderRef = String;

// ---------------------------------------------------------------------------
// RecordId
// ---------------------------------------------------------------------------

/// Primary key of a stored record. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl RecordId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The nil id, used by records that have not been stored yet.
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}
