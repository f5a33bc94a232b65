//! Matched orders handed to the settlement engine.
//!
//! The matcher owns the order book; this ledger only sees one [`Order`] per
//! fill. All fills of one originally placed order share `raw_uuid`; the first
//! fill is the one whose `uuid` equals `raw_uuid`.

use serde::{Deserialize, Serialize};

use crate::{Amount, CurrencyId, OrderRef, OwnerId};

/// Which leg of a matched pair an order is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// One fill of an exchange order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub account: OwnerId,
    /// Currency paid.
    pub src_currency: CurrencyId,
    /// Currency received.
    pub des_currency: CurrencyId,
    /// Units of `des_currency` received by this fill.
    pub des_count: Amount,
    /// Units of `src_currency` paid by this fill.
    pub final_cost: Amount,
    /// Root order id shared by all fills.
    #[serde(rename = "rawUUID")]
    pub raw_uuid: OrderRef,
    /// This fill's id.
    #[serde(rename = "UUID")]
    pub uuid: OrderRef,
    /// Take-all order: settle against the whole remaining lock.
    #[serde(default)]
    pub is_buy_all: bool,
}

impl Order {
    /// First fill of its root order.
    #[must_use]
    pub fn is_first_fill(&self) -> bool {
        self.uuid == self.raw_uuid
    }

    /// First fill of a take-all order: the one that releases excess lock.
    #[must_use]
    pub fn releases_excess(&self) -> bool {
        self.is_buy_all && self.is_first_fill()
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// Whether `other` is the mirror of this order: same currencies swapped
    /// and amounts that cancel out.
    #[must_use]
    pub fn mirrors(&self, other: &Order) -> bool {
        self.src_currency == other.des_currency
            && self.des_currency == other.src_currency
            && self.final_cost == other.des_count
            && self.des_count == other.final_cost
    }

    /// A fixed-amount first fill (`uuid == raw_uuid`).
    pub fn dummy_fill(
        account: &str,
        src_currency: &str,
        des_currency: &str,
        final_cost: Amount,
        des_count: Amount,
    ) -> Self {
        let id = uuid::Uuid::now_v7().to_string();
        Self {
            account: account.to_string(),
            src_currency: src_currency.to_string(),
            des_currency: des_currency.to_string(),
            des_count,
            final_cost,
            raw_uuid: id.clone(),
            uuid: id,
            is_buy_all: false,
        }
    }

    /// A later fill of the given root order.
    #[must_use]
    pub fn next_fill(&self, final_cost: Amount, des_count: Amount) -> Self {
        Self {
            uuid: uuid::Uuid::now_v7().to_string(),
            final_cost,
            des_count,
            ..self.clone()
        }
    }
}
