//! Supply conservation invariant checker.
//!
//! Invariant for every issued currency:
//! ```text
//! Σ(count + lock_count) over all owners == currency.count − currency.left_count
//! ```
//!
//! Locking, unlocking and mirrored settlements move units between positions
//! and never change the sum. A violation means a write went missing or
//! landed twice, and needs external reconciliation.

use fxledger_store::WorldState;
use fxledger_types::{Amount, LedgerError, Result};
use serde::Serialize;

use crate::asset_store::AssetStore;
use crate::currency_registry::CurrencyRegistry;

/// Measured supply of one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplyReport {
    pub currency: String,
    /// Units ever issued.
    pub issued: Amount,
    /// Units not yet distributed.
    pub undistributed: Amount,
    /// Σ available over all positions.
    pub available: Amount,
    /// Σ locked over all positions.
    pub locked: Amount,
    /// Number of positions held.
    pub positions: usize,
}

impl SupplyReport {
    /// What owners should hold between them.
    #[must_use]
    pub fn expected(&self) -> Amount {
        self.issued - self.undistributed
    }

    /// What owners actually hold.
    #[must_use]
    pub fn actual(&self) -> Amount {
        self.available + self.locked
    }

    #[must_use]
    pub fn is_conserved(&self) -> bool {
        self.expected() == self.actual()
    }
}

/// Checks issued supply against the positions holding it.
pub struct SupplyConservation;

impl SupplyConservation {
    /// Sum every position of `currency`.
    pub fn measure<S: WorldState + ?Sized>(state: &S, currency: &str) -> Result<SupplyReport> {
        let issued = CurrencyRegistry::get_by_public_id(state, currency)?;
        let mut report = SupplyReport {
            currency: currency.to_string(),
            issued: issued.count,
            undistributed: issued.left_count,
            available: 0,
            locked: 0,
            positions: 0,
        };
        for asset in AssetStore::list_by_currency(state, currency)? {
            let asset = asset?;
            if !asset.is_consistent() {
                return Err(LedgerError::SupplyInvariantViolation {
                    reason: format!(
                        "position {}/{} holds count {} and lock_count {}",
                        asset.owner, asset.currency, asset.count, asset.lock_count
                    ),
                });
            }
            report.available = report
                .available
                .checked_add(asset.count)
                .ok_or_else(|| Self::overflow(currency))?;
            report.locked = report
                .locked
                .checked_add(asset.lock_count)
                .ok_or_else(|| Self::overflow(currency))?;
            report.positions += 1;
        }
        report
            .available
            .checked_add(report.locked)
            .ok_or_else(|| Self::overflow(currency))?;
        Ok(report)
    }

    // Holdings beyond Amount::MAX cannot match any issued total.
    fn overflow(currency: &str) -> LedgerError {
        LedgerError::SupplyInvariantViolation {
            reason: format!("Currency {currency}: held balances overflow the amount range"),
        }
    }

    /// Verify that owners hold exactly the distributed supply of `currency`.
    ///
    /// # Errors
    /// Returns [`LedgerError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify<S: WorldState + ?Sized>(state: &S, currency: &str) -> Result<SupplyReport> {
        let report = Self::measure(state, currency)?;
        if !report.is_conserved() {
            tracing::warn!(
                currency = %currency,
                expected = report.expected(),
                actual = report.actual(),
                "supply mismatch"
            );
            return Err(LedgerError::SupplyInvariantViolation {
                reason: format!(
                    "Currency {currency}: actual supply {} != expected {} \
                     (issued={}, undistributed={}, available={}, locked={})",
                    report.actual(),
                    report.expected(),
                    report.issued,
                    report.undistributed,
                    report.available,
                    report.locked,
                ),
            });
        }
        Ok(report)
    }
}
