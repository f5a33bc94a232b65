//! Per-(owner, currency) balance positions.
//!
//! An [`Asset`] is stored under its uuid. Two index entries point at it:
//!
//! ```text
//! owner~currency        (owner, currency) -> uuid   unique lookup and per-owner listing
//! currency~owner~uuid   (currency, owner, uuid)     per-currency listing (supply checks)
//! ```
//!
//! The unique entry is what makes position creation conflict: two
//! transactions creating the same (owner, currency) both read and write it.
//!
//! Balance invariants (`count >= 0`, `lock_count >= 0`) are checked on every
//! write, and `count + lock_count` never exceeds [`Amount::MAX`]. Positions
//! are created on first credit and never deleted.

use fxledger_store::{WorldState, create_composite_key};
use fxledger_types::constants::{ASSET_BY_CURRENCY_INDEX, ASSET_BY_OWNER_INDEX, INDEX_MARKER};
use fxledger_types::{Amount, Asset, LedgerError, RecordId, RecordKind, Result};

use crate::records::{self, RecordIter};

/// Reject zero and negative amounts.
pub(crate) fn ensure_positive(amount: Amount) -> Result<()> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount { amount });
    }
    Ok(())
}

/// Balance positions in the world state.
pub struct AssetStore;

impl AssetStore {
    /// The position of `owner` in `currency`, if one exists.
    pub fn find<S: WorldState + ?Sized>(
        state: &S,
        owner: &str,
        currency: &str,
    ) -> Result<Option<Asset>> {
        records::load_pointed(state, ASSET_BY_OWNER_INDEX, &[owner, currency])
    }

    /// The position of `owner` in `currency`.
    ///
    /// # Errors
    /// [`LedgerError::NotFound`] when the owner holds no such position.
    pub fn get<S: WorldState + ?Sized>(state: &S, owner: &str, currency: &str) -> Result<Asset> {
        Self::find(state, owner, currency)?
            .ok_or_else(|| LedgerError::not_found(RecordKind::Asset, format!("{owner}/{currency}")))
    }

    /// Write a position, assigning its uuid and index entries on first store.
    pub fn put<S: WorldState + ?Sized>(state: &mut S, asset: &mut Asset) -> Result<()> {
        if !asset.is_consistent() {
            return Err(LedgerError::FatalInconsistency {
                reason: format!(
                    "refusing to store {}/{} with count {} and lock_count {}",
                    asset.owner, asset.currency, asset.count, asset.lock_count
                ),
            });
        }

        let is_new = asset.uuid.is_nil();
        if is_new {
            asset.uuid = RecordId::new();
        }
        let uuid = asset.uuid.to_string();
        records::save(state, &uuid, asset)?;

        if is_new {
            records::point(
                state,
                ASSET_BY_OWNER_INDEX,
                &[asset.owner.as_str(), asset.currency.as_str()],
                &uuid,
            )?;
            let by_currency = create_composite_key(
                ASSET_BY_CURRENCY_INDEX,
                &[asset.currency.as_str(), asset.owner.as_str(), uuid.as_str()],
            )?;
            state.put_state(&by_currency, INDEX_MARKER.to_vec())?;
            tracing::debug!(
                owner = %asset.owner,
                currency = %asset.currency,
                uuid = %uuid,
                "position created"
            );
        }
        Ok(())
    }

    /// Add `amount` to the available balance, creating the position if
    /// absent.
    pub fn credit<S: WorldState + ?Sized>(
        state: &mut S,
        owner: &str,
        currency: &str,
        amount: Amount,
    ) -> Result<Asset> {
        ensure_positive(amount)?;
        let mut asset =
            Self::find(state, owner, currency)?.unwrap_or_else(|| Asset::new(owner, currency));
        asset.count = asset
            .count
            .checked_add(amount)
            .filter(|count| count.checked_add(asset.lock_count).is_some())
            .ok_or(LedgerError::InvalidAmount { amount })?;
        Self::put(state, &mut asset)?;
        Ok(asset)
    }

    /// Move `amount` from available to locked.
    ///
    /// # Errors
    /// [`LedgerError::InsufficientFunds`] when less than `amount` is available.
    pub fn apply_lock<S: WorldState + ?Sized>(
        state: &mut S,
        owner: &str,
        currency: &str,
        amount: Amount,
    ) -> Result<Asset> {
        ensure_positive(amount)?;
        let mut asset = Self::get(state, owner, currency)?;
        if asset.count < amount {
            return Err(LedgerError::InsufficientFunds {
                owner: owner.to_string(),
                currency: currency.to_string(),
                needed: amount,
                available: asset.count,
            });
        }
        asset.lock_count = asset
            .lock_count
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount { amount })?;
        asset.count -= amount;
        Self::put(state, &mut asset)?;
        Ok(asset)
    }

    /// Move `amount` from locked back to available.
    ///
    /// # Errors
    /// [`LedgerError::InsufficientLockedFunds`] when less than `amount` is locked.
    pub fn apply_unlock<S: WorldState + ?Sized>(
        state: &mut S,
        owner: &str,
        currency: &str,
        amount: Amount,
    ) -> Result<Asset> {
        ensure_positive(amount)?;
        let mut asset = Self::get(state, owner, currency)?;
        Self::ensure_locked(&asset, amount)?;
        asset.count = asset
            .count
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount { amount })?;
        asset.lock_count -= amount;
        Self::put(state, &mut asset)?;
        Ok(asset)
    }

    /// Extinguish `amount` of the locked balance (the cost of a fill).
    pub fn spend_locked<S: WorldState + ?Sized>(
        state: &mut S,
        owner: &str,
        currency: &str,
        amount: Amount,
    ) -> Result<Asset> {
        ensure_positive(amount)?;
        let mut asset = Self::get(state, owner, currency)?;
        Self::ensure_locked(&asset, amount)?;
        asset.lock_count -= amount;
        Self::put(state, &mut asset)?;
        Ok(asset)
    }

    /// Move `amount` from `from`'s locked balance to `to`'s available
    /// balance in the same currency.
    pub fn transfer_locked<S: WorldState + ?Sized>(
        state: &mut S,
        from: &str,
        to: &str,
        currency: &str,
        amount: Amount,
    ) -> Result<(Asset, Asset)> {
        let debited = Self::spend_locked(state, from, currency, amount)?;
        let credited = Self::credit(state, to, currency, amount)?;
        Ok((debited, credited))
    }

    /// Every position held by `owner`.
    pub fn list_by_owner<'s, S: WorldState + ?Sized>(
        state: &'s S,
        owner: &str,
    ) -> Result<RecordIter<'s, Asset>> {
        records::scan_pointed(state, ASSET_BY_OWNER_INDEX, &[owner])
    }

    /// Every position in `currency`, across all owners.
    pub fn list_by_currency<'s, S: WorldState + ?Sized>(
        state: &'s S,
        currency: &str,
    ) -> Result<RecordIter<'s, Asset>> {
        records::scan_indexed(state, ASSET_BY_CURRENCY_INDEX, &[currency])
    }

    fn ensure_locked(asset: &Asset, amount: Amount) -> Result<()> {
        if asset.lock_count < amount {
            return Err(LedgerError::InsufficientLockedFunds {
                owner: asset.owner.clone(),
                currency: asset.currency.clone(),
                needed: amount,
                locked: asset.lock_count,
            });
        }
        Ok(())
    }
}
