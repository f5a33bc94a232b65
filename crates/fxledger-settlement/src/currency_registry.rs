//! Issued currencies.
//!
//! A [`Currency`] is stored under its uuid. The unique key `id` maps the
//! public id to that uuid, and the pure index `creator~uuid` lists a
//! creator's currencies. Releases and assignments append an
//! [`IssuanceLog`] under `issuance~currency~uuid`.

use chrono::{DateTime, Utc};
use fxledger_store::{WorldState, create_composite_key};
use fxledger_types::constants::{
    CURRENCY_BY_CREATOR_INDEX, CURRENCY_BY_ID_INDEX, INDEX_MARKER, ISSUANCE_LOG_INDEX,
};
use fxledger_types::{
    Amount, Currency, IssuanceKind, IssuanceLog, LedgerError, RecordId, RecordKind, Result,
};

use crate::asset_store::{AssetStore, ensure_positive};
use crate::records::{self, RecordIter};

/// Currency issuance and distribution.
pub struct CurrencyRegistry;

impl CurrencyRegistry {
    /// Issue a new currency with `total_count` units, all undistributed.
    ///
    /// # Errors
    /// [`LedgerError::DuplicateCurrency`] if `id` is taken,
    /// [`LedgerError::InvalidAmount`] if `total_count` is negative.
    pub fn create<S: WorldState + ?Sized>(
        state: &mut S,
        id: &str,
        creator: &str,
        total_count: Amount,
        at: DateTime<Utc>,
    ) -> Result<Currency> {
        if id.is_empty() || creator.is_empty() {
            return Err(LedgerError::InvalidArguments {
                reason: "currency id and creator must not be empty".to_string(),
            });
        }
        if total_count < 0 {
            return Err(LedgerError::InvalidAmount {
                amount: total_count,
            });
        }
        if Self::find_by_public_id(state, id)?.is_some() {
            return Err(LedgerError::DuplicateCurrency(id.to_string()));
        }

        let currency = Currency {
            uuid: RecordId::new(),
            id: id.to_string(),
            count: total_count,
            left_count: total_count,
            creator: creator.to_string(),
            create_time: at,
        };
        let uuid = currency.uuid.to_string();
        records::save(state, &uuid, &currency)?;
        records::point(state, CURRENCY_BY_ID_INDEX, &[id], &uuid)?;
        state.put_state(
            &create_composite_key(CURRENCY_BY_CREATOR_INDEX, &[creator, uuid.as_str()])?,
            INDEX_MARKER.to_vec(),
        )?;

        tracing::info!(currency = %id, creator = %creator, count = total_count, "currency created");
        Ok(currency)
    }

    /// Look up a currency by its public id.
    pub fn find_by_public_id<S: WorldState + ?Sized>(
        state: &S,
        id: &str,
    ) -> Result<Option<Currency>> {
        records::load_pointed(state, CURRENCY_BY_ID_INDEX, &[id])
    }

    /// Look up a currency by its public id.
    ///
    /// # Errors
    /// [`LedgerError::NotFound`] when no such currency exists.
    pub fn get_by_public_id<S: WorldState + ?Sized>(state: &S, id: &str) -> Result<Currency> {
        Self::find_by_public_id(state, id)?
            .ok_or_else(|| LedgerError::not_found(RecordKind::Currency, id))
    }

    /// Every currency issued by `creator`.
    pub fn list_by_creator<'s, S: WorldState + ?Sized>(
        state: &'s S,
        creator: &str,
    ) -> Result<RecordIter<'s, Currency>> {
        records::scan_indexed(state, CURRENCY_BY_CREATOR_INDEX, &[creator])
    }

    /// Every currency.
    pub fn list_all<S: WorldState + ?Sized>(state: &S) -> Result<RecordIter<'_, Currency>> {
        records::scan_pointed(state, CURRENCY_BY_ID_INDEX, &[])
    }

    /// Issue `count` more units to the undistributed pool.
    pub fn release<S: WorldState + ?Sized>(
        state: &mut S,
        id: &str,
        creator: &str,
        count: Amount,
        at: DateTime<Utc>,
    ) -> Result<Currency> {
        ensure_positive(count)?;
        let mut currency = Self::owned_by(state, id, creator)?;
        let overflow = || LedgerError::InvalidAmount { amount: count };
        currency.count = currency.count.checked_add(count).ok_or_else(overflow)?;
        currency.left_count = currency.left_count.checked_add(count).ok_or_else(overflow)?;
        records::save(state, &currency.uuid.to_string(), &currency)?;
        Self::log_issuance(state, id, IssuanceKind::Release, None, count, at)?;

        tracing::info!(currency = %id, count, total = currency.count, "currency released");
        Ok(currency)
    }

    /// Move `count` undistributed units to `owner`'s available balance.
    ///
    /// # Errors
    /// [`LedgerError::InsufficientFunds`] when fewer than `count` units are
    /// left to distribute.
    pub fn assign<S: WorldState + ?Sized>(
        state: &mut S,
        id: &str,
        creator: &str,
        owner: &str,
        count: Amount,
        at: DateTime<Utc>,
    ) -> Result<Currency> {
        ensure_positive(count)?;
        let mut currency = Self::owned_by(state, id, creator)?;
        if currency.left_count < count {
            return Err(LedgerError::InsufficientFunds {
                owner: creator.to_string(),
                currency: id.to_string(),
                needed: count,
                available: currency.left_count,
            });
        }
        currency.left_count -= count;
        records::save(state, &currency.uuid.to_string(), &currency)?;
        AssetStore::credit(state, owner, id, count)?;
        Self::log_issuance(state, id, IssuanceKind::Assign, Some(owner), count, at)?;

        tracing::info!(
            currency = %id,
            owner = %owner,
            count,
            left = currency.left_count,
            "currency assigned"
        );
        Ok(currency)
    }

    /// Release and assignment history of a currency.
    pub fn issuance_log<'s, S: WorldState + ?Sized>(
        state: &'s S,
        id: &str,
    ) -> Result<RecordIter<'s, IssuanceLog>> {
        records::scan_records(state, ISSUANCE_LOG_INDEX, &[id])
    }

    fn owned_by<S: WorldState + ?Sized>(state: &S, id: &str, caller: &str) -> Result<Currency> {
        let currency = Self::get_by_public_id(state, id)?;
        if currency.creator != caller {
            return Err(LedgerError::NotCurrencyCreator {
                currency: id.to_string(),
                caller: caller.to_string(),
            });
        }
        Ok(currency)
    }

    fn log_issuance<S: WorldState + ?Sized>(
        state: &mut S,
        id: &str,
        kind: IssuanceKind,
        owner: Option<&str>,
        count: Amount,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let log = IssuanceLog {
            uuid: RecordId::new(),
            currency: id.to_string(),
            kind,
            owner: owner.map(str::to_string),
            count,
            timestamp: at,
        };
        let key = create_composite_key(ISSUANCE_LOG_INDEX, &[id, log.uuid.to_string().as_str()])?;
        records::save(state, &key, &log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxledger_store::MemoryWorldState;

    fn with_currency() -> MemoryWorldState {
        let mut state = MemoryWorldState::new();
        CurrencyRegistry::create(&mut state, "GOLD", "mint", 1_000, Utc::now()).unwrap();
        state
    }

    #[test]
    fn create_and_lookup() {
        let state = with_currency();
        let gold = CurrencyRegistry::get_by_public_id(&state, "GOLD").unwrap();
        assert_eq!(gold.count, 1_000);
        assert_eq!(gold.left_count, 1_000);
        assert_eq!(gold.creator, "mint");
        assert_eq!(gold.distributed(), 0);

        assert!(matches!(
            CurrencyRegistry::get_by_public_id(&state, "SILVER"),
            Err(LedgerError::NotFound { kind: RecordKind::Currency, .. })
        ));
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut state = with_currency();
        let err = CurrencyRegistry::create(&mut state, "GOLD", "other", 5, Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateCurrency(id) if id == "GOLD"));
    }

    #[test]
    fn negative_issue_rejected() {
        let mut state = MemoryWorldState::new();
        assert!(matches!(
            CurrencyRegistry::create(&mut state, "X", "mint", -1, Utc::now()),
            Err(LedgerError::InvalidAmount { amount: -1 })
        ));
        assert!(state.is_empty());
    }

    #[test]
    fn assign_credits_owner() {
        let mut state = with_currency();
        let gold =
            CurrencyRegistry::assign(&mut state, "GOLD", "mint", "alice", 300, Utc::now()).unwrap();
        assert_eq!(gold.left_count, 700);
        assert_eq!(AssetStore::get(&state, "alice", "GOLD").unwrap().count, 300);

        let err = CurrencyRegistry::assign(&mut state, "GOLD", "mint", "bob", 701, Utc::now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { available: 700, .. }));
    }

    #[test]
    fn release_grows_supply() {
        let mut state = with_currency();
        let gold = CurrencyRegistry::release(&mut state, "GOLD", "mint", 50, Utc::now()).unwrap();
        assert_eq!((gold.count, gold.left_count), (1_050, 1_050));

        let kinds: Vec<IssuanceKind> = CurrencyRegistry::issuance_log(&state, "GOLD")
            .unwrap()
            .map(|l| l.unwrap().kind)
            .collect();
        assert_eq!(kinds, vec![IssuanceKind::Release]);
    }

    #[test]
    fn only_creator_may_issue() {
        let mut state = with_currency();
        assert!(matches!(
            CurrencyRegistry::release(&mut state, "GOLD", "mallory", 1, Utc::now()),
            Err(LedgerError::NotCurrencyCreator { .. })
        ));
        assert!(matches!(
            CurrencyRegistry::assign(&mut state, "GOLD", "mallory", "mallory", 1, Utc::now()),
            Err(LedgerError::NotCurrencyCreator { .. })
        ));
    }

    #[test]
    fn listings() {
        let mut state = with_currency();
        CurrencyRegistry::create(&mut state, "SILVER", "mint", 10, Utc::now()).unwrap();
        CurrencyRegistry::create(&mut state, "TOKEN", "dao", 10, Utc::now()).unwrap();

        let mut mint: Vec<String> = CurrencyRegistry::list_by_creator(&state, "mint")
            .unwrap()
            .map(|c| c.unwrap().id)
            .collect();
        mint.sort();
        assert_eq!(mint, vec!["GOLD", "SILVER"]);
        assert_eq!(CurrencyRegistry::list_all(&state).unwrap().count(), 3);
        assert_eq!(CurrencyRegistry::list_by_creator(&state, "nobody").unwrap().count(), 0);
    }
}
