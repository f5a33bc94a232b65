//! Settlement engine.
//!
//! Orchestrates the ledger components for the two mutating flows:
//!
//! **Lock / unlock** (`lock_or_unlock_balance`)
//! 1. Load the position and check the balance covers the amount
//! 2. Refuse a tuple already in the lock ledger (before any write)
//! 3. Write the balance, then the ledger entry
//!
//! **Settlement** (`exec_tx`)
//! 1. Idempotency: neither fill may already be logged
//! 2. Preflight: both source positions exist (before any write)
//! 3. Buy leg: release excess lock of a take-all first fill, spend the
//!    fill cost from locked, credit the destination currency
//! 4. Sell leg: the same
//! 5. Append both fills to the transaction log
//! 6. Optionally verify supply conservation of both currencies
//!
//! On an atomic state ([`StateTx`](fxledger_store::StateTx)) nothing lands
//! unless every step succeeds; `settle_atomic` and `lock_atomic` wrap the
//! flows in one. On a non-atomic state a failure after the first write
//! leaves earlier writes in place, which [`SettleStep::after_first_write`]
//! tells apart.

use chrono::{DateTime, Utc};
use fxledger_store::{CommitBatch, WorldState, run_atomic};
use fxledger_types::{
    Amount, EngineConfig, LedgerError, LockDirection, LockEntry, Order, Result, SettleStep, Side,
    TxLogEntry,
};
use serde::Serialize;

use crate::asset_store::{AssetStore, ensure_positive};
use crate::currency_registry::CurrencyRegistry;
use crate::lock_ledger::LockLedger;
use crate::supply::{SupplyConservation, SupplyReport};
use crate::transaction_log::TransactionLog;

/// Outcome of one settled fill pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    pub buy: TxLogEntry,
    pub sell: TxLogEntry,
    /// Excess lock returned to the buyer's available balance.
    pub buy_released: Amount,
    /// Excess lock returned to the seller's available balance.
    pub sell_released: Amount,
    pub settled_at: DateTime<Utc>,
}

/// Balance locking and fill settlement over a world state.
///
/// Holds configuration only; every call takes the state it works on.
#[derive(Debug, Clone, Default)]
pub struct SettlementEngine {
    config: EngineConfig,
}

impl SettlementEngine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =================================================================
    // Lock / unlock
    // =================================================================

    /// Lock (`available → locked`) or unlock (`locked → available`)
    /// `amount` of `owner`'s `currency` against `order_id`.
    ///
    /// # Errors
    /// - `NotFound` if the owner holds no position in `currency`
    /// - `InsufficientFunds` / `InsufficientLockedFunds` if the balance is short
    /// - `AlreadyExecuted` if this exact action was already applied
    /// - `FatalInconsistency` if, on a non-atomic state, the balance was
    ///   written but the ledger entry was not
    pub fn lock_or_unlock_balance<S: WorldState + ?Sized>(
        &self,
        state: &mut S,
        owner: &str,
        currency: &str,
        order_id: &str,
        amount: Amount,
        direction: LockDirection,
    ) -> Result<LockEntry> {
        ensure_positive(amount)?;

        // 1. Position
        let asset = AssetStore::get(state, owner, currency)?;

        // 2. Idempotency. Precedes sufficiency: a replay may find the
        // balance already used up by the original call.
        if LockLedger::find(state, owner, currency, order_id, direction)?.is_some() {
            tracing::warn!(
                owner = %owner,
                currency = %currency,
                order_id = %order_id,
                direction = %direction,
                "lock action already executed"
            );
            return Err(LedgerError::AlreadyExecuted {
                owner: owner.to_string(),
                currency: currency.to_string(),
                order_id: order_id.to_string(),
                direction,
            });
        }

        // 3. Sufficiency
        match direction {
            LockDirection::Lock if asset.count < amount => {
                return Err(LedgerError::InsufficientFunds {
                    owner: owner.to_string(),
                    currency: currency.to_string(),
                    needed: amount,
                    available: asset.count,
                });
            }
            LockDirection::Unlock if asset.lock_count < amount => {
                return Err(LedgerError::InsufficientLockedFunds {
                    owner: owner.to_string(),
                    currency: currency.to_string(),
                    needed: amount,
                    locked: asset.lock_count,
                });
            }
            _ => {}
        }

        // 4. Balance, then ledger
        match direction {
            LockDirection::Lock => AssetStore::apply_lock(state, owner, currency, amount)?,
            LockDirection::Unlock => AssetStore::apply_unlock(state, owner, currency, amount)?,
        };
        let entry = LockLedger::record_action(
            state,
            owner,
            currency,
            order_id,
            direction,
            amount,
            Utc::now(),
        )
        .map_err(|err| {
            if state.is_atomic() {
                return err;
            }
            tracing::error!(
                owner = %owner,
                currency = %currency,
                order_id = %order_id,
                direction = %direction,
                amount,
                error = %err,
                "balance written without its lock ledger entry"
            );
            LedgerError::FatalInconsistency {
                reason: format!(
                    "{direction} of {amount} {currency} for {owner} (order {order_id}) \
                     applied to the balance but not recorded: {err}"
                ),
            }
        })?;

        tracing::debug!(
            owner = %owner,
            currency = %currency,
            order_id = %order_id,
            direction = %direction,
            amount,
            "lock action applied"
        );
        Ok(entry)
    }

    /// [`lock_or_unlock_balance`](Self::lock_or_unlock_balance) as one
    /// atomic commit on `store`.
    pub fn lock_atomic<B: CommitBatch + ?Sized>(
        &self,
        store: &mut B,
        owner: &str,
        currency: &str,
        order_id: &str,
        amount: Amount,
        direction: LockDirection,
    ) -> Result<LockEntry> {
        run_atomic(store, |tx| {
            self.lock_or_unlock_balance(tx, owner, currency, order_id, amount, direction)
        })
    }

    // =================================================================
    // Partial-fill reconciliation
    // =================================================================

    /// Lock still unaccounted for under root order `root_order_id`:
    /// the amount locked for it, minus the cost of every fill already
    /// settled under it, minus `current_cost`.
    ///
    /// May be negative; callers only release a positive remainder.
    ///
    /// # Errors
    /// `NotFound` if the root order has no lock entry.
    pub fn compute_balance<S: WorldState + ?Sized>(
        &self,
        state: &S,
        owner: &str,
        src_currency: &str,
        des_currency: &str,
        root_order_id: &str,
        current_cost: Amount,
    ) -> Result<Amount> {
        let locked = LockLedger::amount_locked_for(state, owner, src_currency, root_order_id)?;
        let mut spent: Amount = 0;
        for fill in
            TransactionLog::list_by_root(state, owner, src_currency, des_currency, root_order_id)?
        {
            spent += fill?.final_cost;
        }
        Ok(locked - spent - current_cost)
    }

    // =================================================================
    // Settlement
    // =================================================================

    /// Settle a matched fill pair.
    ///
    /// # Errors
    /// - `FillAlreadySettled` if both fills are already logged
    /// - `SettlementStep { step, source }` for every other failure, naming
    ///   the step that failed
    pub fn exec_tx<S: WorldState + ?Sized>(
        &self,
        state: &mut S,
        buy: &Order,
        sell: &Order,
    ) -> Result<SettlementReceipt> {
        let settled_at = Utc::now();

        // 1. Idempotency
        Self::check_not_settled(state, buy, sell)?;

        // 2. Preflight
        if self.config.preflight {
            Self::preflight(state, buy, sell).map_err(|e| e.at_step(SettleStep::Preflight))?;
        }

        // 3-4. Both legs
        let buy_released = self.settle_leg(state, Side::Buy, buy)?;
        let sell_released = self.settle_leg(state, Side::Sell, sell)?;

        // 5. Transaction log
        let (buy_entry, sell_entry) = Self::append_pair(state, buy, sell, settled_at)
            .map_err(|e| e.at_step(SettleStep::AppendLog))?;

        // 6. Supply
        if self.config.verify_supply_after_settle {
            Self::verify_pair_supply(state, buy)
                .map_err(|e| e.at_step(SettleStep::SupplyCheck))?;
        }

        tracing::info!(
            buy_fill = %buy.uuid,
            sell_fill = %sell.uuid,
            buyer = %buy.account,
            seller = %sell.account,
            buy_cost = buy.final_cost,
            sell_cost = sell.final_cost,
            atomic = state.is_atomic(),
            "fill pair settled"
        );

        Ok(SettlementReceipt {
            buy: buy_entry,
            sell: sell_entry,
            buy_released,
            sell_released,
            settled_at,
        })
    }

    /// [`exec_tx`](Self::exec_tx) as one atomic commit on `store`.
    pub fn settle_atomic<B: CommitBatch + ?Sized>(
        &self,
        store: &mut B,
        buy: &Order,
        sell: &Order,
    ) -> Result<SettlementReceipt> {
        run_atomic(store, |tx| self.exec_tx(tx, buy, sell))
    }

    /// Verify supply conservation for `currency`.
    pub fn verify_supply<S: WorldState + ?Sized>(
        &self,
        state: &S,
        currency: &str,
    ) -> Result<SupplyReport> {
        SupplyConservation::verify(state, currency)
    }

    fn check_not_settled<S: WorldState + ?Sized>(
        state: &S,
        buy: &Order,
        sell: &Order,
    ) -> Result<()> {
        let at_idempotency = |e: LedgerError| e.at_step(SettleStep::Idempotency);
        let buy_done = TransactionLog::get_by_uuid(state, &buy.uuid)
            .map_err(at_idempotency)?
            .is_some();
        let sell_done = TransactionLog::get_by_uuid(state, &sell.uuid)
            .map_err(at_idempotency)?
            .is_some();

        let (settled, pending) = match (buy_done, sell_done) {
            (false, false) => return Ok(()),
            (true, true) => {
                tracing::warn!(
                    buy_fill = %buy.uuid,
                    sell_fill = %sell.uuid,
                    "fill pair already settled"
                );
                return Err(LedgerError::FillAlreadySettled {
                    buy_fill: buy.uuid.clone(),
                    sell_fill: sell.uuid.clone(),
                });
            }
            (true, false) => (&buy.uuid, &sell.uuid),
            (false, true) => (&sell.uuid, &buy.uuid),
        };
        tracing::warn!(settled = %settled, pending = %pending, "fill pair half settled");
        Err(at_idempotency(LedgerError::PartiallySettledPair {
            settled: settled.clone(),
            pending: pending.clone(),
        }))
    }

    fn preflight<S: WorldState + ?Sized>(state: &S, buy: &Order, sell: &Order) -> Result<()> {
        if buy.uuid == sell.uuid {
            return Err(LedgerError::InvalidArguments {
                reason: format!("buy and sell carry the same fill id {}", buy.uuid),
            });
        }
        for order in [buy, sell] {
            ensure_positive(order.final_cost)?;
            ensure_positive(order.des_count)?;
            AssetStore::get(state, &order.account, &order.src_currency)?;
        }
        Ok(())
    }

    fn append_pair<S: WorldState + ?Sized>(
        state: &mut S,
        buy: &Order,
        sell: &Order,
        at: DateTime<Utc>,
    ) -> Result<(TxLogEntry, TxLogEntry)> {
        let buy_entry = TransactionLog::append(state, buy, at)?;
        let sell_entry = TransactionLog::append(state, sell, at)?;
        Ok((buy_entry, sell_entry))
    }

    /// Release, spend, credit for one side. Returns the released excess.
    fn settle_leg<S: WorldState + ?Sized>(
        &self,
        state: &mut S,
        side: Side,
        order: &Order,
    ) -> Result<Amount> {
        let mut released = 0;
        if order.releases_excess() {
            let step = SettleStep::ReleaseExcess(side);
            let remainder = self
                .compute_balance(
                    state,
                    &order.account,
                    &order.src_currency,
                    &order.des_currency,
                    &order.raw_uuid,
                    order.final_cost,
                )
                .map_err(|e| e.at_step(step))?;
            tracing::debug!(side = %side, fill = %order.uuid, remainder, "take-all remainder");
            if remainder > 0 {
                self.lock_or_unlock_balance(
                    state,
                    &order.account,
                    &order.src_currency,
                    &order.raw_uuid,
                    remainder,
                    LockDirection::Unlock,
                )
                .map_err(|e| e.at_step(step))?;
                released = remainder;
            }
        }

        AssetStore::spend_locked(state, &order.account, &order.src_currency, order.final_cost)
            .map_err(|e| e.at_step(SettleStep::SpendLocked(side)))?;
        AssetStore::credit(state, &order.account, &order.des_currency, order.des_count)
            .map_err(|e| e.at_step(SettleStep::CreditDestination(side)))?;

        tracing::debug!(
            side = %side,
            fill = %order.uuid,
            account = %order.account,
            cost = order.final_cost,
            received = order.des_count,
            "leg settled"
        );
        Ok(released)
    }

    /// Supply of both currencies of the pair. Currencies that were never
    /// issued through the registry have no supply to conserve and are
    /// skipped.
    fn verify_pair_supply<S: WorldState + ?Sized>(state: &S, buy: &Order) -> Result<()> {
        for currency in [&buy.src_currency, &buy.des_currency] {
            if CurrencyRegistry::find_by_public_id(state, currency)?.is_none() {
                tracing::debug!(currency = %currency, "unregistered currency, supply not checked");
                continue;
            }
            SupplyConservation::verify(state, currency)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxledger_store::MemoryWorldState;
    use fxledger_types::ErrorClass;

    fn engine() -> SettlementEngine {
        SettlementEngine::default()
    }

    #[test]
    fn lock_moves_available_to_locked() {
        let mut state = MemoryWorldState::new();
        AssetStore::credit(&mut state, "A", "X", 100).unwrap();

        let entry = engine()
            .lock_or_unlock_balance(&mut state, "A", "X", "o1", 40, LockDirection::Lock)
            .unwrap();
        assert_eq!(entry.amount, 40);

        let asset = AssetStore::get(&state, "A", "X").unwrap();
        assert_eq!((asset.count, asset.lock_count), (60, 40));
    }

    #[test]
    fn lock_without_position_is_not_found() {
        let mut state = MemoryWorldState::new();
        let err = engine()
            .lock_or_unlock_balance(&mut state, "A", "X", "o1", 1, LockDirection::Lock)
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
        assert_eq!(err.class(), ErrorClass::Check);
        assert!(state.is_empty());
    }

    #[test]
    fn unlock_needs_locked_balance() {
        let mut state = MemoryWorldState::new();
        AssetStore::credit(&mut state, "A", "X", 100).unwrap();
        let err = engine()
            .lock_or_unlock_balance(&mut state, "A", "X", "o1", 1, LockDirection::Unlock)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientLockedFunds { .. }));
    }

    #[test]
    fn compute_balance_subtracts_prior_fills() {
        let mut state = MemoryWorldState::new();
        AssetStore::credit(&mut state, "A", "X", 100).unwrap();
        let root = Order::dummy_fill("A", "X", "Y", 30, 3);
        engine()
            .lock_or_unlock_balance(&mut state, "A", "X", &root.raw_uuid, 100, LockDirection::Lock)
            .unwrap();
        TransactionLog::append(&mut state, &root, Utc::now()).unwrap();

        let remainder = engine()
            .compute_balance(&state, "A", "X", "Y", &root.raw_uuid, 20)
            .unwrap();
        assert_eq!(remainder, 50);
    }

    #[test]
    fn compute_balance_without_lock_is_not_found() {
        let state = MemoryWorldState::new();
        assert!(matches!(
            engine().compute_balance(&state, "A", "X", "Y", "root", 1),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn same_fill_on_both_sides_rejected() {
        let mut state = MemoryWorldState::new();
        AssetStore::credit(&mut state, "A", "X", 10).unwrap();
        let buy = Order::dummy_fill("A", "X", "Y", 1, 1);
        let mut sell = Order::dummy_fill("A", "Y", "X", 1, 1);
        sell.uuid.clone_from(&buy.uuid);

        let err = engine().exec_tx(&mut state, &buy, &sell).unwrap_err();
        assert_eq!(err.failed_step(), Some(SettleStep::Preflight));
        assert!(matches!(err.root_cause(), LedgerError::InvalidArguments { .. }));
    }
}
