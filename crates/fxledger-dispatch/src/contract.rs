//! The ledger contract: `init`, `invoke` and `query` entry points.
//!
//! `invoke` runs each call in its own [`StateTx`](fxledger_store::StateTx)
//! and commits only on success. `query` borrows the store immutably, so it
//! cannot write. Responses are JSON bytes.

use chrono::Utc;
use fxledger_settlement::{
    AssetStore, CurrencyRegistry, LockLedger, SettlementEngine, TransactionLog,
};
use fxledger_store::{CommitBatch, WorldState, run_atomic};
use fxledger_types::{
    Asset, Currency, IssuanceLog, LedgerConfig, LedgerError, LockDirection, Order, RecordKind,
    Result, constants,
};
use serde::Serialize;
use serde_json::json;

use crate::args::{Args, decode_invocation};

/// Mutating functions routed by [`LedgerContract::invoke`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeFunction {
    CreateCurrency,
    ReleaseCurrency,
    AssignCurrency,
    LockBalance,
    UnlockBalance,
    Settle,
}

impl std::str::FromStr for InvokeFunction {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "createCurrency" => Ok(Self::CreateCurrency),
            "releaseCurrency" => Ok(Self::ReleaseCurrency),
            "assignCurrency" => Ok(Self::AssignCurrency),
            "lockBalance" => Ok(Self::LockBalance),
            "unlockBalance" => Ok(Self::UnlockBalance),
            "settle" => Ok(Self::Settle),
            other => Err(LedgerError::UnknownFunction {
                function: other.to_string(),
            }),
        }
    }
}

/// Read-only functions routed by [`LedgerContract::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFunction {
    GetBalance,
    GetAssets,
    GetCurrency,
    GetMyCurrency,
    GetAllCurrency,
    GetIssuanceLog,
    GetLockLog,
    GetTx,
    GetTxsByRoot,
    VerifySupply,
}

impl std::str::FromStr for QueryFunction {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "getBalance" => Ok(Self::GetBalance),
            "getAssets" => Ok(Self::GetAssets),
            "getCurrency" => Ok(Self::GetCurrency),
            "getMyCurrency" => Ok(Self::GetMyCurrency),
            "getAllCurrency" => Ok(Self::GetAllCurrency),
            "getIssuanceLog" => Ok(Self::GetIssuanceLog),
            "getLockLog" => Ok(Self::GetLockLog),
            "getTx" => Ok(Self::GetTx),
            "getTxsByRoot" => Ok(Self::GetTxsByRoot),
            "verifySupply" => Ok(Self::VerifySupply),
            other => Err(LedgerError::UnknownFunction {
                function: other.to_string(),
            }),
        }
    }
}

fn respond<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Entry points of the exchange ledger.
///
/// Holds immutable configuration only; the store is passed to every call.
#[derive(Debug, Clone, Default)]
pub struct LedgerContract {
    config: LedgerConfig,
    engine: SettlementEngine,
}

impl LedgerContract {
    #[must_use]
    pub fn new(config: LedgerConfig) -> Self {
        let engine = SettlementEngine::new(config.engine.clone());
        Self { config, engine }
    }

    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Deployment-time initialisation. An optional JSON [`LedgerConfig`] in
    /// `args[0]` replaces the current configuration; no balance is touched.
    pub fn init(&mut self, args: &[String]) -> Result<Vec<u8>> {
        if let Some(raw) = args.first().filter(|raw| !raw.trim().is_empty()) {
            *self = Self::new(LedgerConfig::from_json(raw)?);
        }
        tracing::info!(
            engine = constants::ENGINE_NAME,
            version = constants::VERSION,
            arg_encoding = ?self.config.arg_encoding,
            "ledger initialized"
        );
        Ok(Vec::new())
    }

    /// Run a mutating function as one atomic commit on `store`.
    ///
    /// A call whose effect already happened (`AlreadyExecuted`,
    /// `FillAlreadySettled`) succeeds with `{"status":"already_executed"}`
    /// and commits nothing.
    pub fn invoke<B: CommitBatch + ?Sized>(
        &self,
        store: &mut B,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        let (function, args) = decode_invocation(self.config.arg_encoding, function, args);
        let routed: InvokeFunction = function.parse()?;
        tracing::debug!(function = %function, args = args.len(), "invoke");

        match run_atomic(store, |tx| self.route_invoke(tx, routed, &function, &args)) {
            Ok(response) => Ok(response),
            Err(err) if err.is_replay() => {
                tracing::info!(function = %function, error = %err, "replayed invocation");
                respond(&json!({ "status": "already_executed" }))
            }
            Err(err) => {
                tracing::warn!(
                    function = %function,
                    class = %err.class(),
                    error = %err,
                    "invoke failed"
                );
                Err(err)
            }
        }
    }

    /// Run a read-only function against `store`.
    pub fn query<S: WorldState + ?Sized>(
        &self,
        store: &S,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        let (function, args) = decode_invocation(self.config.arg_encoding, function, args);
        let routed: QueryFunction = function.parse()?;
        tracing::debug!(function = %function, args = args.len(), "query");
        self.route_query(store, routed, &function, &args)
    }

    fn route_invoke<S: WorldState + ?Sized>(
        &self,
        state: &mut S,
        routed: InvokeFunction,
        function: &str,
        values: &[String],
    ) -> Result<Vec<u8>> {
        let now = Utc::now();
        match routed {
            InvokeFunction::CreateCurrency => {
                let a = Args::exact(function, values, &["id", "count", "creator"])?;
                let currency =
                    CurrencyRegistry::create(state, a.str(0), a.str(2), a.amount(1)?, now)?;
                respond(&currency)
            }
            InvokeFunction::ReleaseCurrency => {
                let a = Args::exact(function, values, &["id", "count", "creator"])?;
                let currency =
                    CurrencyRegistry::release(state, a.str(0), a.str(2), a.amount(1)?, now)?;
                respond(&currency)
            }
            InvokeFunction::AssignCurrency => {
                let a = Args::exact(function, values, &["id", "owner", "count", "creator"])?;
                let currency = CurrencyRegistry::assign(
                    state,
                    a.str(0),
                    a.str(3),
                    a.str(1),
                    a.amount(2)?,
                    now,
                )?;
                respond(&currency)
            }
            InvokeFunction::LockBalance | InvokeFunction::UnlockBalance => {
                let a =
                    Args::exact(function, values, &["owner", "currency", "orderId", "amount"])?;
                let direction =
                    LockDirection::from_is_lock(routed == InvokeFunction::LockBalance);
                let entry = self.engine.lock_or_unlock_balance(
                    state,
                    a.str(0),
                    a.str(1),
                    a.str(2),
                    a.amount(3)?,
                    direction,
                )?;
                respond(&entry)
            }
            InvokeFunction::Settle => {
                let a = Args::exact(function, values, &["buyOrder", "sellOrder"])?;
                let (buy, sell) = (a.order(0)?, a.order(1)?);
                let receipt = self.engine.exec_tx(state, &buy, &sell)?;
                respond(&receipt)
            }
        }
    }

    fn route_query<S: WorldState + ?Sized>(
        &self,
        state: &S,
        routed: QueryFunction,
        function: &str,
        values: &[String],
    ) -> Result<Vec<u8>> {
        match routed {
            QueryFunction::GetBalance => {
                let a = Args::exact(function, values, &["owner", "currency"])?;
                respond(&AssetStore::get(state, a.str(0), a.str(1))?)
            }
            QueryFunction::GetAssets => {
                let a = Args::exact(function, values, &["owner"])?;
                let assets = AssetStore::list_by_owner(state, a.str(0))?
                    .collect::<Result<Vec<Asset>>>()?;
                respond(&assets)
            }
            QueryFunction::GetCurrency => {
                let a = Args::exact(function, values, &["id"])?;
                respond(&CurrencyRegistry::get_by_public_id(state, a.str(0))?)
            }
            QueryFunction::GetMyCurrency => {
                let a = Args::exact(function, values, &["owner"])?;
                let mine = CurrencyRegistry::list_by_creator(state, a.str(0))?
                    .collect::<Result<Vec<Currency>>>()?;
                if mine.is_empty() {
                    return Err(LedgerError::not_found(
                        RecordKind::Currency,
                        format!("created by {}", a.str(0)),
                    ));
                }
                respond(&mine)
            }
            QueryFunction::GetAllCurrency => {
                Args::exact(function, values, &[])?;
                let all = CurrencyRegistry::list_all(state)?.collect::<Result<Vec<Currency>>>()?;
                respond(&all)
            }
            QueryFunction::GetIssuanceLog => {
                let a = Args::exact(function, values, &["id"])?;
                CurrencyRegistry::get_by_public_id(state, a.str(0))?;
                let history = CurrencyRegistry::issuance_log(state, a.str(0))?
                    .collect::<Result<Vec<IssuanceLog>>>()?;
                respond(&history)
            }
            QueryFunction::GetLockLog => {
                let a = Args::exact(
                    function,
                    values,
                    &["owner", "currency", "orderId", "direction"],
                )?;
                let direction = a.direction(3)?;
                let entry = LockLedger::find(state, a.str(0), a.str(1), a.str(2), direction)?
                    .ok_or_else(|| {
                        LedgerError::not_found(
                            RecordKind::LockEntry,
                            format!("{}/{}/{}/{direction}", a.str(0), a.str(1), a.str(2)),
                        )
                    })?;
                respond(&entry)
            }
            QueryFunction::GetTx => {
                let a = Args::exact(function, values, &["fillUuid"])?;
                let order = TransactionLog::get_by_uuid(state, a.str(0))?
                    .ok_or_else(|| LedgerError::not_found(RecordKind::TxLog, a.str(0)))?;
                respond(&order)
            }
            QueryFunction::GetTxsByRoot => {
                let a = Args::exact(function, values, &["owner", "src", "des", "root"])?;
                let fills =
                    TransactionLog::list_by_root(state, a.str(0), a.str(1), a.str(2), a.str(3))?
                        .collect::<Result<Vec<Order>>>()?;
                respond(&fills)
            }
            QueryFunction::VerifySupply => {
                let a = Args::exact(function, values, &["currency"])?;
                respond(&self.engine.verify_supply(state, a.str(0))?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxledger_types::ArgEncoding;

    #[test]
    fn function_names_route() {
        assert_eq!(
            "settle".parse::<InvokeFunction>().unwrap(),
            InvokeFunction::Settle
        );
        assert_eq!(
            "getIssuanceLog".parse::<QueryFunction>().unwrap(),
            QueryFunction::GetIssuanceLog
        );
        assert_eq!(
            "getTxsByRoot".parse::<QueryFunction>().unwrap(),
            QueryFunction::GetTxsByRoot
        );
        // Queries are not invocations and vice versa.
        assert!("getBalance".parse::<InvokeFunction>().is_err());
        assert!("lockBalance".parse::<QueryFunction>().is_err());
    }

    #[test]
    fn init_applies_config() {
        let mut contract = LedgerContract::default();
        assert_eq!(contract.config().arg_encoding, ArgEncoding::Base64);

        contract
            .init(&[
                r#"{"arg_encoding":"plain","engine":{"verify_supply_after_settle":true}}"#
                    .to_string(),
            ])
            .unwrap();
        assert_eq!(contract.config().arg_encoding, ArgEncoding::Plain);
        assert!(contract.engine.config().verify_supply_after_settle);
    }

    #[test]
    fn init_without_args_keeps_defaults() {
        let mut contract = LedgerContract::default();
        assert!(contract.init(&[]).unwrap().is_empty());
        assert_eq!(contract.config(), &LedgerConfig::default());
    }

    #[test]
    fn init_rejects_bad_config() {
        let mut contract = LedgerContract::default();
        assert!(matches!(
            contract.init(&["{oops".to_string()]),
            Err(LedgerError::Configuration(_))
        ));
    }
}
