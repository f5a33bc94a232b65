//! # fxledger-settlement
//!
//! Balance locking and order settlement for the exchange ledger.
//!
//! ## Architecture
//!
//! Every component is a set of operations over a [`WorldState`] handed in
//! by the caller; nothing is cached between calls.
//!
//! - [`AssetStore`]: per-(owner, currency) available and locked balances
//! - [`CurrencyRegistry`]: issued currencies, releases and assignments
//! - [`LockLedger`]: one entry per (owner, currency, order, direction),
//!   the idempotency guard for lock actions
//! - [`TransactionLog`]: settled fills, by root order and by fill id
//! - [`SettlementEngine`]: lock/unlock, partial-fill reconciliation and
//!   fill-pair settlement
//! - [`SupplyConservation`]: `Σ(available + locked) == issued − undistributed`
//!
//! ## Atomicity
//!
//! Run mutating flows on a [`StateTx`](fxledger_store::StateTx)
//! (`settle_atomic`, `lock_atomic`) and a failure at any step leaves the
//! backend untouched.
//!
//! [`WorldState`]: fxledger_store::WorldState

pub mod asset_store;
pub mod currency_registry;
pub mod engine;
pub mod lock_ledger;
mod records;
pub mod supply;
pub mod transaction_log;

pub use asset_store::AssetStore;
pub use currency_registry::CurrencyRegistry;
pub use engine::{SettlementEngine, SettlementReceipt};
pub use lock_ledger::LockLedger;
pub use records::RecordIter;
pub use supply::{SupplyConservation, SupplyReport};
pub use transaction_log::TransactionLog;
