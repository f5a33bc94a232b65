//! # fxledger-types
//!
//! Shared types, errors, and configuration for the **fxledger** settlement
//! engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`RecordId`], plus the [`OwnerId`], [`CurrencyId`] and [`OrderRef`] aliases
//! - **Balance model**: [`Asset`], [`Amount`]
//! - **Currency model**: [`Currency`], [`IssuanceLog`], [`IssuanceKind`]
//! - **Lock model**: [`LockEntry`], [`LockDirection`]
//! - **Order model**: [`Order`], [`Side`]
//! - **Transaction log model**: [`TxLogEntry`]
//! - **Record codec**: [`Record`], [`RecordKind`], [`encode_record`], [`decode_record`]
//! - **Configuration**: [`LedgerConfig`], [`EngineConfig`], [`ArgEncoding`], [`LogFormat`]
//! - **Errors**: [`LedgerError`] with `FX_ERR_` prefix codes, [`StoreError`], [`ErrorClass`]
//! - **Constants**: index names and codec version

pub mod asset;
pub mod codec;
pub mod config;
pub mod constants;
pub mod currency;
pub mod error;
pub mod ids;
pub mod lock;
pub mod order;
pub mod tx_log;

// Re-export all primary types at crate root for ergonomic imports:
//   use fxledger_types::{Asset, Order, LockEntry, LedgerError, ...};

pub use asset::*;
pub use codec::*;
pub use config::*;
pub use currency::*;
pub use error::*;
pub use ids::*;
pub use lock::*;
pub use order::*;
pub use tx_log::*;

// Constants are accessed via `fxledger_types::constants::FOO`
// (not re-exported to avoid name collisions).
