//! # fxledger-dispatch
//!
//! The ledger's outer surface: a [`LedgerContract`] exposing `init`,
//! `invoke` and `query` over any [`WorldState`](fxledger_store::WorldState),
//! argument decoding, and logging setup.
//!
//! ## Data flow
//!
//! ```text
//! function + args ──decode──▶ route ──▶ StateTx ──▶ settlement ops ──▶ commit
//!                                                      │
//!                                         JSON response bytes
//! ```

pub mod args;
pub mod contract;
pub mod logging;

pub use args::{Args, decode_invocation};
pub use contract::{InvokeFunction, LedgerContract, QueryFunction};
pub use logging::init_logging;
