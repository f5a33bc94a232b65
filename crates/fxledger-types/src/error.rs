//! Error types for the fxledger settlement engine.
//!
//! All errors use the `FX_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by how the caller must react:
//! - 1xx: Check errors (precondition violated, surfaced to the caller)
//! - 2xx: Replay errors (the intended effect already happened)
//! - 3xx: World-state errors (store failure, retry the whole call)
//! - 4xx: Fatal inconsistencies (external reconciliation required)
//! - 5xx: Settlement step wrapper
//! - 9xx: Configuration

use thiserror::Error;

use crate::{Amount, LockDirection, RecordKind, Side};

/// How a caller must react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Precondition violation visible to the caller. Not retried.
    Check,
    /// Idempotency guard tripped: treat as success-by-replay.
    Replay,
    /// Underlying store failure. Retry the whole operation from scratch.
    WorldState,
    /// A balance write landed without its paired ledger/log write.
    FatalInconsistency,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Check => write!(f, "CHECK"),
            Self::Replay => write!(f, "REPLAY"),
            Self::WorldState => write!(f, "WORLD_STATE"),
            Self::FatalInconsistency => write!(f, "FATAL_INCONSISTENCY"),
        }
    }
}

/// The sub-step of a settlement that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettleStep {
    /// Fill UUIDs checked against the transaction log.
    Idempotency,
    /// Source positions validated before any write.
    Preflight,
    /// Excess lock of a take-all root order released.
    ReleaseExcess(Side),
    /// Fill cost extinguished from the locked source balance.
    SpendLocked(Side),
    /// Destination currency credited.
    CreditDestination(Side),
    /// Both fills appended to the transaction log.
    AppendLog,
    /// Post-settlement supply conservation check.
    SupplyCheck,
}

impl SettleStep {
    /// Whether any balance may have been written before this step ran.
    ///
    /// Only meaningful on a non-atomic state; on an atomic state nothing is
    /// committed when the settlement fails.
    #[must_use]
    pub fn after_first_write(&self) -> bool {
        !matches!(
            self,
            Self::Idempotency | Self::Preflight | Self::ReleaseExcess(Side::Buy)
        )
    }
}

impl std::fmt::Display for SettleStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idempotency => write!(f, "IDEMPOTENCY"),
            Self::Preflight => write!(f, "PREFLIGHT"),
            Self::ReleaseExcess(side) => write!(f, "RELEASE_EXCESS({side})"),
            Self::SpendLocked(side) => write!(f, "SPEND_LOCKED({side})"),
            Self::CreditDestination(side) => write!(f, "CREDIT_DESTINATION({side})"),
            Self::AppendLog => write!(f, "APPEND_LOG"),
            Self::SupplyCheck => write!(f, "SUPPLY_CHECK"),
        }
    }
}

/// Errors raised by a world-state backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A composite key could not be built or split.
    #[error("invalid composite key: {reason}")]
    InvalidCompositeKey { reason: String },

    /// A concurrent transaction wrote the same key.
    #[error("write conflict on key {key:?}")]
    Conflict { key: String },

    /// The backend itself failed (I/O, connection, injected fault).
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Central error enum for all fxledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // =================================================================
    // Check Errors (1xx)
    // =================================================================
    /// A required record is absent.
    #[error("FX_ERR_100: {kind} not found: {key}")]
    NotFound { kind: RecordKind, key: String },

    /// Not enough available balance to lock or assign.
    #[error(
        "FX_ERR_101: Insufficient funds for {owner}/{currency}: need {needed}, have {available}"
    )]
    InsufficientFunds {
        owner: String,
        currency: String,
        needed: Amount,
        available: Amount,
    },

    /// Not enough locked balance to unlock or spend.
    #[error(
        "FX_ERR_102: Insufficient locked funds for {owner}/{currency}: need {needed}, locked {locked}"
    )]
    InsufficientLockedFunds {
        owner: String,
        currency: String,
        needed: Amount,
        locked: Amount,
    },

    /// Amount must be strictly positive.
    #[error("FX_ERR_103: Invalid amount: {amount}")]
    InvalidAmount { amount: Amount },

    /// The invocation arguments are malformed.
    #[error("FX_ERR_104: Invalid arguments: {reason}")]
    InvalidArguments { reason: String },

    /// The requested function is not routed by this ledger.
    #[error("FX_ERR_105: Unknown function: {function}")]
    UnknownFunction { function: String },

    /// A currency with this public id already exists.
    #[error("FX_ERR_106: Currency already exists: {0}")]
    DuplicateCurrency(String),

    /// Only the creator may release or assign a currency.
    #[error("FX_ERR_107: {caller} is not the creator of currency {currency}")]
    NotCurrencyCreator { currency: String, caller: String },

    /// One fill of the pair was already settled, the other was not.
    #[error("FX_ERR_108: Fill {settled} already settled but {pending} is not")]
    PartiallySettledPair { settled: String, pending: String },

    // =================================================================
    // Replay Errors (2xx)
    // =================================================================
    /// A lock/unlock for this exact tuple was already applied.
    #[error("FX_ERR_200: Already executed: {direction} {owner}/{currency} for order {order_id}")]
    AlreadyExecuted {
        owner: String,
        currency: String,
        order_id: String,
        direction: LockDirection,
    },

    /// Both fills of the pair are already in the transaction log.
    #[error("FX_ERR_201: Fill pair already settled: {buy_fill} / {sell_fill}")]
    FillAlreadySettled { buy_fill: String, sell_fill: String },

    // =================================================================
    // World-State Errors (3xx)
    // =================================================================
    /// The world-state store failed.
    #[error("FX_ERR_300: World state error: {0}")]
    WorldState(#[from] StoreError),

    /// A stored record could not be encoded or decoded.
    #[error("FX_ERR_301: Codec error: {0}")]
    Codec(String),

    // =================================================================
    // Fatal Inconsistencies (4xx)
    // =================================================================
    /// A balance write succeeded but its paired ledger write failed.
    #[error("FX_ERR_400: Fatal inconsistency: {reason}")]
    FatalInconsistency { reason: String },

    /// Σ(available + locked) no longer matches the distributed supply.
    #[error("FX_ERR_401: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // Settlement (5xx)
    // =================================================================
    /// A settlement sub-step failed.
    #[error("FX_ERR_500: Settlement failed at {step}: {source}")]
    SettlementStep {
        step: SettleStep,
        #[source]
        source: Box<LedgerError>,
    },

    // =================================================================
    // General (9xx)
    // =================================================================
    /// Configuration could not be parsed or applied.
    #[error("FX_ERR_900: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LedgerError>;

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

impl LedgerError {
    /// Create a `NotFound` error.
    pub fn not_found(kind: RecordKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Wrap an error with the settlement step it came from.
    #[must_use]
    pub fn at_step(self, step: SettleStep) -> Self {
        Self::SettlementStep {
            step,
            source: Box::new(self),
        }
    }

    /// How the caller must react to this error.
    ///
    /// A replay inside a settlement step is a precondition failure of the
    /// settlement, not a replay of it.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. }
            | Self::InsufficientFunds { .. }
            | Self::InsufficientLockedFunds { .. }
            | Self::InvalidAmount { .. }
            | Self::InvalidArguments { .. }
            | Self::UnknownFunction { .. }
            | Self::DuplicateCurrency(_)
            | Self::NotCurrencyCreator { .. }
            | Self::PartiallySettledPair { .. }
            | Self::Configuration(_) => ErrorClass::Check,
            Self::AlreadyExecuted { .. } | Self::FillAlreadySettled { .. } => ErrorClass::Replay,
            Self::WorldState(_) | Self::Codec(_) => ErrorClass::WorldState,
            Self::FatalInconsistency { .. } | Self::SupplyInvariantViolation { .. } => {
                ErrorClass::FatalInconsistency
            }
            Self::SettlementStep { source, .. } => match source.class() {
                ErrorClass::Replay => ErrorClass::Check,
                other => other,
            },
        }
    }

    /// Whether the caller's intended effect already happened.
    #[must_use]
    pub fn is_replay(&self) -> bool {
        self.class() == ErrorClass::Replay
    }

    /// The settlement step that failed, if this error came from one.
    #[must_use]
    pub fn failed_step(&self) -> Option<SettleStep> {
        match self {
            Self::SettlementStep { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// The innermost error, with settlement step wrappers removed.
    #[must_use]
    pub fn root_cause(&self) -> &LedgerError {
        match self {
            Self::SettlementStep { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = LedgerError::not_found(RecordKind::Asset, "alice/USD");
        let msg = format!("{err}");
        assert!(msg.starts_with("FX_ERR_100"), "Got: {msg}");
        assert!(msg.contains("alice/USD"));
    }

    #[test]
    fn insufficient_funds_display() {
        let err = LedgerError::InsufficientFunds {
            owner: "alice".into(),
            currency: "USD".into(),
            needed: 100,
            available: 50,
        };
        let msg = format!("{err}");
        assert!(msg.contains("FX_ERR_101"));
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn classes() {
        assert_eq!(
            LedgerError::InvalidAmount { amount: 0 }.class(),
            ErrorClass::Check
        );
        assert_eq!(
            LedgerError::WorldState(StoreError::Backend("down".into())).class(),
            ErrorClass::WorldState
        );
        assert_eq!(
            LedgerError::FatalInconsistency {
                reason: "x".into()
            }
            .class(),
            ErrorClass::FatalInconsistency
        );
        let replay = LedgerError::AlreadyExecuted {
            owner: "a".into(),
            currency: "X".into(),
            order_id: "o1".into(),
            direction: LockDirection::Lock,
        };
        assert!(replay.is_replay());
    }

    #[test]
    fn replay_inside_step_is_a_check_failure() {
        let err = LedgerError::AlreadyExecuted {
            owner: "a".into(),
            currency: "X".into(),
            order_id: "o1".into(),
            direction: LockDirection::Unlock,
        }
        .at_step(SettleStep::ReleaseExcess(Side::Sell));

        assert_eq!(err.class(), ErrorClass::Check);
        assert!(!err.is_replay());
        assert_eq!(err.failed_step(), Some(SettleStep::ReleaseExcess(Side::Sell)));
        assert!(matches!(
            err.root_cause(),
            LedgerError::AlreadyExecuted { .. }
        ));
        assert!(format!("{err}").contains("RELEASE_EXCESS(SELL)"));
    }

    #[test]
    fn store_error_converts() {
        let err: LedgerError = StoreError::Conflict { key: "k".into() }.into();
        assert!(matches!(err, LedgerError::WorldState(_)));
        assert_eq!(err.class(), ErrorClass::WorldState);
    }

    #[test]
    fn steps_after_first_write() {
        assert!(!SettleStep::Preflight.after_first_write());
        assert!(!SettleStep::ReleaseExcess(Side::Buy).after_first_write());
        assert!(SettleStep::SpendLocked(Side::Buy).after_first_write());
        assert!(SettleStep::AppendLog.after_first_write());
    }

    #[test]
    fn all_errors_have_fx_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(LedgerError::DuplicateCurrency("X".into())),
            Box::new(LedgerError::UnknownFunction {
                function: "nope".into(),
            }),
            Box::new(LedgerError::Codec("bad".into())),
            Box::new(LedgerError::Configuration("bad".into())),
            Box::new(LedgerError::FillAlreadySettled {
                buy_fill: "b".into(),
                sell_fill: "s".into(),
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("FX_ERR_"),
                "Error missing FX_ERR_ prefix: {msg}"
            );
        }
    }
}
