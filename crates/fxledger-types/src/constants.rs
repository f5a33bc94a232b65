//! System-wide constants for the fxledger settlement engine.

/// Schema version written into every record envelope.
pub const RECORD_SCHEMA_VERSION: u16 = 1;

/// Unique key: (owner, currency) → asset uuid, stored as the value.
pub const ASSET_BY_OWNER_INDEX: &str = "owner~currency";

/// Secondary index: currency → owner → asset uuid.
pub const ASSET_BY_CURRENCY_INDEX: &str = "currency~owner~uuid";

/// Unique key: public currency id → currency uuid, stored as the value.
pub const CURRENCY_BY_ID_INDEX: &str = "id";

/// Secondary index: creator → currency uuid.
pub const CURRENCY_BY_CREATOR_INDEX: &str = "creator~uuid";

/// Lock ledger: owner → currency → order → direction.
pub const LOCK_LEDGER_INDEX: &str = "lock~owner~currency~order~direction";

/// Transaction log by account, currency pair and root order.
pub const TX_LOG_BY_ROOT_INDEX: &str = "txlog~account~src~des~root~uuid";

/// Transaction log by fill id.
pub const TX_LOG_BY_FILL_INDEX: &str = "txfill~uuid";

/// Issuance log by currency.
pub const ISSUANCE_LOG_INDEX: &str = "issuance~currency~uuid";

/// Value stored under pure index keys (the key itself carries the data).
pub const INDEX_MARKER: &[u8] = &[0x00];

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "fxledger";
