//! Tagged record codec.
//!
//! Every value written to the world state is wrapped in an envelope naming
//! the record kind and the schema version:
//!
//! ```text
//! {"kind":"asset","v":1,"data":{"uuid":"…","owner":"alice",…}}
//! ```
//!
//! Decoding checks the kind, so an index entry that points at the wrong key
//! surfaces as a codec error instead of a silently misread record. Schema
//! evolution is additive: new fields carry `#[serde(default)]` and unknown
//! fields are ignored on read.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{LedgerError, Result, constants};

/// Which entity a stored record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Asset,
    Currency,
    LockEntry,
    Order,
    TxLog,
    IssuanceLog,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asset => write!(f, "asset"),
            Self::Currency => write!(f, "currency"),
            Self::LockEntry => write!(f, "lock entry"),
            Self::Order => write!(f, "order"),
            Self::TxLog => write!(f, "tx log"),
            Self::IssuanceLog => write!(f, "issuance log"),
        }
    }
}

/// A typed record with a fixed kind tag.
pub trait Record: Serialize + DeserializeOwned {
    const KIND: RecordKind;
}

#[derive(Serialize)]
struct EnvelopeRef<'a, R> {
    kind: RecordKind,
    v: u16,
    data: &'a R,
}

#[derive(Deserialize)]
struct Envelope {
    kind: RecordKind,
    #[serde(default = "default_version")]
    v: u16,
    data: serde_json::Value,
}

fn default_version() -> u16 {
    constants::RECORD_SCHEMA_VERSION
}

/// Encode a record into its tagged envelope.
pub fn encode_record<R: Record>(record: &R) -> Result<Vec<u8>> {
    let envelope = EnvelopeRef {
        kind: R::KIND,
        v: constants::RECORD_SCHEMA_VERSION,
        data: record,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Decode a record, rejecting envelopes of another kind or a newer schema.
pub fn decode_record<R: Record>(bytes: &[u8]) -> Result<R> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;
    if envelope.kind != R::KIND {
        return Err(LedgerError::Codec(format!(
            "expected {} record, found {}",
            R::KIND,
            envelope.kind
        )));
    }
    if envelope.v > constants::RECORD_SCHEMA_VERSION {
        return Err(LedgerError::Codec(format!(
            "{} record schema v{} is newer than supported v{}",
            R::KIND,
            envelope.v,
            constants::RECORD_SCHEMA_VERSION
        )));
    }
    Ok(serde_json::from_value(envelope.data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Asset, Currency, RecordId};

    #[test]
    fn envelope_carries_kind_and_version() {
        let asset = Asset::new("alice", "USD");
        let bytes = encode_record(&asset).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["kind"], "asset");
        assert_eq!(value["v"], 1);
        assert_eq!(value["data"]["owner"], "alice");
    }

    #[test]
    fn wrong_kind_rejected() {
        let asset = Asset::new("alice", "USD");
        let bytes = encode_record(&asset).unwrap();
        let err = decode_record::<Currency>(&bytes).unwrap_err();
        assert!(matches!(err, LedgerError::Codec(ref m) if m.contains("expected currency")));
    }

    #[test]
    fn newer_schema_rejected() {
        let raw = br#"{"kind":"asset","v":99,"data":{"owner":"a","currency":"X"}}"#;
        let err = decode_record::<Asset>(raw).unwrap_err();
        assert!(matches!(err, LedgerError::Codec(_)));
    }

    #[test]
    fn additive_evolution() {
        // Missing version and missing optional fields decode with defaults,
        // unknown fields are ignored.
        let raw = br#"{"kind":"asset","data":{"owner":"a","currency":"X","count":7,"futureField":true}}"#;
        let asset: Asset = decode_record(raw).unwrap();
        assert_eq!(asset.owner, "a");
        assert_eq!(asset.count, 7);
        assert_eq!(asset.lock_count, 0);
        assert_eq!(asset.uuid, RecordId::nil());
    }

    #[test]
    fn garbage_is_codec_error() {
        let err = decode_record::<Asset>(b"\x00\x01").unwrap_err();
        assert!(matches!(err, LedgerError::Codec(_)));
    }
}
