//! Composite keys for secondary indexes.
//!
//! A composite key is the index name followed by each attribute, every
//! segment introduced by a NUL byte and the key closed by one:
//!
//! ```text
//! \0owner~currency~uuid\0alice\0USD\0018f…\0
//! ```
//!
//! Because every attribute is NUL-terminated, the key built from a leading
//! subset of the attributes is a prefix of exactly the keys that share those
//! attributes, which is what partial-key range scans rely on.

use fxledger_types::StoreError;

use crate::StoreResult;

const SEPARATOR: char = '\u{0}';

fn validate(segment: &str, what: &str) -> StoreResult<()> {
    if segment.contains(SEPARATOR) {
        return Err(StoreError::InvalidCompositeKey {
            reason: format!("{what} {segment:?} contains a NUL byte"),
        });
    }
    Ok(())
}

/// Build a composite key (or, with fewer parts, a partial key for scans).
pub fn create_composite_key(index: &str, parts: &[&str]) -> StoreResult<String> {
    if index.is_empty() {
        return Err(StoreError::InvalidCompositeKey {
            reason: "empty index name".to_string(),
        });
    }
    validate(index, "index name")?;

    let mut key = String::with_capacity(
        2 + index.len() + parts.iter().map(|p| p.len() + 1).sum::<usize>(),
    );
    key.push(SEPARATOR);
    key.push_str(index);
    key.push(SEPARATOR);
    for part in parts {
        validate(part, "attribute")?;
        key.push_str(part);
        key.push(SEPARATOR);
    }
    Ok(key)
}

/// Split a composite key into its index name and attributes.
pub fn split_composite_key(key: &str) -> StoreResult<(String, Vec<String>)> {
    let body = key
        .strip_prefix(SEPARATOR)
        .and_then(|rest| rest.strip_suffix(SEPARATOR))
        .ok_or_else(|| StoreError::InvalidCompositeKey {
            reason: format!("{key:?} is not a composite key"),
        })?;

    let mut segments = body.split(SEPARATOR);
    let index = segments
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StoreError::InvalidCompositeKey {
            reason: format!("{key:?} has no index name"),
        })?
        .to_string();
    Ok((index, segments.map(str::to_string).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_split() {
        let key = create_composite_key("owner~currency~uuid", &["alice", "USD", "u1"]).unwrap();
        assert_eq!(key, "\u{0}owner~currency~uuid\u{0}alice\u{0}USD\u{0}u1\u{0}");
        let (index, parts) = split_composite_key(&key).unwrap();
        assert_eq!(index, "owner~currency~uuid");
        assert_eq!(parts, vec!["alice", "USD", "u1"]);
    }

    #[test]
    fn partial_key_is_prefix_of_full_key() {
        let full = create_composite_key("idx", &["alice", "USD", "u1"]).unwrap();
        let partial = create_composite_key("idx", &["alice"]).unwrap();
        assert!(full.starts_with(&partial));

        // "ali" must not match "alice": the attribute is NUL-terminated.
        let other = create_composite_key("idx", &["ali"]).unwrap();
        assert!(!full.starts_with(&other));
    }

    #[test]
    fn empty_attributes_survive_split() {
        let key = create_composite_key("idx", &["", "x"]).unwrap();
        let (_, parts) = split_composite_key(&key).unwrap();
        assert_eq!(parts, vec!["", "x"]);
    }

    #[test]
    fn index_only_key() {
        let key = create_composite_key("idx", &[]).unwrap();
        let (index, parts) = split_composite_key(&key).unwrap();
        assert_eq!(index, "idx");
        assert!(parts.is_empty());
    }

    #[test]
    fn rejects_nul_in_attribute() {
        let err = create_composite_key("idx", &["a\u{0}b"]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidCompositeKey { .. }));
    }

    #[test]
    fn rejects_empty_index() {
        assert!(create_composite_key("", &["a"]).is_err());
    }

    #[test]
    fn rejects_plain_key() {
        assert!(split_composite_key("plain-key").is_err());
        assert!(split_composite_key("\u{0}\u{0}").is_err());
    }
}
