//! Typed record access on top of the raw world state.

use fxledger_store::{WorldState, create_composite_key, split_composite_key};
use fxledger_types::{LedgerError, Record, Result, decode_record, encode_record};

/// Lazy, finite sequence of decoded records. Asking the owning component
/// again starts a fresh scan.
pub type RecordIter<'s, R> = Box<dyn Iterator<Item = Result<R>> + 's>;

/// Read and decode the record under `key`.
pub(crate) fn load<R: Record, S: WorldState + ?Sized>(state: &S, key: &str) -> Result<Option<R>> {
    match state.get_state(key)? {
        Some(bytes) => Ok(Some(decode_record::<R>(&bytes)?)),
        None => Ok(None),
    }
}

/// Encode and write `record` under `key`.
pub(crate) fn save<R: Record, S: WorldState + ?Sized>(
    state: &mut S,
    key: &str,
    record: &R,
) -> Result<()> {
    state.put_state(key, encode_record(record)?)?;
    Ok(())
}

/// Records stored directly under the composite keys of `index` that start
/// with `parts`.
pub(crate) fn scan_records<'s, R, S>(
    state: &'s S,
    index: &str,
    parts: &[&str],
) -> Result<RecordIter<'s, R>>
where
    R: Record + 's,
    S: WorldState + ?Sized,
{
    let rows = state.scan_partial_composite(index, parts)?;
    Ok(Box::new(rows.map(|row| -> Result<R> {
        let (_, bytes) = row?;
        decode_record::<R>(&bytes)
    })))
}

/// Records reached through a pure index: the last attribute of every
/// matching index key is the primary key of the record.
pub(crate) fn scan_indexed<'s, R, S>(
    state: &'s S,
    index: &str,
    parts: &[&str],
) -> Result<RecordIter<'s, R>>
where
    R: Record + 's,
    S: WorldState + ?Sized,
{
    let rows = state.scan_partial_composite(index, parts)?;
    Ok(Box::new(rows.map(move |row| -> Result<R> {
        let (key, _) = row?;
        let primary = primary_key_of(&key)?;
        load::<R, S>(state, &primary)?.ok_or_else(|| LedgerError::not_found(R::KIND, primary))
    })))
}

/// The last attribute of an index key.
pub(crate) fn primary_key_of(index_key: &str) -> Result<String> {
    let (index, mut parts) = split_composite_key(index_key)?;
    parts
        .pop()
        .ok_or_else(|| LedgerError::Codec(format!("index key of {index} carries no primary key")))
}

/// Point the unique key `index`/`parts` at the record stored under
/// `primary`.
pub(crate) fn point<S: WorldState + ?Sized>(
    state: &mut S,
    index: &str,
    parts: &[&str],
    primary: &str,
) -> Result<()> {
    let key = create_composite_key(index, parts)?;
    state.put_state(&key, primary.as_bytes().to_vec())?;
    Ok(())
}

/// The record a unique key points at, if the key exists.
///
/// The lookup reads one exact key, so two transactions creating the same
/// unique key observe and write the same entry.
pub(crate) fn load_pointed<R, S>(state: &S, index: &str, parts: &[&str]) -> Result<Option<R>>
where
    R: Record,
    S: WorldState + ?Sized,
{
    let key = create_composite_key(index, parts)?;
    match state.get_state(&key)? {
        Some(bytes) => {
            let primary = primary_of_pointer(&bytes)?;
            load::<R, S>(state, &primary)?
                .map(Some)
                .ok_or_else(|| LedgerError::not_found(R::KIND, primary))
        }
        None => Ok(None),
    }
}

/// Records reached through unique keys of `index` starting with `parts`.
pub(crate) fn scan_pointed<'s, R, S>(
    state: &'s S,
    index: &str,
    parts: &[&str],
) -> Result<RecordIter<'s, R>>
where
    R: Record + 's,
    S: WorldState + ?Sized,
{
    let rows = state.scan_partial_composite(index, parts)?;
    Ok(Box::new(rows.map(move |row| -> Result<R> {
        let (_, bytes) = row?;
        let primary = primary_of_pointer(&bytes)?;
        load::<R, S>(state, &primary)?.ok_or_else(|| LedgerError::not_found(R::KIND, primary))
    })))
}

fn primary_of_pointer(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| LedgerError::Codec(format!("unique key does not hold a primary key: {e}")))
}
