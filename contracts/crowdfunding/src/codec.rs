//! JSON encoding of ledger records.
//!
//! Records are stored as compact JSON objects using the camelCase field names
//! declared on the types in [`crate::types`]. Decoding is lenient about
//! unknown fields so older writers and newer readers can share a ledger.

use serde::{de::DeserializeOwned, Serialize};

use crate::Error;

/// Serialize a record into the ledger's value format.
pub fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, Error> {
    Ok(serde_json::to_vec(record)?)
}

/// Deserialize a record previously written with [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    Ok(serde_json::from_slice(bytes)?)
}
