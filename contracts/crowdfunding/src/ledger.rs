//! # Ledger access
//!
//! The contract never talks to a concrete store. Every operation receives a
//! [`TransactionContext`]: the per-invocation capability handed out by the
//! host ledger. It exposes exactly what the contract needs:
//!
//! | Capability            | Used by                                   |
//! |-----------------------|-------------------------------------------|
//! | `get_state`           | every operation that loads a record       |
//! | `put_state`           | every state-changing operation            |
//! | `get_state_by_prefix` | `distribute_rewards` (contribution scan)  |
//! | `get_query_result`    | the two contribution queries              |
//! | `set_event`           | every state-changing operation            |
//!
//! ## Snapshot semantics
//!
//! Hosts may serve reads from the committed snapshot the invocation started
//! from, so a `get_state` issued after a `put_state` on the same key is not
//! guaranteed to observe the write. Contract operations never read a key
//! they have already written in the same invocation.
//!
//! ## Iterators
//!
//! Range and query results are returned as boxed iterators. Dropping the
//! iterator releases it, so early returns through `?` cannot leak one.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{json, Value};

/// Errors raised by a ledger backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to read state for key {key:?}: {reason}")]
    Read { key: String, reason: String },

    #[error("failed to write state for key {key:?}: {reason}")]
    Write { key: String, reason: String },

    #[error("range scan over {prefix:?} failed: {reason}")]
    Range { prefix: String, reason: String },

    #[error("query {selector} failed: {reason}")]
    Query { selector: String, reason: String },

    #[error("failed to set event {name:?}: {reason}")]
    Event { name: String, reason: String },
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// One entry yielded by a range scan or a query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

/// Iterator handed back by range scans and queries.
pub type StateIterator<'a> = Box<dyn Iterator<Item = LedgerResult<KeyValue>> + 'a>;

/// Field-equality predicate evaluated by the ledger's query engine.
///
/// A selector matches a record when the record's value is a JSON object whose
/// top-level fields equal every field in the selector, and, when a namespace
/// is set, the record's key starts with it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selector {
    namespace: Option<String>,
    fields: BTreeMap<String, Value>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict matches to keys starting with `prefix`.
    pub fn within(mut self, prefix: impl Into<String>) -> Self {
        self.namespace = Some(prefix.into());
        self
    }

    /// Require `field` to equal `value`.
    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Evaluate the selector against one stored record.
    ///
    /// Values that are not JSON objects never match.
    pub fn matches(&self, key: &str, value: &[u8]) -> bool {
        if let Some(prefix) = &self.namespace {
            if !key.starts_with(prefix.as_str()) {
                return false;
            }
        }
        let Ok(Value::Object(doc)) = serde_json::from_slice::<Value>(value) else {
            return false;
        };
        self.fields
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }
}

impl fmt::Display for Selector {
    /// Renders the selector in the document-store query syntax used by
    /// ledger state databases, e.g. `{"selector":{"contributorId":"alice"}}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut selector: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(prefix) = &self.namespace {
            selector.insert("_id".to_string(), json!({ "$gte": prefix }));
        }
        write!(f, "{}", json!({ "selector": selector }))
    }
}

/// Per-invocation capability granted by the host ledger.
pub trait TransactionContext {
    /// Identifier of the transaction this invocation runs in.
    fn tx_id(&self) -> &str;

    /// Read the value stored under `key`. Returns `Ok(None)` if absent.
    fn get_state(&mut self, key: &str) -> LedgerResult<Option<Vec<u8>>>;

    /// Write `value` under `key`, replacing any previous value.
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> LedgerResult<()>;

    /// Iterate every entry whose key starts with `prefix`, in key order.
    fn get_state_by_prefix(&mut self, prefix: &str) -> LedgerResult<StateIterator<'_>>;

    /// Iterate every entry matching `selector`, in engine-defined order.
    fn get_query_result(&mut self, selector: &Selector) -> LedgerResult<StateIterator<'_>>;

    /// Attach an event to the transaction. A later call replaces an earlier one.
    fn set_event(&mut self, name: &str, payload: Vec<u8>) -> LedgerResult<()>;
}
