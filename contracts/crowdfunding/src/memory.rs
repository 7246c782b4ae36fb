//! In-memory [`TransactionContext`] for tests and embedding.

use std::collections::BTreeMap;
use std::fmt;

use crate::ledger::{KeyValue, LedgerResult, Selector, StateIterator, TransactionContext};

/// An event recorded by [`InMemoryLedger`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    pub tx_id: String,
    pub name: String,
    pub payload: Vec<u8>,
}

/// `BTreeMap`-backed ledger for tests and embedding.
///
/// Writes are visible immediately. Use [`InMemoryLedger::invoke`] to run an
/// operation with all-or-nothing semantics: the state and event log are
/// restored if the operation returns an error.
pub struct InMemoryLedger {
    state: BTreeMap<String, Vec<u8>>,
    events: Vec<RecordedEvent>,
    tx_seq: u64,
    tx_id: String,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            state: BTreeMap::new(),
            events: Vec::new(),
            tx_seq: 0,
            tx_id: tx_name(0),
        }
    }

    /// Run `op` as one transaction. On error every write and event it made is
    /// discarded.
    pub fn invoke<T, E>(&mut self, op: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E> {
        self.tx_seq += 1;
        self.tx_id = tx_name(self.tx_seq);
        let state = self.state.clone();
        let event_count = self.events.len();
        let result = op(self);
        if result.is_err() {
            self.state = state;
            self.events.truncate(event_count);
        }
        result
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Raw value under `key`, without going through the context.
    pub fn raw(&self, key: &str) -> Option<&[u8]> {
        self.state.get(key).map(Vec::as_slice)
    }

    /// Every event set so far, oldest first.
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn last_event(&self) -> Option<&RecordedEvent> {
        self.events.last()
    }
}

fn tx_name(seq: u64) -> String {
    format!("tx-{seq:08}")
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionContext for InMemoryLedger {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn get_state(&mut self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.state.get(key).cloned())
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> LedgerResult<()> {
        self.state.insert(key.to_string(), value);
        Ok(())
    }

    fn get_state_by_prefix(&mut self, prefix: &str) -> LedgerResult<StateIterator<'_>> {
        let prefix = prefix.to_string();
        let iter = self
            .state
            .range(prefix.clone()..)
            .take_while(move |(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| {
                Ok(KeyValue {
                    key: k.clone(),
                    value: v.clone(),
                })
            });
        Ok(Box::new(iter))
    }

    fn get_query_result(&mut self, selector: &Selector) -> LedgerResult<StateIterator<'_>> {
        let selector = selector.clone();
        let iter = self
            .state
            .iter()
            .filter(move |(k, v)| selector.matches(k, v))
            .map(|(k, v)| {
                Ok(KeyValue {
                    key: k.clone(),
                    value: v.clone(),
                })
            });
        Ok(Box::new(iter))
    }

    fn set_event(&mut self, name: &str, payload: Vec<u8>) -> LedgerResult<()> {
        let event = RecordedEvent {
            tx_id: self.tx_id.clone(),
            name: name.to_string(),
            payload,
        };
        match self.events.last_mut() {
            Some(last) if last.tx_id == event.tx_id => *last = event,
            _ => self.events.push(event),
        }
        Ok(())
    }
}

impl fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryLedger")
            .field("entry_count", &self.state.len())
            .field("event_count", &self.events.len())
            .field("tx_id", &self.tx_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(iter: StateIterator<'_>) -> Vec<String> {
        iter.map(|kv| kv.unwrap().key).collect()
    }

    #[test]
    fn put_then_get() {
        let mut ledger = InMemoryLedger::new();
        assert_eq!(ledger.get_state("a").unwrap(), None);
        ledger.put_state("a", b"1".to_vec()).unwrap();
        assert_eq!(ledger.get_state("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn prefix_scan_is_ordered_and_bounded() {
        let mut ledger = InMemoryLedger::new();
        for key in ["b/2", "a/1", "b/1", "c/1", "b"] {
            ledger.put_state(key, b"{}".to_vec()).unwrap();
        }
        let found = keys(ledger.get_state_by_prefix("b/").unwrap());
        assert_eq!(found, vec!["b/1", "b/2"]);
        assert!(keys(ledger.get_state_by_prefix("z").unwrap()).is_empty());
    }

    #[test]
    fn query_filters_by_selector() {
        let mut ledger = InMemoryLedger::new();
        ledger.put_state("1", br#"{"owner":"alice"}"#.to_vec()).unwrap();
        ledger.put_state("2", br#"{"owner":"bob"}"#.to_vec()).unwrap();
        ledger.put_state("3", br#"{"owner":"alice"}"#.to_vec()).unwrap();
        let selector = Selector::new().field_eq("owner", "alice");
        assert_eq!(keys(ledger.get_query_result(&selector).unwrap()), vec!["1", "3"]);
    }

    #[test]
    fn invoke_rolls_back_on_error() {
        let mut ledger = InMemoryLedger::new();
        let result: Result<(), &str> = ledger.invoke(|ctx| {
            ctx.put_state("k", b"v".to_vec()).unwrap();
            ctx.set_event("E", vec![]).unwrap();
            Err("boom")
        });
        assert!(result.is_err());
        assert!(ledger.is_empty());
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn one_event_per_transaction() {
        let mut ledger = InMemoryLedger::new();
        ledger
            .invoke(|ctx| -> LedgerResult<()> {
                ctx.set_event("First", vec![1])?;
                ctx.set_event("Second", vec![2])
            })
            .unwrap();
        ledger
            .invoke(|ctx| ctx.set_event("Third", vec![3]))
            .unwrap();
        let names: Vec<_> = ledger.events().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Second", "Third"]);
        assert_ne!(ledger.events()[0].tx_id, ledger.events()[1].tx_id);
    }
}
