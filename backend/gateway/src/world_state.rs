//! Committed world state and per-transaction simulation.
//!
//! A transaction runs against a [`TxSimulator`], which serves reads from the
//! committed [`WorldState`] snapshot and buffers writes. Every point read and
//! every range scan is recorded with the versions it observed; at commit time
//! [`WorldState::validate`] re-checks those versions, so a transaction whose
//! inputs changed underneath it is rejected instead of applied.
//!
//! Rich (selector) queries are not re-validated. Only read-only contract
//! functions use them.

use std::collections::BTreeMap;

use crowdfunding::ledger::{
    KeyValue, LedgerResult, Selector, StateIterator, TransactionContext,
};

use crate::errors::{GatewayError, Result};

/// Block number of the transaction that last wrote a key.
pub type Version = u64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub version: Version,
}

/// Committed key-value state, ordered by key.
#[derive(Clone, Debug, Default)]
pub struct WorldState {
    entries: BTreeMap<String, VersionedValue>,
}

/// Keys and versions returned by one range scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeRead {
    pub prefix: String,
    pub results: Vec<(String, Version)>,
}

/// Everything a simulated transaction read and wrote.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadWriteSet {
    /// Version observed for each key read; `None` if the key was absent.
    pub reads: BTreeMap<String, Option<Version>>,
    pub range_reads: Vec<RangeRead>,
    pub writes: BTreeMap<String, Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChaincodeEvent {
    pub name: String,
    pub payload: Vec<u8>,
}

/// Output of a finished simulation, ready for validation and commit.
#[derive(Clone, Debug)]
pub struct SimulationResults {
    pub tx_id: String,
    pub rwset: ReadWriteSet,
    pub event: Option<ChaincodeEvent>,
}

impl WorldState {
    pub fn from_rows(rows: impl IntoIterator<Item = (String, Vec<u8>, Version)>) -> Self {
        let entries = rows
            .into_iter()
            .map(|(key, value, version)| (key, VersionedValue { value, version }))
            .collect();
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&VersionedValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose key starts with `prefix`, in key order.
    pub fn scan_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a VersionedValue)> + 'a {
        self.entries
            .range(prefix.to_string()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
    }

    /// Check that nothing a transaction observed has changed since.
    pub fn validate(&self, rwset: &ReadWriteSet) -> Result<()> {
        for (key, observed) in &rwset.reads {
            let current = self.get(key).map(|v| v.version);
            if current != *observed {
                return Err(GatewayError::MvccConflict(key.clone()));
            }
        }
        for range in &rwset.range_reads {
            let current: Vec<(String, Version)> = self
                .scan_prefix(&range.prefix)
                .map(|(k, v)| (k.clone(), v.version))
                .collect();
            if current != range.results {
                return Err(GatewayError::MvccConflict(range.prefix.clone()));
            }
        }
        Ok(())
    }

    /// Apply a validated write set at `version`.
    pub fn apply(&mut self, writes: &BTreeMap<String, Vec<u8>>, version: Version) {
        for (key, value) in writes {
            self.entries.insert(
                key.clone(),
                VersionedValue {
                    value: value.clone(),
                    version,
                },
            );
        }
    }
}

/// [`TransactionContext`] that simulates one transaction against a snapshot.
pub struct TxSimulator<'a> {
    world: &'a WorldState,
    tx_id: String,
    rwset: ReadWriteSet,
    event: Option<ChaincodeEvent>,
}

impl<'a> TxSimulator<'a> {
    pub fn new(world: &'a WorldState, tx_id: impl Into<String>) -> Self {
        Self {
            world,
            tx_id: tx_id.into(),
            rwset: ReadWriteSet::default(),
            event: None,
        }
    }

    pub fn into_results(self) -> SimulationResults {
        SimulationResults {
            tx_id: self.tx_id,
            rwset: self.rwset,
            event: self.event,
        }
    }
}

impl TransactionContext for TxSimulator<'_> {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn get_state(&mut self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        let world = self.world;
        let found = world.get(key);
        self.rwset
            .reads
            .entry(key.to_string())
            .or_insert_with(|| found.map(|v| v.version));
        Ok(found.map(|v| v.value.clone()))
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> LedgerResult<()> {
        self.rwset.writes.insert(key.to_string(), value);
        Ok(())
    }

    fn get_state_by_prefix(&mut self, prefix: &str) -> LedgerResult<StateIterator<'_>> {
        let world = self.world;
        let entries: Vec<KeyValue> = world
            .scan_prefix(prefix)
            .map(|(k, v)| KeyValue {
                key: k.clone(),
                value: v.value.clone(),
            })
            .collect();
        let results = world
            .scan_prefix(prefix)
            .map(|(k, v)| (k.clone(), v.version))
            .collect();
        self.rwset.range_reads.push(RangeRead {
            prefix: prefix.to_string(),
            results,
        });
        Ok(Box::new(entries.into_iter().map(Ok)))
    }

    fn get_query_result(&mut self, selector: &Selector) -> LedgerResult<StateIterator<'_>> {
        let matches: Vec<KeyValue> = self
            .world
            .entries
            .iter()
            .filter(|(k, v)| selector.matches(k, &v.value))
            .map(|(k, v)| KeyValue {
                key: k.clone(),
                value: v.value.clone(),
            })
            .collect();
        Ok(Box::new(matches.into_iter().map(Ok)))
    }

    fn set_event(&mut self, name: &str, payload: Vec<u8>) -> LedgerResult<()> {
        self.event = Some(ChaincodeEvent {
            name: name.to_string(),
            payload,
        });
        Ok(())
    }
}
