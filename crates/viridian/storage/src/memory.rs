//! In-memory ledger for development and testing

use crate::model::{CommitReceipt, KeyModification, KeyValue, Selector};
use crate::traits::{KeyValueLedger, LedgerHistory, LedgerTransaction, SelectorQueryEngine};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    /// Sequence of the commit that wrote this value.
    version: u64,
}

/// One applied commit in the hash-linked log.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub tx_id: String,
    pub sequence: u64,
    pub committed_at: DateTime<Utc>,
    pub written_keys: Vec<String>,
    pub previous_hash: String,
    pub hash: String,
}

#[derive(Debug, Default)]
struct LedgerState {
    entries: HashMap<String, Entry>,
    commits: Vec<CommitRecord>,
    history: HashMap<String, Vec<KeyModification>>,
}

impl LedgerState {
    fn height(&self) -> u64 {
        self.commits.last().map(|c| c.sequence).unwrap_or(0)
    }

    fn head_hash(&self) -> String {
        self.commits
            .last()
            .map(|c| c.hash.clone())
            .unwrap_or_default()
    }

    fn version_of(&self, key: &str) -> u64 {
        self.entries.get(key).map(|e| e.version).unwrap_or(0)
    }
}

/// Ledger, query engine and history store over one shared in-process state.
///
/// Commits are serialised by a write lock and validated against the read-set
/// of the committing transaction.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applied commits, oldest first.
    pub async fn commits(&self) -> Vec<CommitRecord> {
        self.state.read().await.commits.clone()
    }

    /// Recompute every commit hash and check the links.
    pub async fn verify_chain(&self) -> StorageResult<()> {
        let state = self.state.read().await;
        let mut previous = String::new();
        for record in &state.commits {
            if record.previous_hash != previous {
                return Err(StorageError::InvariantViolation(format!(
                    "commit {} does not link to its predecessor",
                    record.sequence
                )));
            }
            let writes: Vec<(&str, &[u8])> = record
                .written_keys
                .iter()
                .map(|key| {
                    let value = state
                        .history
                        .get(key)
                        .and_then(|mods| mods.iter().find(|m| m.sequence == record.sequence))
                        .map(|m| m.value.as_slice())
                        .unwrap_or_default();
                    (key.as_str(), value)
                })
                .collect();
            let expected = commit_hash(&previous, &record.tx_id, record.sequence, &writes);
            if expected != record.hash {
                return Err(StorageError::InvariantViolation(format!(
                    "commit {} hash mismatch",
                    record.sequence
                )));
            }
            previous = record.hash.clone();
        }
        Ok(())
    }

    /// Current committed value of a key, outside any transaction.
    pub async fn committed(&self, key: &str) -> Option<Vec<u8>> {
        self.state
            .read()
            .await
            .entries
            .get(key)
            .map(|e| e.value.clone())
    }
}

fn commit_hash(previous: &str, tx_id: &str, sequence: u64, writes: &[(&str, &[u8])]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(previous.as_bytes());
    hasher.update(tx_id.as_bytes());
    hasher.update(&sequence.to_le_bytes());
    for (key, value) in writes {
        hasher.update(&(key.len() as u64).to_le_bytes());
        hasher.update(key.as_bytes());
        hasher.update(&(value.len() as u64).to_le_bytes());
        hasher.update(value);
    }
    hasher.finalize().to_hex().to_string()
}

#[async_trait]
impl KeyValueLedger for InMemoryLedger {
    async fn begin(&self) -> StorageResult<Box<dyn LedgerTransaction>> {
        Ok(Box::new(InMemoryTransaction {
            tx_id: Uuid::new_v4().to_string(),
            state: Arc::clone(&self.state),
            reads: HashMap::new(),
            writes: BTreeMap::new(),
            finished: false,
        }))
    }
}

/// Transaction over an [`InMemoryLedger`].
pub struct InMemoryTransaction {
    tx_id: String,
    state: Arc<RwLock<LedgerState>>,
    /// Key -> version first observed (0 = absent).
    reads: HashMap<String, u64>,
    writes: BTreeMap<String, Vec<u8>>,
    finished: bool,
}

impl InMemoryTransaction {
    fn ensure_open(&self) -> StorageResult<()> {
        if self.finished {
            return Err(StorageError::InvalidInput(format!(
                "transaction {} already committed",
                self.tx_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    async fn get(&mut self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        if let Some(value) = self.writes.get(key) {
            return Ok(Some(value.clone()));
        }
        let state = self.state.read().await;
        let entry = state.entries.get(key);
        let observed = entry.map(|e| e.version).unwrap_or(0);
        self.reads.entry(key.to_string()).or_insert(observed);
        Ok(entry.map(|e| e.value.clone()))
    }

    async fn put(&mut self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.ensure_open()?;
        if key.is_empty() {
            return Err(StorageError::InvalidInput("empty key".to_string()));
        }
        self.writes.insert(key.to_string(), value);
        Ok(())
    }

    async fn commit(&mut self) -> StorageResult<CommitReceipt> {
        self.ensure_open()?;
        self.finished = true;

        let mut state = self.state.write().await;
        for (key, observed) in &self.reads {
            let current = state.version_of(key);
            if current != *observed {
                warn!(tx = %self.tx_id, key = %key, observed, current, "stale read, aborting");
                return Err(StorageError::Conflict(format!(
                    "key {key} changed since it was read"
                )));
            }
        }

        let committed_at = Utc::now();
        if self.writes.is_empty() {
            return Ok(CommitReceipt {
                tx_id: self.tx_id.clone(),
                sequence: state.height(),
                committed_at,
                written_keys: Vec::new(),
                hash: String::new(),
            });
        }

        let sequence = state.height() + 1;
        let previous_hash = state.head_hash();
        let writes = std::mem::take(&mut self.writes);
        let pairs: Vec<(&str, &[u8])> = writes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
            .collect();
        let hash = commit_hash(&previous_hash, &self.tx_id, sequence, &pairs);
        let written_keys: Vec<String> = writes.keys().cloned().collect();

        for (key, value) in writes {
            state
                .history
                .entry(key.clone())
                .or_default()
                .push(KeyModification {
                    tx_id: self.tx_id.clone(),
                    sequence,
                    timestamp: committed_at,
                    value: value.clone(),
                });
            state.entries.insert(
                key,
                Entry {
                    value,
                    version: sequence,
                },
            );
        }
        state.commits.push(CommitRecord {
            tx_id: self.tx_id.clone(),
            sequence,
            committed_at,
            written_keys: written_keys.clone(),
            previous_hash,
            hash: hash.clone(),
        });
        debug!(tx = %self.tx_id, sequence, keys = written_keys.len(), "committed");

        Ok(CommitReceipt {
            tx_id: self.tx_id.clone(),
            sequence,
            committed_at,
            written_keys,
            hash,
        })
    }
}

#[async_trait]
impl SelectorQueryEngine for InMemoryLedger {
    async fn query(&self, selector: &Selector) -> StorageResult<Vec<KeyValue>> {
        let state = self.state.read().await;
        let mut hits: Vec<KeyValue> = state
            .entries
            .iter()
            .filter(|(_, entry)| {
                serde_json::from_slice::<serde_json::Value>(&entry.value)
                    .map(|doc| selector.matches(&doc))
                    .unwrap_or(false)
            })
            .map(|(key, entry)| KeyValue {
                key: key.clone(),
                value: entry.value.clone(),
            })
            .collect();
        hits.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(hits)
    }
}

#[async_trait]
impl LedgerHistory for InMemoryLedger {
    async fn history(&self, key: &str) -> StorageResult<Vec<KeyModification>> {
        let state = self.state.read().await;
        Ok(state.history.get(key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transaction_reads_its_own_writes() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().await.unwrap();
        tx.put("k", b"v1".to_vec()).await.unwrap();
        assert_eq!(tx.get("k").await.unwrap(), Some(b"v1".to_vec()));
        assert!(ledger.committed("k").await.is_none());

        tx.commit().await.unwrap();
        assert_eq!(ledger.committed("k").await, Some(b"v1".to_vec()));
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_no_state() {
        let ledger = InMemoryLedger::new();
        {
            let mut tx = ledger.begin().await.unwrap();
            tx.put("k", b"v".to_vec()).await.unwrap();
        }
        assert!(ledger.committed("k").await.is_none());
        assert!(ledger.commits().await.is_empty());
    }

    #[tokio::test]
    async fn stale_read_conflicts() {
        let ledger = InMemoryLedger::new();
        let mut first = ledger.begin().await.unwrap();
        let mut second = ledger.begin().await.unwrap();

        assert!(first.get("counter").await.unwrap().is_none());
        assert!(second.get("counter").await.unwrap().is_none());
        first.put("counter", b"1".to_vec()).await.unwrap();
        second.put("counter", b"1".to_vec()).await.unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        assert_eq!(ledger.commits().await.len(), 1);
    }

    #[tokio::test]
    async fn blind_writes_do_not_conflict() {
        let ledger = InMemoryLedger::new();
        let mut first = ledger.begin().await.unwrap();
        let mut second = ledger.begin().await.unwrap();
        first.put("a", b"1".to_vec()).await.unwrap();
        second.put("b", b"2".to_vec()).await.unwrap();
        first.commit().await.unwrap();
        second.commit().await.unwrap();
    }

    #[tokio::test]
    async fn commit_twice_is_rejected() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().await.unwrap();
        tx.put("a", b"1".to_vec()).await.unwrap();
        tx.commit().await.unwrap();
        assert!(matches!(
            tx.commit().await,
            Err(StorageError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn commits_are_hash_linked() {
        let ledger = InMemoryLedger::new();
        for i in 0..3u8 {
            let mut tx = ledger.begin().await.unwrap();
            tx.put("k", vec![i]).await.unwrap();
            tx.commit().await.unwrap();
        }
        let commits = ledger.commits().await;
        assert_eq!(commits.len(), 3);
        assert_eq!(commits[0].previous_hash, "");
        assert_eq!(commits[1].previous_hash, commits[0].hash);
        assert_eq!(commits[2].previous_hash, commits[1].hash);
        ledger.verify_chain().await.unwrap();
    }

    #[tokio::test]
    async fn read_only_commit_appends_nothing() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().await.unwrap();
        tx.get("missing").await.unwrap();
        let receipt = tx.commit().await.unwrap();
        assert!(receipt.written_keys.is_empty());
        assert!(ledger.commits().await.is_empty());
    }

    #[tokio::test]
    async fn history_lists_every_committed_value() {
        let ledger = InMemoryLedger::new();
        for value in [b"a", b"b"] {
            let mut tx = ledger.begin().await.unwrap();
            tx.put("k", value.to_vec()).await.unwrap();
            tx.commit().await.unwrap();
        }
        let history = ledger.history("k").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].value, b"a".to_vec());
        assert_eq!(history[1].value, b"b".to_vec());
        assert!(history[0].sequence < history[1].sequence);
    }

    #[tokio::test]
    async fn query_matches_committed_json_only() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().await.unwrap();
        tx.put("product-2", br#"{"docType":"product","gtin":"42"}"#.to_vec())
            .await
            .unwrap();
        tx.put("product-1", br#"{"docType":"product","gtin":"42"}"#.to_vec())
            .await
            .unwrap();
        tx.put("label-1", br#"{"docType":"label","gtin":"42"}"#.to_vec())
            .await
            .unwrap();
        tx.put("raw", b"not json".to_vec()).await.unwrap();
        tx.commit().await.unwrap();

        let selector = Selector::new().field_eq("docType", "product").field_eq("gtin", "42");
        let hits = ledger.query(&selector).await.unwrap();
        let keys: Vec<&str> = hits.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["product-1", "product-2"]);
    }
}
