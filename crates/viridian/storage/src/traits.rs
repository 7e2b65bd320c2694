use crate::model::{CommitReceipt, KeyModification, KeyValue, Selector};
use crate::StorageResult;
use async_trait::async_trait;

/// Transactional key/value ledger.
#[async_trait]
pub trait KeyValueLedger: Send + Sync {
    /// Open a transaction scope.
    async fn begin(&self) -> StorageResult<Box<dyn LedgerTransaction>>;
}

/// One transaction scope.
///
/// Reads record the version they observed (absent keys included); writes are
/// buffered. `commit` validates the read-set and applies every write or none.
/// Dropping a transaction without committing discards it.
#[async_trait]
pub trait LedgerTransaction: Send {
    fn tx_id(&self) -> &str;

    /// Read a key, seeing this transaction's own writes first.
    async fn get(&mut self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Stage a write.
    async fn put(&mut self, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Validate and apply. Fails with `StorageError::Conflict` if any read went stale.
    async fn commit(&mut self) -> StorageResult<CommitReceipt>;
}

/// Rich-query engine. Results are not isolated from concurrent commits.
#[async_trait]
pub trait SelectorQueryEngine: Send + Sync {
    async fn query(&self, selector: &Selector) -> StorageResult<Vec<KeyValue>>;
}

/// Per-key modification history.
#[async_trait]
pub trait LedgerHistory: Send + Sync {
    /// Every committed value of `key`, oldest first.
    async fn history(&self, key: &str) -> StorageResult<Vec<KeyModification>>;
}

/// Storage bundle consumed by the registry engine.
pub trait RegistryStorage: KeyValueLedger + SelectorQueryEngine + LedgerHistory + Send + Sync {}

impl<T> RegistryStorage for T where
    T: KeyValueLedger + SelectorQueryEngine + LedgerHistory + Send + Sync
{
}
