use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{Result, TransactionProvider, UnitOfWorkError};

/// Counters of provider calls, for tests and the demo binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionStats {
    /// Transactions opened.
    pub begun: u64,
    /// Transactions committed successfully.
    pub committed: u64,
    /// Transactions rolled back, including rejected commits.
    pub rolled_back: u64,
}

/// Handle of an open in-memory transaction.
///
/// Writes are staged here and only reach the store on commit.
#[derive(Debug)]
pub struct InMemoryTransaction {
    id: u64,
    writes: Vec<(String, Option<Value>)>,
}

impl InMemoryTransaction {
    /// Provider-assigned transaction number, starting at 1.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stages `value` under `key`.
    pub fn put(&mut self, key: impl Into<String>, value: Value) {
        self.writes.push((key.into(), Some(value)));
    }

    /// Stages the removal of `key`.
    pub fn delete(&mut self, key: impl Into<String>) {
        self.writes.push((key.into(), None));
    }

    /// Latest staged write for `key`: `Some(None)` is a staged delete,
    /// `None` means this transaction never touched the key.
    pub fn staged(&self, key: &str) -> Option<Option<&Value>> {
        self.writes
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_ref())
    }

    /// Number of staged writes.
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Returns true if nothing was staged.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

#[derive(Default)]
struct State {
    data: BTreeMap<String, Value>,
    stats: TransactionStats,
    next_id: u64,
    fail_next_commit: bool,
}

/// Transactional in-memory key/value store holding JSON documents.
///
/// Used by tests and the demo binary in place of a database.
#[derive(Clone, Default)]
pub struct InMemoryTransactionProvider {
    state: Arc<RwLock<State>>,
}

impl InMemoryTransactionProvider {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next commit fail and discard its writes.
    pub async fn set_fail_next_commit(&self, fail: bool) {
        self.state.write().await.fail_next_commit = fail;
    }

    /// Returns the committed value under `key`.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.state.read().await.data.get(key).cloned()
    }

    /// Reads `key` as seen from inside `transaction`.
    pub async fn read(&self, transaction: &InMemoryTransaction, key: &str) -> Option<Value> {
        match transaction.staged(key) {
            Some(staged) => staged.cloned(),
            None => self.get(key).await,
        }
    }

    /// Committed keys starting with `prefix`, in key order.
    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.state
            .read()
            .await
            .data
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Number of committed keys.
    pub async fn len(&self) -> usize {
        self.state.read().await.data.len()
    }

    /// Returns true if nothing was committed yet.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.data.is_empty()
    }

    /// Returns the call counters.
    pub async fn stats(&self) -> TransactionStats {
        self.state.read().await.stats
    }
}

#[async_trait]
impl TransactionProvider for InMemoryTransactionProvider {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        state.stats.begun += 1;
        Ok(InMemoryTransaction {
            id: state.next_id,
            writes: Vec::new(),
        })
    }

    async fn commit(&self, transaction: InMemoryTransaction) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_next_commit {
            state.fail_next_commit = false;
            state.stats.rolled_back += 1;
            return Err(UnitOfWorkError::Provider(format!(
                "commit of transaction {} rejected",
                transaction.id
            )));
        }

        for (key, value) in transaction.writes {
            match value {
                Some(value) => {
                    state.data.insert(key, value);
                }
                None => {
                    state.data.remove(&key);
                }
            }
        }
        state.stats.committed += 1;
        Ok(())
    }

    async fn rollback(&self, _transaction: InMemoryTransaction) -> Result<()> {
        self.state.write().await.stats.rolled_back += 1;
        Ok(())
    }
}
