use std::future::Future;
use std::sync::Arc;

use common::AggregateId;
use domain::{DomainEvent, EventSource};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

use crate::{Result, TransactionProvider, UnitOfWorkError};

/// An aggregate shared between the code that mutates it and the unit of
/// work that remembers it was touched.
pub type SharedAggregate<E> = Arc<Mutex<dyn EventSource<E>>>;

/// Tracks one storage transaction and the aggregates written during it.
///
/// All methods take `&self`; the transaction handle and the aggregate list
/// sit behind async mutexes so repositories and the application service can
/// share one instance through an `Arc`.
pub struct UnitOfWork<P: TransactionProvider, E: DomainEvent> {
    provider: Arc<P>,
    transaction: Mutex<Option<P::Transaction>>,
    aggregates: Mutex<Vec<(AggregateId, SharedAggregate<E>)>>,
}

impl<P: TransactionProvider, E: DomainEvent> UnitOfWork<P, E> {
    /// Creates a unit of work with no active transaction.
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            transaction: Mutex::new(None),
            aggregates: Mutex::new(Vec::new()),
        }
    }

    /// Returns the transaction provider.
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Opens a transaction unless one is already active.
    pub async fn start(&self) -> Result<()> {
        let mut transaction = self.transaction.lock().await;
        if transaction.is_none() {
            *transaction = Some(self.provider.begin().await?);
            tracing::debug!("transaction started");
        }
        Ok(())
    }

    /// Returns true between `start` and `commit`/`rollback`.
    pub async fn is_active(&self) -> bool {
        self.transaction.lock().await.is_some()
    }

    /// Commits the active transaction.
    ///
    /// The handle and the registered aggregates are cleared whether or not
    /// the provider accepts the commit.
    pub async fn commit(&self) -> Result<()> {
        let transaction = self
            .transaction
            .lock()
            .await
            .take()
            .ok_or(UnitOfWorkError::NoActiveTransaction)?;
        self.aggregates.lock().await.clear();

        let result = self.provider.commit(transaction).await;
        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!("unit_of_work_commits_total", "outcome" => outcome).increment(1);
        tracing::debug!(outcome, "transaction committed");
        result
    }

    /// Rolls back the active transaction.
    ///
    /// The handle and the registered aggregates are cleared whether or not
    /// the provider accepts the rollback.
    pub async fn rollback(&self) -> Result<()> {
        let transaction = self
            .transaction
            .lock()
            .await
            .take()
            .ok_or(UnitOfWorkError::NoActiveTransaction)?;
        self.aggregates.lock().await.clear();

        let result = self.provider.rollback(transaction).await;
        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!("unit_of_work_rollbacks_total", "outcome" => outcome).increment(1);
        tracing::debug!(outcome, "transaction rolled back");
        result
    }

    /// Runs `work` inside a transaction.
    ///
    /// If a transaction is already active, `work` joins it and the caller
    /// stays responsible for committing. Otherwise a transaction is opened
    /// for `work` alone, committed when it succeeds and rolled back when it
    /// fails; the error of `work` is returned unchanged.
    pub async fn do_work<T, Error, F, Fut>(&self, work: F) -> std::result::Result<T, Error>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = std::result::Result<T, Error>> + Send,
        Error: From<UnitOfWorkError>,
    {
        if self.is_active().await {
            return work().await;
        }

        self.start().await?;
        match work().await {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback after failed work failed");
                }
                Err(err)
            }
        }
    }

    /// Locks and returns the active transaction handle.
    ///
    /// Hold the guard only for the duration of one storage call; `commit`
    /// and `rollback` wait for it.
    pub async fn transaction(&self) -> Result<MappedMutexGuard<'_, P::Transaction>> {
        let guard = self.transaction.lock().await;
        MutexGuard::try_map(guard, |transaction| transaction.as_mut())
            .map_err(|_| UnitOfWorkError::NoActiveTransaction)
    }

    /// Runs `f` against the active transaction handle.
    pub async fn with_transaction<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut P::Transaction) -> R,
    {
        let mut transaction = self.transaction().await?;
        Ok(f(&mut *transaction))
    }

    /// Remembers that `aggregate` was written during this unit of work.
    ///
    /// Registering the same aggregate twice keeps the first registration.
    /// The caller must not hold the aggregate's lock.
    pub async fn add_aggregate_root(&self, aggregate: SharedAggregate<E>) {
        let id = aggregate.lock().await.source_id();
        let mut aggregates = self.aggregates.lock().await;
        if aggregates.iter().any(|(existing, _)| *existing == id) {
            return;
        }
        aggregates.push((id, aggregate));
    }

    /// Aggregates registered since the last commit or rollback, in
    /// registration order.
    pub async fn aggregate_roots(&self) -> Vec<SharedAggregate<E>> {
        self.aggregates
            .lock()
            .await
            .iter()
            .map(|(_, aggregate)| Arc::clone(aggregate))
            .collect()
    }
}
