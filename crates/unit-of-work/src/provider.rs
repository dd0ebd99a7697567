use async_trait::async_trait;

use crate::Result;

/// Storage boundary that opens and finishes transactions.
///
/// The transaction handle is opaque to the unit of work: it is created by
/// `begin`, held while the operation runs and handed back exactly once to
/// either `commit` or `rollback`.
#[async_trait]
pub trait TransactionProvider: Send + Sync + 'static {
    /// Handle of one open transaction.
    type Transaction: Send + 'static;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Transaction>;

    /// Makes every write of `transaction` durable.
    async fn commit(&self, transaction: Self::Transaction) -> Result<()>;

    /// Discards every write of `transaction`.
    async fn rollback(&self, transaction: Self::Transaction) -> Result<()>;
}
