use thiserror::Error;

use crate::{
    db_types::{Collection, CollectionId, EarningsCredit, NewTransaction, Transaction, TransactionId},
    ledger::RefundAdjustments,
    traits::{BusinessApiError, BusinessManagement, CollectionApiError, CollectionManagement},
};

#[derive(Debug, Clone, Error)]
pub enum MarketplaceDbError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Could not decode a stored record: {0}")]
    DecodeError(String),
    #[error("Cannot insert transaction, since it already exists: {0}")]
    TransactionAlreadyExists(TransactionId),
    #[error("The requested transaction {0} does not exist")]
    TransactionNotFound(TransactionId),
    #[error("The requested collection {0} does not exist")]
    CollectionNotFound(CollectionId),
    #[error("Illegal transaction status change. {0}")]
    StatusUpdateError(String),
    #[error("{0}")]
    BusinessError(#[from] BusinessApiError),
    #[error("{0}")]
    CollectionError(#[from] CollectionApiError),
}

impl From<sqlx::Error> for MarketplaceDbError {
    fn from(e: sqlx::Error) -> Self {
        MarketplaceDbError::DatabaseError(e.to_string())
    }
}

/// This trait defines the highest level of behaviour for backends supporting the engine.
///
/// This behaviour includes:
/// * Transaction lifecycle: inserting the charge the checkout flow created, settling it, and
///   marking it refunded once the gateway has confirmed the refund.
/// * The earnings write for a collection, as a single optimistic-concurrency attempt.
/// * The balance adjustments that settlements and refunds apply to businesses.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone + BusinessManagement + CollectionManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a newly created charge in `pending` state. Inserting a transaction id that already
    /// exists is an error.
    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<Transaction, MarketplaceDbError>;

    /// Fetches the transaction for the given id. Returns `None` if it does not exist.
    async fn fetch_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, MarketplaceDbError>;

    /// Moves a `pending` transaction to `completed` and applies its
    /// [`crate::ledger::ChargeSettlement`] to the payer and payee balances, in a single database
    /// transaction. Called by the checkout flow once the processor confirms the charge.
    ///
    /// Fails with [`MarketplaceDbError::StatusUpdateError`] if the transaction is not `pending`.
    async fn settle_transaction(&self, id: &TransactionId) -> Result<Transaction, MarketplaceDbError>;

    /// One optimistic attempt to apply an earnings credit to a collection.
    ///
    /// Re-reads the collection, applies [`Collection::apply_credit`] to the snapshot, and commits
    /// the new totals together with the member-earnings upsert, guarded by a version
    /// compare-and-swap. Returns `Ok(None)` when a concurrent writer got there first; the caller
    /// owns the retry policy.
    async fn try_record_earnings(&self, credit: &EarningsCredit) -> Result<Option<Collection>, MarketplaceDbError>;

    /// Moves a `completed` transaction to `refunded`, recording the gateway refund id and the
    /// refund timestamp. The status guard runs inside the update itself, so a concurrent double
    /// refund loses cleanly with [`MarketplaceDbError::StatusUpdateError`].
    async fn mark_transaction_refunded(
        &self,
        id: &TransactionId,
        refund_id: &str,
    ) -> Result<Transaction, MarketplaceDbError>;

    /// Applies the two sides of a refund adjustment as independent atomic increments. Not a
    /// cross-row transaction: if the process dies between the two updates, the refunded
    /// transaction row is the recovery record.
    async fn apply_refund_adjustments(&self, adjustments: &RefundAdjustments) -> Result<(), MarketplaceDbError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), MarketplaceDbError> {
        Ok(())
    }
}
