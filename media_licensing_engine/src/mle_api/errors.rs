use thiserror::Error;

use crate::{
    db_types::{CollectionId, TransactionId, TransactionStatus},
    gateway::GatewayError,
    traits::{CollectionApiError, MarketplaceDbError},
};

/// Input validation failures for earnings updates. Never retried; the caller must fix the input.
///
/// The display strings are part of the API contract and are matched by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid creatorShare")]
    InvalidCreatorShare,
    #[error("missing collectionId")]
    MissingCollectionId,
    #[error("collectionId mismatch")]
    CollectionIdMismatch,
    #[error("missing payee/businessId")]
    MissingPayee,
}

#[derive(Debug, Clone, Error)]
pub enum PoolEarningsError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("No collection found with id {0}")]
    CollectionNotFound(CollectionId),
    /// Optimistic-concurrency conflict that survived the internal retry budget. Retryable by the
    /// caller.
    #[error("Concurrent updates kept the earnings write from landing after {attempts} attempts")]
    Conflict { attempts: u32 },
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<MarketplaceDbError> for PoolEarningsError {
    fn from(e: MarketplaceDbError) -> Self {
        match e {
            MarketplaceDbError::CollectionNotFound(id) => PoolEarningsError::CollectionNotFound(id),
            other => PoolEarningsError::DatabaseError(other.to_string()),
        }
    }
}

impl From<CollectionApiError> for PoolEarningsError {
    fn from(e: CollectionApiError) -> Self {
        PoolEarningsError::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum RefundError {
    #[error("The requested transaction {0} does not exist")]
    TransactionNotFound(TransactionId),
    /// The transaction is not in the one state refunds accept. Refunding a pending, failed or
    /// already-refunded transaction is rejected, not retried.
    #[error("Transaction is {0}; only completed transactions can be refunded")]
    InvalidStatus(TransactionStatus),
    #[error("Transaction has no payment intent to refund against")]
    NoPaymentIntent,
    /// A gateway failure, already normalized. Propagated with its code and status untouched.
    #[error("{0}")]
    Gateway(#[from] GatewayError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl RefundError {
    /// The stable machine-readable code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            RefundError::TransactionNotFound(_) => "transaction_not_found",
            RefundError::InvalidStatus(_) => "invalid_status",
            RefundError::NoPaymentIntent => "no_payment_intent",
            RefundError::Gateway(e) => e.code(),
            RefundError::DatabaseError(_) => "database_error",
        }
    }
}

impl From<MarketplaceDbError> for RefundError {
    fn from(e: MarketplaceDbError) -> Self {
        match e {
            MarketplaceDbError::TransactionNotFound(id) => RefundError::TransactionNotFound(id),
            other => RefundError::DatabaseError(other.to_string()),
        }
    }
}
