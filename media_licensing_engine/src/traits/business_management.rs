use thiserror::Error;

use crate::db_types::{Business, BusinessId, NewBusiness};

#[derive(Debug, Clone, Error)]
pub enum BusinessApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Business already exists: {0}")]
    BusinessAlreadyExists(BusinessId),
}

impl From<sqlx::Error> for BusinessApiError {
    fn from(e: sqlx::Error) -> Self {
        BusinessApiError::DatabaseError(e.to_string())
    }
}

/// Queries and lifecycle for businesses. Balance mutations are *not* part of this trait; they
/// only happen through the ledger operations on [`super::MarketplaceDatabase`].
#[allow(async_fn_in_trait)]
pub trait BusinessManagement {
    /// Creates a new business with zeroed balances.
    async fn create_business(&self, business: NewBusiness) -> Result<Business, BusinessApiError>;

    /// Fetches a business by id. Returns `None` if it does not exist.
    async fn fetch_business(&self, id: &BusinessId) -> Result<Option<Business>, BusinessApiError>;
}
