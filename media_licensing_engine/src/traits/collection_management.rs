use thiserror::Error;

use crate::db_types::{Collection, CollectionId, NewCollection};

#[derive(Debug, Clone, Error)]
pub enum CollectionApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Collection already exists: {0}")]
    CollectionAlreadyExists(CollectionId),
}

impl From<sqlx::Error> for CollectionApiError {
    fn from(e: sqlx::Error) -> Self {
        CollectionApiError::DatabaseError(e.to_string())
    }
}

/// Queries and lifecycle for collections. The returned [`Collection`] is the full document view:
/// aggregate totals plus member and earnings rows in insertion order.
#[allow(async_fn_in_trait)]
pub trait CollectionManagement {
    /// Creates a new collection with zeroed totals. The owner is always included as a member.
    async fn create_collection(&self, collection: NewCollection) -> Result<Collection, CollectionApiError>;

    /// Fetches a collection by id, with its member businesses, media assets and earnings rows
    /// resolved. Returns `None` if it does not exist.
    async fn fetch_collection(&self, id: &CollectionId) -> Result<Option<Collection>, CollectionApiError>;
}
