//! `SqliteDatabase` is a concrete implementation of an engine storage backend.
//!
//! Unsurprisingly, it uses SQLite and implements the traits defined in the [`crate::traits`]
//! module. Embedded migrations run when a database is opened, so a fresh file (or an in-memory
//! database) is immediately usable.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{businesses, collections, db_url, new_pool, transactions};
use crate::{
    db_types::{
        Business,
        BusinessId,
        Collection,
        CollectionId,
        EarningsCredit,
        NewBusiness,
        NewCollection,
        NewTransaction,
        Transaction,
        TransactionId,
    },
    ledger::{ChargeSettlement, RefundAdjustments},
    traits::{
        BusinessApiError,
        BusinessManagement,
        CollectionApiError,
        CollectionManagement,
        MarketplaceDatabase,
        MarketplaceDbError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Opens (creating if necessary) the database at the URL given by `MLM_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;
        debug!("🗃️ Database migrations complete for {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    /// An in-memory database on a single shared connection. Handy for tests and demos; the data
    /// dies with the pool.
    pub async fn new_in_memory() -> Result<Self, sqlx::Error> {
        use std::str::FromStr;
        let options = sqlx::sqlite::SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;
        Ok(Self { url: "sqlite::memory:".to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl BusinessManagement for SqliteDatabase {
    async fn create_business(&self, business: NewBusiness) -> Result<Business, BusinessApiError> {
        let mut conn = self.pool.acquire().await?;
        businesses::insert_business(business, &mut conn).await
    }

    async fn fetch_business(&self, id: &BusinessId) -> Result<Option<Business>, BusinessApiError> {
        let mut conn = self.pool.acquire().await?;
        businesses::fetch_business_by_id(id, &mut conn).await
    }
}

impl CollectionManagement for SqliteDatabase {
    async fn create_collection(&self, collection: NewCollection) -> Result<Collection, CollectionApiError> {
        let id = collection.id.clone();
        let mut tx = self.pool.begin().await?;
        collections::insert_collection(collection, &mut tx).await?;
        let created = collections::fetch_collection(&id, &mut tx)
            .await
            .map_err(|e| CollectionApiError::DatabaseError(e.to_string()))?;
        tx.commit().await?;
        created.ok_or_else(|| CollectionApiError::DatabaseError(format!("Collection {id} vanished after insert")))
    }

    async fn fetch_collection(&self, id: &CollectionId) -> Result<Option<Collection>, CollectionApiError> {
        let mut conn = self.pool.acquire().await?;
        collections::fetch_collection(id, &mut conn).await.map_err(|e| CollectionApiError::DatabaseError(e.to_string()))
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        &self.url
    }

    async fn insert_transaction(&self, transaction: NewTransaction) -> Result<Transaction, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        let transaction = transactions::insert_transaction(transaction, &mut conn).await?;
        debug!("🗃️ Transaction {} stored as pending", transaction.id);
        Ok(transaction)
    }

    async fn fetch_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_transaction_by_id(id, &mut conn).await
    }

    async fn settle_transaction(&self, id: &TransactionId) -> Result<Transaction, MarketplaceDbError> {
        let mut tx = self.pool.begin().await?;
        let transaction = transactions::mark_completed(id, &mut tx).await?;
        let settlement = ChargeSettlement::for_transaction(&transaction);
        businesses::apply_settlement(&settlement, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️💰️ Transaction {id} settled: {} gross, {} to the payee", transaction.gross_amount, transaction.creator_share);
        Ok(transaction)
    }

    async fn try_record_earnings(&self, credit: &EarningsCredit) -> Result<Option<Collection>, MarketplaceDbError> {
        let mut tx = self.pool.begin().await?;
        match collections::try_record_earnings(credit, &mut tx).await? {
            Some(updated) => {
                tx.commit().await?;
                Ok(Some(updated))
            },
            None => {
                tx.rollback().await?;
                Ok(None)
            },
        }
    }

    async fn mark_transaction_refunded(
        &self,
        id: &TransactionId,
        refund_id: &str,
    ) -> Result<Transaction, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        let transaction = transactions::mark_refunded(id, refund_id, &mut conn).await?;
        debug!("🗃️💸️ Transaction {id} marked refunded ({refund_id})");
        Ok(transaction)
    }

    async fn apply_refund_adjustments(&self, adjustments: &RefundAdjustments) -> Result<(), MarketplaceDbError> {
        // Two independent single-row updates on one connection; deliberately not wrapped in a
        // database transaction (see the trait contract).
        let mut conn = self.pool.acquire().await?;
        businesses::apply_refund_adjustments(adjustments, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), MarketplaceDbError> {
        self.pool.close().await;
        Ok(())
    }
}
