//! Shared helpers for the integration suites: an in-memory database, seeded businesses and
//! pools, and transactions in the states the flows expect.
#![allow(dead_code)]

use media_licensing_engine::{
    db_types::{
        Business,
        BusinessId,
        Collection,
        CollectionId,
        NewBusiness,
        NewCollection,
        NewTransaction,
        PoolType,
        Transaction,
        TransactionId,
        TransactionMetadata,
    },
    traits::{BusinessManagement, CollectionManagement, MarketplaceDatabase},
    SqliteDatabase,
};
use mlm_common::UsdAmount;

pub async fn new_db() -> SqliteDatabase {
    let _ = env_logger::builder().is_test(true).try_init();
    SqliteDatabase::new_in_memory().await.expect("could not open in-memory database")
}

pub async fn seed_business(db: &SqliteDatabase, id: &str) -> Business {
    db.create_business(NewBusiness::new(BusinessId::from(id), format!("{id}@example.com")))
        .await
        .expect("could not seed business")
}

pub async fn seed_collection(db: &SqliteDatabase, id: &str, owner: &str, members: &[&str]) -> Collection {
    let mut new_collection =
        NewCollection::new(CollectionId::from(id), format!("{id} pool"), PoolType::Complementary, BusinessId::from(owner));
    for member in members {
        new_collection = new_collection.with_member(BusinessId::from(*member));
    }
    db.create_collection(new_collection).await.expect("could not seed collection")
}

/// Inserts a charge and settles it, leaving a `completed` transaction with credited balances,
/// the way the checkout flow would.
pub async fn completed_transaction(
    db: &SqliteDatabase,
    id: &str,
    payer: Option<&str>,
    payee: Option<&str>,
    gross_cents: i64,
    share_cents: i64,
    payment_intent: Option<&str>,
    metadata: TransactionMetadata,
) -> Transaction {
    let mut tx = NewTransaction::new(
        TransactionId::from(id),
        UsdAmount::from_cents(gross_cents),
        UsdAmount::from_cents(share_cents),
    )
    .with_metadata(metadata);
    if let Some(payer) = payer {
        tx = tx.with_payer(BusinessId::from(payer));
    }
    if let Some(payee) = payee {
        tx = tx.with_payee(BusinessId::from(payee));
    }
    if let Some(intent) = payment_intent {
        tx = tx.with_payment_intent(intent);
    }
    db.insert_transaction(tx).await.expect("could not insert transaction");
    db.settle_transaction(&TransactionId::from(id)).await.expect("could not settle transaction")
}

pub async fn revenue_balance(db: &SqliteDatabase, id: &str) -> i64 {
    db.fetch_business(&BusinessId::from(id))
        .await
        .expect("could not fetch business")
        .expect("business does not exist")
        .revenue_balance
        .value()
}
