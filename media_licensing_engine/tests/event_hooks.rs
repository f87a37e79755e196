//! Hook wiring: subscribers hear about recorded earnings and refunds.
mod common;

use std::time::Duration;

use common::{completed_transaction, new_db, seed_business, seed_collection};
use media_licensing_engine::{
    db_types::{CollectionId, TransactionId, TransactionMetadata},
    events::{EventHandlers, EventHooks},
    gateway::{mock::MockStripeClient, StripeConfig, StripeGateway},
    EarningsApi,
    RefundApi,
};
use mlm_common::UsdAmount;
use tokio::sync::mpsc;

#[tokio::test]
async fn subscribers_hear_about_earnings_and_refunds() {
    let db = new_db().await;
    seed_business(&db, "owner").await;
    seed_business(&db, "member-a").await;
    seed_business(&db, "payer").await;
    let collection = seed_collection(&db, "col-1", "owner", &["member-a"]).await;

    let (earnings_tx, mut earnings_rx) = mpsc::channel(4);
    let (refund_tx, mut refund_rx) = mpsc::channel(4);
    let mut hooks = EventHooks::default();
    hooks.on_earnings_recorded(move |ev| {
        let sender = earnings_tx.clone();
        Box::pin(async move {
            sender.send(ev).await.ok();
        })
    });
    hooks.on_transaction_refunded(move |ev| {
        let sender = refund_tx.clone();
        Box::pin(async move {
            sender.send(ev).await.ok();
        })
    });
    let handlers = EventHandlers::new(8, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let client = MockStripeClient::new();
    client.register_payment_intent("pi_1", UsdAmount::from_cents(10_000));
    let earnings_api = EarningsApi::new(db.clone(), producers.clone());
    let refund_api = RefundApi::new(
        db.clone(),
        StripeGateway::new(client.clone(), StripeConfig::new("sk_test")),
        producers,
    );

    let tx = completed_transaction(
        &db,
        "txn-1",
        Some("payer"),
        Some("member-a"),
        10_000,
        5_000,
        Some("pi_1"),
        TransactionMetadata::for_collection(CollectionId::from("col-1")),
    )
    .await;
    earnings_api.update_earnings(&collection, &tx).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), earnings_rx.recv())
        .await
        .expect("earnings hook never fired")
        .expect("earnings channel closed");
    assert_eq!(event.collection_id, CollectionId::from("col-1"));
    assert_eq!(event.amount.value(), 5_000);
    assert_eq!(event.total_revenue.value(), 5_000);

    refund_api.process_refund(&TransactionId::from("txn-1"), None).await.unwrap();
    let event = tokio::time::timeout(Duration::from_secs(5), refund_rx.recv())
        .await
        .expect("refund hook never fired")
        .expect("refund channel closed");
    assert_eq!(event.transaction.id, TransactionId::from("txn-1"));
    assert_eq!(event.amount.value(), 10_000);
    assert!(event.refund_id.starts_with("re_mock_"));
}
