//! Gateway facade validations and error normalization, end to end over the mock client.

use media_licensing_engine::{
    db_types::BusinessId,
    gateway::{mock::MockStripeClient, GatewayError, GatewayMetadata, StripeConfig, StripeGateway, MIN_PAYOUT},
};
use mlm_common::UsdAmount;

fn gateway(config: StripeConfig) -> (StripeGateway<MockStripeClient>, MockStripeClient) {
    let client = MockStripeClient::new();
    (StripeGateway::new(client.clone(), config), client)
}

fn assert_code(err: &GatewayError, code: &str, status: u16) {
    assert_eq!(err.code(), code);
    assert_eq!(err.http_status(), status);
}

#[tokio::test]
async fn payment_intents_require_a_positive_amount() {
    let (gateway, _) = gateway(StripeConfig::new("sk_test"));
    let metadata = GatewayMetadata::new();

    let err = gateway.create_payment_intent(UsdAmount::ZERO, "cus_1", &metadata).await.unwrap_err();
    assert_code(&err, "invalid_amount", 400);
    let err = gateway.create_payment_intent(UsdAmount::from_cents(-5), "cus_1", &metadata).await.unwrap_err();
    assert_code(&err, "invalid_amount", 400);

    let intent = gateway.create_payment_intent(UsdAmount::from_cents(5_000), "cus_1", &metadata).await.unwrap();
    assert_eq!(intent.amount.value(), 5_000);
    assert!(intent.client_secret.is_some());
}

#[tokio::test]
async fn destination_charges_validate_amount_and_destination() {
    let (gateway, _) = gateway(StripeConfig::new("sk_test"));
    let metadata = GatewayMetadata::new();

    let err = gateway.create_destination_charge(UsdAmount::ZERO, "cus_1", "acct_1", &metadata).await.unwrap_err();
    assert_code(&err, "invalid_amount", 400);
    let err =
        gateway.create_destination_charge(UsdAmount::from_cents(100), "cus_1", "  ", &metadata).await.unwrap_err();
    assert_code(&err, "invalid_request", 400);

    assert!(gateway.create_destination_charge(UsdAmount::from_cents(100), "cus_1", "acct_1", &metadata).await.is_ok());
}

#[tokio::test]
async fn refunds_require_a_payment_intent_id() {
    let (gateway, client) = gateway(StripeConfig::new("sk_test"));
    let err = gateway.create_refund("", None).await.unwrap_err();
    assert_code(&err, "invalid_request", 400);
    assert_eq!(client.refund_count(), 0);

    client.register_payment_intent("pi_9", UsdAmount::from_cents(750));
    let refund = gateway.create_refund("pi_9", None).await.unwrap();
    assert_eq!(refund.amount.value(), 750);
    assert_eq!(refund.payment_intent_id, "pi_9");
    assert_eq!(client.refund_count(), 1);
}

#[tokio::test]
async fn account_links_need_a_configured_frontend() {
    let (gateway, _) = gateway(StripeConfig::new("sk_test"));
    let err = gateway.create_account_link("acct_1", &BusinessId::from("biz-1")).await.unwrap_err();
    assert!(matches!(err, GatewayError::Configuration(_)));
    assert_eq!(err.code(), "configuration_error");
    assert_eq!(err.http_status(), 500);

    let (gateway, _) = self::gateway(StripeConfig::new("sk_test").with_frontend_url("https://market.example"));
    let link = gateway.create_account_link("acct_1", &BusinessId::from("biz-1")).await.unwrap();
    assert!(link.url.contains("biz-1"));
}

#[tokio::test]
async fn account_activation_requires_both_provider_flags() {
    let (gateway, client) = gateway(StripeConfig::new("sk_test"));
    client.register_account("acct_ready", true, true);
    client.register_account("acct_onboarding", true, false);
    client.register_account("acct_new", false, false);

    assert!(gateway.is_account_active("acct_ready").await.unwrap());
    assert!(!gateway.is_account_active("acct_onboarding").await.unwrap());
    assert!(!gateway.is_account_active("acct_new").await.unwrap());

    let err = gateway.is_account_active("acct_ghost").await.unwrap_err();
    assert_code(&err, "invalid_request", 400);
}

#[tokio::test]
async fn payouts_enforce_the_provider_minimum() {
    let (gateway, _) = gateway(StripeConfig::new("sk_test"));
    let metadata = GatewayMetadata::new();

    let err = gateway.create_payout("", UsdAmount::from_cents(500), &metadata).await.unwrap_err();
    assert_code(&err, "invalid_request", 400);
    let err = gateway.create_payout("acct_1", UsdAmount::ZERO, &metadata).await.unwrap_err();
    assert_code(&err, "invalid_amount", 400);
    let err = gateway.create_payout("acct_1", MIN_PAYOUT - UsdAmount::from_cents(1), &metadata).await.unwrap_err();
    assert_code(&err, "payout_below_minimum", 400);

    let payout = gateway.create_payout("acct_1", MIN_PAYOUT, &metadata).await.unwrap();
    assert_eq!(payout.amount, MIN_PAYOUT);
}

#[tokio::test]
async fn transfers_validate_amount_and_destination() {
    let (gateway, _) = gateway(StripeConfig::new("sk_test"));
    let metadata = GatewayMetadata::new();

    let err = gateway.create_transfer(UsdAmount::ZERO, "acct_1", &metadata).await.unwrap_err();
    assert_code(&err, "invalid_amount", 400);
    let err = gateway.create_transfer(UsdAmount::from_cents(100), "", &metadata).await.unwrap_err();
    assert_code(&err, "invalid_request", 400);

    let transfer = gateway.create_transfer(UsdAmount::from_cents(100), "acct_1", &metadata).await.unwrap();
    assert_eq!(transfer.destination, "acct_1");
}

#[tokio::test]
async fn provider_failures_surface_normalized_once() {
    let (gateway, client) = gateway(StripeConfig::new("sk_test"));

    client.fail_next_with("StripeRateLimitError", "slow down");
    let err = gateway.create_customer(&BusinessId::from("biz-1"), "owner@example.com").await.unwrap_err();
    assert_code(&err, "rate_limit", 429);
    assert!(err.is_retryable());

    client.fail_next_with("StripeCardError", "card declined");
    let metadata = GatewayMetadata::new();
    let err = gateway.create_payment_intent(UsdAmount::from_cents(100), "cus_1", &metadata).await.unwrap_err();
    assert_code(&err, "card_declined", 402);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn customers_need_an_email() {
    let (gateway, _) = gateway(StripeConfig::new("sk_test"));
    let err = gateway.create_customer(&BusinessId::from("biz-1"), "   ").await.unwrap_err();
    assert_code(&err, "invalid_request", 400);

    let customer = gateway.create_customer(&BusinessId::from("biz-1"), "owner@example.com").await.unwrap();
    assert_eq!(customer.email, "owner@example.com");
}

#[tokio::test]
async fn subscriptions_pass_through_the_client() {
    let (gateway, _) = gateway(StripeConfig::new("sk_test"));
    let metadata = GatewayMetadata::new();
    let sub = gateway.create_subscription("cus_1", "price_basic", &metadata).await.unwrap();
    assert_eq!(sub.status, "active");
    let canceled = gateway.cancel_subscription(&sub.id).await.unwrap();
    assert_eq!(canceled.status, "canceled");

    let method = gateway.create_payment_method("pm_1", "cus_1").await.unwrap();
    assert_eq!(method.customer_id, "cus_1");

    let account = gateway.create_connect_account(&BusinessId::from("biz-1")).await.unwrap();
    assert!(!account.charges_enabled);
}
