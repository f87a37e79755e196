//! In-memory provider client for tests and local development.
//!
//! Fabricates provider objects with deterministic ids and records every refund it creates.
//! Failure injection: [`MockStripeClient::fail_next_with`] makes the next provider call fail
//! with the given error type, which lets tests drive the whole normalization path.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
    Mutex,
};

use mlm_common::UsdAmount;

use super::provider::{
    GatewayMetadata,
    ProviderAccount,
    ProviderAccountLink,
    ProviderCustomer,
    ProviderError,
    ProviderPaymentIntent,
    ProviderPaymentMethod,
    ProviderPayout,
    ProviderRefund,
    ProviderSubscription,
    ProviderTransfer,
    RefundReason,
    StripeApiClient,
};
use crate::db_types::BusinessId;

#[derive(Default)]
struct MockState {
    accounts: Vec<ProviderAccount>,
    payment_intents: Vec<(String, UsdAmount)>,
    refunds: Vec<ProviderRefund>,
    next_failure: Option<ProviderError>,
}

/// An in-memory [`StripeApiClient`]. Cloning shares the underlying state, so a test can keep a
/// handle for assertions after moving a clone into the gateway.
#[derive(Clone, Default)]
pub struct MockStripeClient {
    state: Arc<Mutex<MockState>>,
    counter: Arc<AtomicU64>,
}

impl MockStripeClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}_mock_{}", self.counter.fetch_add(1, Ordering::SeqCst))
    }

    fn take_failure(&self) -> Option<ProviderError> {
        self.state.lock().unwrap().next_failure.take()
    }

    /// Registers a payment intent so that refunds against it resolve to `amount`.
    pub fn register_payment_intent(&self, id: impl Into<String>, amount: UsdAmount) {
        self.state.lock().unwrap().payment_intents.push((id.into(), amount));
    }

    /// Registers a Connect account with the given activation flags.
    pub fn register_account(&self, id: impl Into<String>, details_submitted: bool, charges_enabled: bool) {
        self.state.lock().unwrap().accounts.push(ProviderAccount { id: id.into(), details_submitted, charges_enabled });
    }

    /// Makes the next provider call fail with an error of the given type.
    pub fn fail_next_with(&self, error_type: &str, message: &str) {
        self.state.lock().unwrap().next_failure = Some(ProviderError::new(error_type, message));
    }

    pub fn refund_count(&self) -> usize {
        self.state.lock().unwrap().refunds.len()
    }

    pub fn created_refunds(&self) -> Vec<ProviderRefund> {
        self.state.lock().unwrap().refunds.clone()
    }
}

impl StripeApiClient for MockStripeClient {
    async fn create_customer(&self, _business_id: &BusinessId, email: &str) -> Result<ProviderCustomer, ProviderError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(ProviderCustomer { id: self.next_id("cus"), email: email.to_string() })
    }

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<ProviderPaymentMethod, ProviderError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(ProviderPaymentMethod { id: payment_method_id.to_string(), customer_id: customer_id.to_string() })
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        _price_id: &str,
        _metadata: &GatewayMetadata,
    ) -> Result<ProviderSubscription, ProviderError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(ProviderSubscription { id: self.next_id("sub"), customer_id: customer_id.to_string(), status: "active".to_string() })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<ProviderSubscription, ProviderError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(ProviderSubscription {
            id: subscription_id.to_string(),
            customer_id: String::new(),
            status: "canceled".to_string(),
        })
    }

    async fn create_connect_account(&self, _business_id: &BusinessId) -> Result<ProviderAccount, ProviderError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let account = ProviderAccount { id: self.next_id("acct"), details_submitted: false, charges_enabled: false };
        self.state.lock().unwrap().accounts.push(account.clone());
        Ok(account)
    }

    async fn create_account_link(
        &self,
        account_id: &str,
        _refresh_url: &str,
        return_url: &str,
    ) -> Result<ProviderAccountLink, ProviderError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(ProviderAccountLink { url: format!("https://connect.stripe.example/{account_id}?return={return_url}") })
    }

    async fn fetch_account(&self, account_id: &str) -> Result<ProviderAccount, ProviderError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        self.state
            .lock()
            .unwrap()
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .cloned()
            .ok_or_else(|| ProviderError::new("StripeInvalidRequestError", format!("No such account: {account_id}")))
    }

    async fn create_payment_intent(
        &self,
        amount: UsdAmount,
        _customer_id: &str,
        _metadata: &GatewayMetadata,
    ) -> Result<ProviderPaymentIntent, ProviderError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let id = self.next_id("pi");
        self.state.lock().unwrap().payment_intents.push((id.clone(), amount));
        Ok(ProviderPaymentIntent { client_secret: Some(format!("{id}_secret")), id, amount })
    }

    async fn create_destination_charge(
        &self,
        amount: UsdAmount,
        customer_id: &str,
        _destination_account_id: &str,
        metadata: &GatewayMetadata,
    ) -> Result<ProviderPaymentIntent, ProviderError> {
        self.create_payment_intent(amount, customer_id, metadata).await
    }

    async fn create_refund(
        &self,
        payment_intent_id: &str,
        _reason: RefundReason,
    ) -> Result<ProviderRefund, ProviderError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let id = self.next_id("re");
        let mut state = self.state.lock().unwrap();
        let amount = state
            .payment_intents
            .iter()
            .find(|(pi, _)| pi == payment_intent_id)
            .map(|(_, amount)| *amount)
            .unwrap_or_default();
        let refund = ProviderRefund {
            id,
            amount,
            status: "succeeded".to_string(),
            payment_intent_id: payment_intent_id.to_string(),
        };
        state.refunds.push(refund.clone());
        Ok(refund)
    }

    async fn create_payout(
        &self,
        _account_id: &str,
        amount: UsdAmount,
        _metadata: &GatewayMetadata,
    ) -> Result<ProviderPayout, ProviderError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(ProviderPayout { id: self.next_id("po"), amount })
    }

    async fn create_transfer(
        &self,
        amount: UsdAmount,
        destination_account_id: &str,
        _metadata: &GatewayMetadata,
    ) -> Result<ProviderTransfer, ProviderError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(ProviderTransfer { id: self.next_id("tr"), amount, destination: destination_account_id.to_string() })
    }
}
