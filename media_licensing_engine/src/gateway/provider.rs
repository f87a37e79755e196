//! The raw provider contract: what an SDK-backed client must implement.
//!
//! These types mirror the subset of the provider's objects the marketplace cares about. Client
//! implementations own their HTTP stack and timeouts; every failure is reported as a
//! [`ProviderError`], which the gateway normalizes before anything else sees it.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use mlm_common::UsdAmount;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{BusinessId, ConversionError};

/// Provider metadata: string keys and values, attached to charges and transfers.
pub type GatewayMetadata = BTreeMap<String, String>;

/// A failure reported by the provider SDK. `error_type` is the provider's discriminator
/// (e.g. `StripeCardError`) when one was supplied.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ProviderError {
    pub error_type: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self { error_type: Some(error_type.into()), message: message.into() }
    }

    pub fn untyped(message: impl Into<String>) -> Self {
        Self { error_type: None, message: message.into() }
    }
}

//--------------------------------------  Provider objects   ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCustomer {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderPaymentMethod {
    pub id: String,
    pub customer_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSubscription {
    pub id: String,
    pub customer_id: String,
    pub status: String,
}

/// A connected sub-account representing a payable business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderAccount {
    pub id: String,
    pub details_submitted: bool,
    pub charges_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderAccountLink {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderPaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount: UsdAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRefund {
    pub id: String,
    pub amount: UsdAmount,
    pub status: String,
    pub payment_intent_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderPayout {
    pub id: String,
    pub amount: UsdAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTransfer {
    pub id: String,
    pub amount: UsdAmount,
    pub destination: String,
}

//--------------------------------------    RefundReason     ---------------------------------------------------------

/// The refund reasons the provider accepts. Anything else is rejected at the parsing boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    Duplicate,
    Fraudulent,
    RequestedByCustomer,
}

impl RefundReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundReason::Duplicate => "duplicate",
            RefundReason::Fraudulent => "fraudulent",
            RefundReason::RequestedByCustomer => "requested_by_customer",
        }
    }
}

impl Display for RefundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RefundReason {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "duplicate" => Ok(Self::Duplicate),
            "fraudulent" => Ok(Self::Fraudulent),
            "requested_by_customer" => Ok(Self::RequestedByCustomer),
            s => Err(ConversionError(format!("Invalid refund reason: {s}"))),
        }
    }
}

//--------------------------------------   StripeApiClient   ---------------------------------------------------------

/// Raw provider operations, one method per call the marketplace makes.
///
/// Implementations wrap the real SDK (or an in-memory double) and must bound every call with a
/// timeout; a timed-out call fails with a connection-flavored [`ProviderError`] so that it
/// normalizes to `network_error`.
#[allow(async_fn_in_trait)]
pub trait StripeApiClient {
    async fn create_customer(&self, business_id: &BusinessId, email: &str) -> Result<ProviderCustomer, ProviderError>;

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<ProviderPaymentMethod, ProviderError>;

    async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        metadata: &GatewayMetadata,
    ) -> Result<ProviderSubscription, ProviderError>;

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<ProviderSubscription, ProviderError>;

    async fn create_connect_account(&self, business_id: &BusinessId) -> Result<ProviderAccount, ProviderError>;

    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<ProviderAccountLink, ProviderError>;

    async fn fetch_account(&self, account_id: &str) -> Result<ProviderAccount, ProviderError>;

    async fn create_payment_intent(
        &self,
        amount: UsdAmount,
        customer_id: &str,
        metadata: &GatewayMetadata,
    ) -> Result<ProviderPaymentIntent, ProviderError>;

    async fn create_destination_charge(
        &self,
        amount: UsdAmount,
        customer_id: &str,
        destination_account_id: &str,
        metadata: &GatewayMetadata,
    ) -> Result<ProviderPaymentIntent, ProviderError>;

    async fn create_refund(&self, payment_intent_id: &str, reason: RefundReason)
        -> Result<ProviderRefund, ProviderError>;

    async fn create_payout(
        &self,
        account_id: &str,
        amount: UsdAmount,
        metadata: &GatewayMetadata,
    ) -> Result<ProviderPayout, ProviderError>;

    async fn create_transfer(
        &self,
        amount: UsdAmount,
        destination_account_id: &str,
        metadata: &GatewayMetadata,
    ) -> Result<ProviderTransfer, ProviderError>;
}

#[cfg(test)]
mod test {
    use super::RefundReason;

    #[test]
    fn refund_reasons_round_trip_and_reject_unknowns() {
        for reason in [RefundReason::Duplicate, RefundReason::Fraudulent, RefundReason::RequestedByCustomer] {
            assert_eq!(reason.as_str().parse::<RefundReason>().unwrap(), reason);
        }
        assert!("buyer_remorse".parse::<RefundReason>().is_err());
    }
}
