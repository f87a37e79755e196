//! The StripeService-shaped gateway facade.
//!
//! [`StripeGateway`] is what the rest of the system calls. Each operation validates its inputs
//! before touching the provider, and every provider failure crosses [`map_provider_error`]
//! exactly once on the way out. The gateway performs no retries; retryable codes are a signal
//! for the caller.

use std::env;

use log::{info, warn};
use mlm_common::{helpers::env_flag, Secret, UsdAmount};
use thiserror::Error;

use super::{
    error_map::{map_provider_error, ErrorCode, NormalizedError},
    provider::{
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
    },
};
use crate::db_types::BusinessId;

/// The provider rejects payouts under this amount.
pub const MIN_PAYOUT: UsdAmount = UsdAmount::from_cents(100);

//--------------------------------------    StripeConfig     ---------------------------------------------------------

/// Gateway configuration, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    /// The provider API key. Redacted in all log output.
    pub secret_key: Secret<String>,
    /// Base URL of the merchant frontend, used to build Connect onboarding return links.
    pub frontend_url: Option<String>,
    /// Whether this process talks to the live provider environment.
    pub live_mode: bool,
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self { secret_key: Secret::new(secret_key.into()), frontend_url: None, live_mode: false }
    }

    pub fn with_frontend_url(mut self, url: impl Into<String>) -> Self {
        self.frontend_url = Some(url.into());
        self
    }

    /// Reads configuration from the environment (`MLM_STRIPE_SECRET_KEY`, `MLM_FRONTEND_URL`,
    /// `MLM_GATEWAY_LIVE`), loading a `.env` file first if one is present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let secret_key = env::var("MLM_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("💳️ MLM_STRIPE_SECRET_KEY is not set. Gateway calls will be rejected by the provider.");
            String::default()
        });
        let frontend_url = env::var("MLM_FRONTEND_URL").ok().map(|u| u.trim_end_matches('/').to_string());
        let live_mode = env_flag("MLM_GATEWAY_LIVE", false);
        info!("💳️ Gateway configured. live_mode={live_mode}, frontend_url={frontend_url:?}");
        Self { secret_key: Secret::new(secret_key), frontend_url, live_mode }
    }
}

//--------------------------------------    GatewayError     ---------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// A normalized provider failure, or a gateway-side validation expressed in the same
    /// taxonomy. The code and status survive end-to-end.
    #[error("{0}")]
    Stripe(NormalizedError),
    /// The gateway itself is misconfigured. Not a provider failure and never retryable.
    #[error("Gateway configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Stripe(e) => e.code.as_str(),
            GatewayError::Configuration(_) => "configuration_error",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            GatewayError::Stripe(e) => e.http_status,
            GatewayError::Configuration(_) => 500,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Stripe(e) => e.is_retryable(),
            GatewayError::Configuration(_) => false,
        }
    }
}

impl From<ProviderError> for GatewayError {
    fn from(e: ProviderError) -> Self {
        GatewayError::Stripe(map_provider_error(&e))
    }
}

fn rejected(code: ErrorCode, message: impl Into<String>) -> GatewayError {
    GatewayError::Stripe(NormalizedError::new(code, message))
}

//--------------------------------------    StripeGateway    ---------------------------------------------------------

/// The narrow gateway the marketplace consumes. Construct one per process and pass it into
/// whatever needs it; there is no ambient provider handle.
#[derive(Debug, Clone)]
pub struct StripeGateway<C> {
    client: C,
    config: StripeConfig,
}

impl<C> StripeGateway<C> {
    pub fn new(client: C, config: StripeConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }
}

impl<C> StripeGateway<C>
where C: StripeApiClient
{
    /// Creates a provider customer for a business.
    pub async fn create_customer(
        &self,
        business_id: &BusinessId,
        email: &str,
    ) -> Result<ProviderCustomer, GatewayError> {
        if email.trim().is_empty() {
            return Err(rejected(ErrorCode::InvalidRequest, "An email address is required to create a customer"));
        }
        Ok(self.client.create_customer(business_id, email).await?)
    }

    /// Attaches a payment method to an existing customer.
    pub async fn create_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<ProviderPaymentMethod, GatewayError> {
        Ok(self.client.attach_payment_method(payment_method_id, customer_id).await?)
    }

    pub async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        metadata: &GatewayMetadata,
    ) -> Result<ProviderSubscription, GatewayError> {
        Ok(self.client.create_subscription(customer_id, price_id, metadata).await?)
    }

    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<ProviderSubscription, GatewayError> {
        Ok(self.client.cancel_subscription(subscription_id).await?)
    }

    /// Creates a Connect sub-account through which a business can be paid.
    pub async fn create_connect_account(&self, business_id: &BusinessId) -> Result<ProviderAccount, GatewayError> {
        Ok(self.client.create_connect_account(business_id).await?)
    }

    /// Builds an onboarding link for a Connect account. The refresh/return URLs are derived from
    /// the configured frontend base URL.
    pub async fn create_account_link(
        &self,
        account_id: &str,
        business_id: &BusinessId,
    ) -> Result<ProviderAccountLink, GatewayError> {
        let base = self.config.frontend_url.as_deref().ok_or_else(|| {
            GatewayError::Configuration(
                "MLM_FRONTEND_URL is not set; cannot build Connect onboarding links".to_string(),
            )
        })?;
        let refresh_url = format!("{base}/connect/{business_id}/refresh");
        let return_url = format!("{base}/connect/{business_id}/complete");
        Ok(self.client.create_account_link(account_id, &refresh_url, &return_url).await?)
    }

    /// True iff the provider reports the account has submitted its details and can take charges.
    pub async fn is_account_active(&self, account_id: &str) -> Result<bool, GatewayError> {
        let account = self.client.fetch_account(account_id).await?;
        Ok(account.details_submitted && account.charges_enabled)
    }

    /// Creates a payment intent for `amount` against a customer.
    pub async fn create_payment_intent(
        &self,
        amount: UsdAmount,
        customer_id: &str,
        metadata: &GatewayMetadata,
    ) -> Result<ProviderPaymentIntent, GatewayError> {
        if amount.value() <= 0 {
            return Err(rejected(ErrorCode::InvalidAmount, format!("Payment amount must be positive, got {amount}")));
        }
        Ok(self.client.create_payment_intent(amount, customer_id, metadata).await?)
    }

    /// Creates a charge routed directly to a connected sub-account.
    pub async fn create_destination_charge(
        &self,
        amount: UsdAmount,
        customer_id: &str,
        destination_account_id: &str,
        metadata: &GatewayMetadata,
    ) -> Result<ProviderPaymentIntent, GatewayError> {
        if amount.value() <= 0 {
            return Err(rejected(ErrorCode::InvalidAmount, format!("Charge amount must be positive, got {amount}")));
        }
        if destination_account_id.trim().is_empty() {
            return Err(rejected(ErrorCode::InvalidRequest, "A destination account is required for a destination charge"));
        }
        Ok(self.client.create_destination_charge(amount, customer_id, destination_account_id, metadata).await?)
    }

    /// Creates a refund against a payment intent. The reason defaults to
    /// `requested_by_customer` when the caller does not supply one.
    pub async fn create_refund(
        &self,
        payment_intent_id: &str,
        reason: Option<RefundReason>,
    ) -> Result<ProviderRefund, GatewayError> {
        if payment_intent_id.trim().is_empty() {
            return Err(rejected(ErrorCode::InvalidRequest, "A payment intent id is required to create a refund"));
        }
        let reason = reason.unwrap_or(RefundReason::RequestedByCustomer);
        Ok(self.client.create_refund(payment_intent_id, reason).await?)
    }

    /// Pays a business out from its connected account balance.
    pub async fn create_payout(
        &self,
        account_id: &str,
        amount: UsdAmount,
        metadata: &GatewayMetadata,
    ) -> Result<ProviderPayout, GatewayError> {
        if account_id.trim().is_empty() {
            return Err(rejected(ErrorCode::InvalidRequest, "An account id is required to create a payout"));
        }
        if amount.value() <= 0 {
            return Err(rejected(ErrorCode::InvalidAmount, format!("Payout amount must be positive, got {amount}")));
        }
        if amount < MIN_PAYOUT {
            return Err(rejected(
                ErrorCode::PayoutBelowMinimum,
                format!("Payout amount {amount} is below the provider minimum of {MIN_PAYOUT}"),
            ));
        }
        Ok(self.client.create_payout(account_id, amount, metadata).await?)
    }

    /// Moves funds to a connected account.
    pub async fn create_transfer(
        &self,
        amount: UsdAmount,
        destination_account_id: &str,
        metadata: &GatewayMetadata,
    ) -> Result<ProviderTransfer, GatewayError> {
        if amount.value() <= 0 {
            return Err(rejected(ErrorCode::InvalidAmount, format!("Transfer amount must be positive, got {amount}")));
        }
        if destination_account_id.trim().is_empty() {
            return Err(rejected(ErrorCode::InvalidRequest, "A destination account is required for a transfer"));
        }
        Ok(self.client.create_transfer(amount, destination_account_id, metadata).await?)
    }
}
