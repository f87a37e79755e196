//! # Payment gateway facade
//!
//! A narrow interface over the Stripe SDK. The engine never talks to the provider directly:
//! a [`StripeApiClient`] implementation (the real SDK client, or [`mock::MockStripeClient`] in
//! tests) is constructed once at process startup and injected into [`StripeGateway`], which adds
//! the input validations every operation requires and normalizes provider failures into the
//! stable [`NormalizedError`] taxonomy exactly once.
//!
//! Timeouts are owned by the client implementation: a call that times out fails with a
//! connection-flavored provider error and surfaces here as a `network_error`.
mod error_map;
pub mod mock;
mod provider;
mod stripe;

pub use error_map::{map_provider_error, ErrorCode, NormalizedError};
pub use provider::{
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
pub use stripe::{GatewayError, StripeConfig, StripeGateway, MIN_PAYOUT};
