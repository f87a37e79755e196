//! Normalization of payment-provider failures.
//!
//! The provider SDK reports failures as loosely typed error objects with a `type` discriminator.
//! Everything that leaves the gateway carries a [`NormalizedError`] instead: a stable snake-case
//! code, the HTTP status a presentation layer should answer with, and a message. Mapping happens
//! exactly once, here; nothing downstream re-wraps gateway errors.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::provider::ProviderError;

/// Stable, provider-agnostic error codes.
///
/// The first seven are produced by [`map_provider_error`]; the rest are domain codes raised by
/// gateway validations and surfaced by presentation layers through [`ErrorCode::friendly_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    CardDeclined,
    InvalidRequest,
    ApiError,
    NetworkError,
    AuthError,
    RateLimit,
    UnknownError,
    InsufficientFunds,
    ExpiredCard,
    IncorrectCvc,
    IncorrectNumber,
    InvalidExpiryMonth,
    InvalidExpiryYear,
    ProcessingError,
    InvalidAmount,
    AuthenticationFailure,
    BalanceInsufficient,
    RefundAlreadyIssued,
    RefundWindowExpired,
    PayoutBelowMinimum,
    StripeConnectNotActive,
    NegativeBalance,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            CardDeclined => "card_declined",
            InvalidRequest => "invalid_request",
            ApiError => "api_error",
            NetworkError => "network_error",
            AuthError => "auth_error",
            RateLimit => "rate_limit",
            UnknownError => "unknown_error",
            InsufficientFunds => "insufficient_funds",
            ExpiredCard => "expired_card",
            IncorrectCvc => "incorrect_cvc",
            IncorrectNumber => "incorrect_number",
            InvalidExpiryMonth => "invalid_expiry_month",
            InvalidExpiryYear => "invalid_expiry_year",
            ProcessingError => "processing_error",
            InvalidAmount => "invalid_amount",
            AuthenticationFailure => "authentication_failure",
            BalanceInsufficient => "balance_insufficient",
            RefundAlreadyIssued => "refund_already_issued",
            RefundWindowExpired => "refund_window_expired",
            PayoutBelowMinimum => "payout_below_minimum",
            StripeConnectNotActive => "stripe_connect_not_active",
            NegativeBalance => "negative_balance",
        }
    }

    /// The HTTP status a presentation layer should answer with for this code.
    pub fn http_status(&self) -> u16 {
        use ErrorCode::*;
        match self {
            CardDeclined => 402,
            InvalidRequest => 400,
            ApiError => 500,
            NetworkError => 503,
            AuthError => 401,
            RateLimit => 429,
            UnknownError => 500,
            // Card-decline flavors answer like a declined card
            InsufficientFunds | ExpiredCard | IncorrectCvc | IncorrectNumber | InvalidExpiryMonth
            | InvalidExpiryYear | ProcessingError | AuthenticationFailure => 402,
            InvalidAmount | BalanceInsufficient | RefundAlreadyIssued | RefundWindowExpired
            | PayoutBelowMinimum | StripeConnectNotActive | NegativeBalance => 400,
        }
    }

    /// Whether a caller may retry the failed call. Card declines and validation flavors must
    /// never be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::NetworkError | ErrorCode::RateLimit | ErrorCode::ApiError)
    }

    /// The canonical user-facing string for this code. Presentation layers reuse this verbatim.
    pub fn friendly_message(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            CardDeclined => "Your card was declined. Please try a different payment method.",
            InvalidRequest => "The payment request was invalid. Please check the details and try again.",
            ApiError => "The payment service hit an internal error. Please try again shortly.",
            NetworkError => "We could not reach the payment service. Please try again in a moment.",
            AuthError => "We could not authenticate with the payment service. Please contact support.",
            RateLimit => "Too many payment requests. Please wait a moment and try again.",
            UnknownError => "Something went wrong while processing the payment. Please try again.",
            InsufficientFunds => "Your card has insufficient funds.",
            ExpiredCard => "Your card has expired. Please use a different card.",
            IncorrectCvc => "The card's security code is incorrect.",
            IncorrectNumber => "The card number is incorrect.",
            InvalidExpiryMonth => "The card's expiration month is invalid.",
            InvalidExpiryYear => "The card's expiration year is invalid.",
            ProcessingError => "An error occurred while processing your card. Please try again.",
            InvalidAmount => "The payment amount is invalid.",
            AuthenticationFailure => "Payment authentication failed. Please try again.",
            BalanceInsufficient => "The account balance is too low to complete this transfer.",
            RefundAlreadyIssued => "A refund has already been issued for this payment.",
            RefundWindowExpired => "The refund window for this payment has expired.",
            PayoutBelowMinimum => "The payout amount is below the minimum allowed.",
            StripeConnectNotActive => "The payout account has not finished onboarding yet.",
            NegativeBalance => "The account balance is negative. Payouts are paused until it is settled.",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A provider failure after normalization. The `code` and `http_status` are stable and preserved
/// end-to-end; `message` is informational.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} ({code})")]
pub struct NormalizedError {
    pub code: ErrorCode,
    pub http_status: u16,
    pub message: String,
}

impl NormalizedError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, http_status: code.http_status(), message: message.into() }
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

/// Translates a raw provider failure into the normalized taxonomy.
///
/// Pure and total: unrecognized or missing discriminators fall back to `unknown_error`. The
/// match is on the trailing token of the provider type, so `StripeCardError` and plain
/// `CardError` both map to `card_declined`.
pub fn map_provider_error(err: &ProviderError) -> NormalizedError {
    let code = match err.error_type.as_deref() {
        Some(t) if t.ends_with("CardError") => ErrorCode::CardDeclined,
        Some(t) if t.ends_with("InvalidRequestError") => ErrorCode::InvalidRequest,
        Some(t) if t.ends_with("ConnectionError") => ErrorCode::NetworkError,
        Some(t) if t.ends_with("APIError") => ErrorCode::ApiError,
        Some(t) if t.ends_with("AuthenticationError") => ErrorCode::AuthError,
        Some(t) if t.ends_with("RateLimitError") => ErrorCode::RateLimit,
        _ => ErrorCode::UnknownError,
    };
    let message =
        if err.message.is_empty() { err.error_type.clone().unwrap_or_else(|| code.friendly_message().to_string()) } else { err.message.clone() };
    NormalizedError { code, http_status: code.http_status(), message }
}
