//! # Engine public API
//!
//! The function-call contracts the marketplace's controllers consume:
//!
//! * [`earnings_api::EarningsApi`] applies completed licensing transactions to a collection's
//!   revenue pool and answers earnings-breakdown queries.
//! * [`refund_api::RefundApi`] reconciles a refund across the payment gateway, the transaction
//!   record and the payer/payee balances.
//!
//! Both APIs return structured success values or one of the error types in [`errors`]; no wire
//! format is prescribed here.
pub mod collection_objects;
pub mod earnings_api;
pub mod errors;
pub mod refund_api;
