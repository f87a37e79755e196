//! Media Licensing Engine
//!
//! The core bookkeeping service for the media licensing marketplace: businesses license media
//! assets individually or through revenue-sharing collections (pools), and this crate owns the
//! ledger-like accounting that those licensing events and their refunds drive.
//!
//! The library is divided into four main sections:
//! 1. Domain types and storage ([`db_types`], [`mod@traits`], `sqlite`). SQLite is the supported
//!    backend; you should never need to touch SQL directly. The storage traits in [`mod@traits`]
//!    define what any backend must provide, and [`SqliteDatabase`] implements them.
//! 2. The engine public API ([`EarningsApi`] and [`RefundApi`]). `EarningsApi` applies completed
//!    licensing transactions to a collection's revenue pool and answers earnings-breakdown
//!    queries. `RefundApi` reconciles refunds: it calls the payment gateway, flips the
//!    transaction state, and adjusts the payer and payee balances.
//! 3. The payment gateway facade ([`mod@gateway`]). A narrow, injected interface over the Stripe
//!    SDK that validates inputs and normalizes every provider failure into a stable error
//!    taxonomy exactly once.
//! 4. Event hooks ([`mod@events`]). A small actor-style pub-sub layer so other components can
//!    react when earnings are recorded or a transaction is refunded.
pub mod db_types;
pub mod events;
pub mod gateway;
pub mod ledger;
mod mle_api;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use mle_api::{
    collection_objects::PoolEarnings,
    earnings_api::{EarningsApi, MAX_EARNINGS_ATTEMPTS},
    errors::{PoolEarningsError, RefundError, ValidationError},
    refund_api::{RefundApi, RefundOutcome},
};
