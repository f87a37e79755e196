//! # Storage contracts
//!
//! This module defines the interface contracts that database backends of the engine implement.
//!
//! ## Accounts and pools
//! A business is the billing entity that pays for licenses and receives creator shares; a
//! collection is the revenue pool that aggregates licensing earnings across member businesses.
//!
//! ## Traits
//! * [`BusinessManagement`] creates and queries businesses.
//! * [`CollectionManagement`] creates and queries collections, including their earnings rows.
//! * [`MarketplaceDatabase`] is the top-level contract: transaction lifecycle, the
//!   optimistic-concurrency earnings write, and the balance adjustments that refunds and
//!   settlements drive.
mod business_management;
mod collection_management;
mod marketplace_database;

pub use business_management::{BusinessApiError, BusinessManagement};
pub use collection_management::{CollectionApiError, CollectionManagement};
pub use marketplace_database::{MarketplaceDatabase, MarketplaceDbError};
