//! Read-only projections of collection earnings.

use mlm_common::UsdAmount;
use serde::{Deserialize, Serialize};

use crate::db_types::{Collection, CollectionId, MemberEarning};

/// The earnings breakdown for a collection. A snapshot; holding one does not track later updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolEarnings {
    pub collection_id: CollectionId,
    pub collection_name: String,
    pub total_revenue: UsdAmount,
    pub total_licenses: i64,
    pub member_earnings: Vec<MemberEarning>,
    pub member_count: usize,
}

impl From<Collection> for PoolEarnings {
    fn from(collection: Collection) -> Self {
        let member_count = collection.member_earnings.len();
        Self {
            collection_id: collection.id,
            collection_name: collection.name,
            total_revenue: collection.total_revenue,
            total_licenses: collection.total_licenses,
            member_earnings: collection.member_earnings,
            member_count,
        }
    }
}
