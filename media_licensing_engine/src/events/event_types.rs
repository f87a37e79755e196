use mlm_common::UsdAmount;

use crate::db_types::{BusinessId, CollectionId, Transaction, TransactionId};

/// Emitted after an earnings update has been durably applied to a collection.
#[derive(Debug, Clone)]
pub struct EarningsRecordedEvent {
    pub collection_id: CollectionId,
    pub business_id: BusinessId,
    pub transaction_id: TransactionId,
    /// The creator share this event added to the pool.
    pub amount: UsdAmount,
    /// The pool's total revenue after the update.
    pub total_revenue: UsdAmount,
}

/// Emitted after a refund has been confirmed by the gateway and the transaction marked refunded.
#[derive(Debug, Clone)]
pub struct TransactionRefundedEvent {
    pub transaction: Transaction,
    pub refund_id: String,
    pub amount: UsdAmount,
}

impl TransactionRefundedEvent {
    pub fn new(transaction: Transaction, refund_id: String, amount: UsdAmount) -> Self {
        Self { transaction, refund_id, amount }
    }
}
