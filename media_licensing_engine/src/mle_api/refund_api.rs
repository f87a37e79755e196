use std::fmt::Debug;

use log::*;
use mlm_common::UsdAmount;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{TransactionId, TransactionStatus},
    events::{EventProducers, TransactionRefundedEvent},
    gateway::{RefundReason, StripeApiClient, StripeGateway},
    ledger::RefundAdjustments,
    mle_api::errors::RefundError,
    traits::MarketplaceDatabase,
};

/// What a successful refund returns to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundOutcome {
    pub refund_id: String,
    pub amount: UsdAmount,
    pub transaction_id: TransactionId,
    pub status: TransactionStatus,
}

/// `RefundApi` reconciles refunds: it validates the transaction state, asks the gateway to
/// create the refund, flips the transaction to `refunded`, and applies the balance adjustments
/// to the payer and payee.
pub struct RefundApi<B, C> {
    db: B,
    gateway: StripeGateway<C>,
    producers: EventProducers,
}

impl<B, C> Debug for RefundApi<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RefundApi")
    }
}

impl<B, C> RefundApi<B, C> {
    pub fn new(db: B, gateway: StripeGateway<C>, producers: EventProducers) -> Self {
        Self { db, gateway, producers }
    }
}

impl<B, C> RefundApi<B, C>
where
    B: MarketplaceDatabase,
    C: StripeApiClient,
{
    /// Refunds a completed transaction.
    ///
    /// The side effects are strictly ordered: the gateway refund is created first, the
    /// transaction is marked `refunded` only after the gateway confirms, and balances are
    /// adjusted only after the transaction is durably marked. A crash between the last two steps
    /// leaves a refunded transaction with stale balances for a reconciliation job to repair,
    /// never a double refund.
    ///
    /// Gateway failures are surfaced as-is, already normalized, and leave the transaction in
    /// `completed` state; there is no retry at this layer.
    pub async fn process_refund(
        &self,
        transaction_id: &TransactionId,
        reason: Option<RefundReason>,
    ) -> Result<RefundOutcome, RefundError> {
        let transaction = self
            .db
            .fetch_transaction(transaction_id)
            .await?
            .ok_or_else(|| RefundError::TransactionNotFound(transaction_id.clone()))?;

        if transaction.status != TransactionStatus::Completed {
            debug!("🔄️💸️ Refusing to refund {transaction_id}: status is {}", transaction.status);
            return Err(RefundError::InvalidStatus(transaction.status));
        }
        let payment_intent_id =
            transaction.stripe_payment_intent_id.as_deref().ok_or(RefundError::NoPaymentIntent)?;

        let refund = self.gateway.create_refund(payment_intent_id, reason).await?;
        trace!("🔄️💸️ Gateway confirmed refund {} for {transaction_id}", refund.id);

        let transaction = self.db.mark_transaction_refunded(transaction_id, &refund.id).await?;
        let adjustments = RefundAdjustments::for_transaction(&transaction);
        self.db.apply_refund_adjustments(&adjustments).await?;
        debug!(
            "🔄️💸️ Refund {} complete: returned {} to the payer, clawed back {} from the payee",
            refund.id, transaction.gross_amount, transaction.creator_share
        );

        self.call_transaction_refunded_hook(&transaction, &refund.id, refund.amount).await;
        Ok(RefundOutcome {
            refund_id: refund.id,
            amount: refund.amount,
            transaction_id: transaction.id.clone(),
            status: transaction.status,
        })
    }

    async fn call_transaction_refunded_hook(
        &self,
        transaction: &crate::db_types::Transaction,
        refund_id: &str,
        amount: UsdAmount,
    ) {
        for emitter in &self.producers.transaction_refunded_producer {
            trace!("🔄️💸️ Notifying transaction-refunded hook subscribers");
            let event = TransactionRefundedEvent::new(transaction.clone(), refund_id.to_string(), amount);
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn gateway(&self) -> &StripeGateway<C> {
        &self.gateway
    }
}
