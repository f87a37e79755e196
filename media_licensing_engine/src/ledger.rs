//! Balance arithmetic applied to business accounts when money moves.
//!
//! The structs here compute *what* to apply; the storage layer applies each side as its own
//! atomic increment. The two sides of an adjustment are deliberately independent single-row
//! updates, not a cross-row transaction: the payment processor is the source of truth for money
//! movement and this ledger only mirrors it.

use mlm_common::UsdAmount;

use crate::db_types::{BusinessId, Transaction};

/// One signed balance delta for one business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDelta {
    pub business_id: BusinessId,
    pub amount: UsdAmount,
}

impl BalanceDelta {
    pub fn new(business_id: BusinessId, amount: UsdAmount) -> Self {
        Self { business_id, amount }
    }
}

/// The two-sided `revenue_balance` adjustment for a refunded transaction.
///
/// The payer gets the full gross amount back; the payee's previously credited creator share is
/// clawed back. Either side may be absent on the transaction, in which case that side is skipped.
/// There is no floor: a clawback may push the payee's balance negative, mirroring the
/// provider-side clawback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundAdjustments {
    pub payer_credit: Option<BalanceDelta>,
    pub payee_debit: Option<BalanceDelta>,
}

impl RefundAdjustments {
    pub fn for_transaction(tx: &Transaction) -> Self {
        Self {
            payer_credit: tx.payer.clone().map(|id| BalanceDelta::new(id, tx.gross_amount)),
            payee_debit: tx.payee.clone().map(|id| BalanceDelta::new(id, -tx.creator_share)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.payer_credit.is_none() && self.payee_debit.is_none()
    }
}

/// The balance effects of a completed charge, applied once when the checkout flow settles a
/// transaction: the payer's `total_spent` grows by the gross amount, and the payee's
/// `revenue_balance` and `total_earnings` grow by the creator share.
///
/// The refund clawback in [`RefundAdjustments`] debits the same stored `creator_share` this
/// settlement credited, so the two always cancel exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeSettlement {
    pub payer_spent: Option<BalanceDelta>,
    pub payee_credit: Option<BalanceDelta>,
}

impl ChargeSettlement {
    pub fn for_transaction(tx: &Transaction) -> Self {
        Self {
            payer_spent: tx.payer.clone().map(|id| BalanceDelta::new(id, tx.gross_amount)),
            payee_credit: tx.payee.clone().map(|id| BalanceDelta::new(id, tx.creator_share)),
        }
    }
}

#[cfg(test)]
mod test {
    use mlm_common::UsdAmount;

    use super::*;
    use crate::db_types::{Transaction, TransactionMetadata, TransactionStatus};

    fn transaction(payer: Option<&str>, payee: Option<&str>) -> Transaction {
        Transaction {
            id: "txn-1".into(),
            status: TransactionStatus::Completed,
            payer: payer.map(BusinessId::from),
            payee: payee.map(BusinessId::from),
            gross_amount: UsdAmount::from_cents(10_000),
            creator_share: UsdAmount::from_cents(8228),
            stripe_payment_intent_id: Some("pi_123".to_string()),
            stripe_refund_id: None,
            refunded_at: None,
            metadata: TransactionMetadata::default(),
            created_at: Default::default(),
            updated_at: Default::default(),
        }
    }

    #[test]
    fn refund_returns_gross_to_payer_and_claws_back_the_share() {
        let adj = RefundAdjustments::for_transaction(&transaction(Some("payer"), Some("payee")));
        assert_eq!(adj.payer_credit, Some(BalanceDelta::new("payer".into(), UsdAmount::from_cents(10_000))));
        assert_eq!(adj.payee_debit, Some(BalanceDelta::new("payee".into(), UsdAmount::from_cents(-8228))));
    }

    #[test]
    fn absent_parties_are_skipped() {
        let adj = RefundAdjustments::for_transaction(&transaction(None, Some("payee")));
        assert!(adj.payer_credit.is_none());
        assert!(adj.payee_debit.is_some());

        let adj = RefundAdjustments::for_transaction(&transaction(None, None));
        assert!(adj.is_empty());
    }

    #[test]
    fn settlement_and_refund_cancel_for_the_payee() {
        let tx = transaction(Some("payer"), Some("payee"));
        let settle = ChargeSettlement::for_transaction(&tx);
        let refund = RefundAdjustments::for_transaction(&tx);
        let credited = settle.payee_credit.unwrap().amount;
        let clawed_back = refund.payee_debit.unwrap().amount;
        assert_eq!(credited + clawed_back, UsdAmount::ZERO);
    }
}
