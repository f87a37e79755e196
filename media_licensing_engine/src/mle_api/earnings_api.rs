use std::{fmt::Debug, time::Duration};

use log::*;
use rand::Rng;

use crate::{
    db_types::{Collection, CollectionId, EarningsCredit, Transaction},
    events::{EarningsRecordedEvent, EventProducers},
    mle_api::{
        collection_objects::PoolEarnings,
        errors::{PoolEarningsError, ValidationError},
    },
    traits::MarketplaceDatabase,
};

/// How many optimistic attempts an earnings update gets before the conflict surfaces.
pub const MAX_EARNINGS_ATTEMPTS: u32 = 3;

/// `EarningsApi` is the primary API for pool earnings bookkeeping: it applies completed licensing
/// transactions to a collection's revenue pool and answers earnings-breakdown queries.
pub struct EarningsApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for EarningsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EarningsApi")
    }
}

impl<B> EarningsApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> EarningsApi<B>
where B: MarketplaceDatabase
{
    /// Applies one completed licensing transaction to the collection's revenue pool.
    ///
    /// Validation runs first, in a fixed order, and the first failing check wins; a transaction
    /// that fails validation mutates nothing. Once validated, the totals and the member entry
    /// are written as one atomic, version-guarded update. Concurrent updates against the same
    /// collection are retried internally up to [`MAX_EARNINGS_ATTEMPTS`] times before the
    /// conflict is surfaced.
    ///
    /// Returns the updated collection.
    pub async fn update_earnings(
        &self,
        collection: &Collection,
        transaction: &Transaction,
    ) -> Result<Collection, PoolEarningsError> {
        let credit = earnings_credit(collection, transaction)?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.db.try_record_earnings(&credit).await? {
                Some(updated) => {
                    debug!(
                        "🏦️📈️ Credited {} to member {} of pool {}. Pool total is now {}",
                        credit.amount, credit.business_id, credit.collection_id, updated.total_revenue
                    );
                    self.call_earnings_recorded_hook(&updated, &credit).await;
                    return Ok(updated);
                },
                None if attempt < MAX_EARNINGS_ATTEMPTS => {
                    let jitter: u32 = rand::thread_rng().gen_range(5..25);
                    let backoff = Duration::from_millis(u64::from(attempt * jitter));
                    debug!(
                        "🏦️📈️ Concurrent update on pool {} beat attempt {attempt}. Retrying in {backoff:?}",
                        credit.collection_id
                    );
                    tokio::time::sleep(backoff).await;
                },
                None => {
                    warn!(
                        "🏦️📈️ Gave up on earnings update for pool {} after {attempt} contended attempts",
                        credit.collection_id
                    );
                    return Err(PoolEarningsError::Conflict { attempts: attempt });
                },
            }
        }
    }

    /// Fetches the earnings breakdown for a collection. Read-only; mutates nothing.
    pub async fn get_pool_earnings(&self, collection_id: &CollectionId) -> Result<PoolEarnings, PoolEarningsError> {
        let collection = self
            .db
            .fetch_collection(collection_id)
            .await?
            .ok_or_else(|| PoolEarningsError::CollectionNotFound(collection_id.clone()))?;
        trace!("🏦️🔎️ Earnings breakdown for pool {collection_id}: {} members", collection.member_earnings.len());
        Ok(PoolEarnings::from(collection))
    }

    async fn call_earnings_recorded_hook(&self, updated: &Collection, credit: &EarningsCredit) {
        for emitter in &self.producers.earnings_recorded_producer {
            trace!("🏦️📈️ Notifying earnings-recorded hook subscribers");
            let event = EarningsRecordedEvent {
                collection_id: credit.collection_id.clone(),
                business_id: credit.business_id.clone(),
                transaction_id: credit.transaction_id.clone(),
                amount: credit.amount,
                total_revenue: updated.total_revenue,
            };
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

/// Validates a transaction against its target collection and extracts the earnings credit.
///
/// Checks run in order and the first failure wins:
/// 1. the creator share must not be negative,
/// 2. the metadata must carry a `collectionId`,
/// 3. that `collectionId` must match the target collection (prevents cross-pool corruption),
/// 4. a member business must be derivable from the payee or the metadata's `businessId`.
fn earnings_credit(collection: &Collection, tx: &Transaction) -> Result<EarningsCredit, ValidationError> {
    if tx.creator_share.value() < 0 {
        return Err(ValidationError::InvalidCreatorShare);
    }
    let collection_id = tx.metadata.collection_id.as_ref().ok_or(ValidationError::MissingCollectionId)?;
    if collection_id.as_str() != collection.id.as_str() {
        return Err(ValidationError::CollectionIdMismatch);
    }
    let business_id = tx.member_business_id().ok_or(ValidationError::MissingPayee)?;
    Ok(EarningsCredit {
        collection_id: collection_id.clone(),
        business_id: business_id.clone(),
        amount: tx.creator_share,
        contribution_percent: tx.metadata.contribution_percent,
        transaction_id: tx.id.clone(),
    })
}

#[cfg(test)]
mod test {
    use mlm_common::UsdAmount;

    use super::earnings_credit;
    use crate::{
        db_types::{
            BusinessId,
            Collection,
            CollectionId,
            PoolType,
            RevenueSharingModel,
            Transaction,
            TransactionMetadata,
            TransactionStatus,
        },
        mle_api::errors::ValidationError,
    };

    fn collection(id: &str) -> Collection {
        Collection {
            id: CollectionId::from(id),
            name: "Pool".to_string(),
            pool_type: PoolType::Competitive,
            owner_id: BusinessId::from("owner"),
            member_businesses: vec![BusinessId::from("owner")],
            media_assets: vec![],
            revenue_sharing_model: RevenueSharingModel::default(),
            total_revenue: UsdAmount::ZERO,
            total_licenses: 0,
            member_earnings: vec![],
            version: 0,
            created_at: Default::default(),
            updated_at: Default::default(),
        }
    }

    fn transaction(creator_share_cents: i64, metadata: TransactionMetadata, payee: Option<&str>) -> Transaction {
        Transaction {
            id: "txn-1".into(),
            status: TransactionStatus::Completed,
            payer: Some(BusinessId::from("payer")),
            payee: payee.map(BusinessId::from),
            gross_amount: UsdAmount::from_cents(10_000),
            creator_share: UsdAmount::from_cents(creator_share_cents),
            stripe_payment_intent_id: Some("pi_1".to_string()),
            stripe_refund_id: None,
            refunded_at: None,
            metadata,
            created_at: Default::default(),
            updated_at: Default::default(),
        }
    }

    #[test]
    fn a_negative_creator_share_fails_before_anything_else() {
        // Metadata is missing too; the share check still wins.
        let tx = transaction(-1, TransactionMetadata::default(), None);
        let err = earnings_credit(&collection("col-1"), &tx).unwrap_err();
        assert_eq!(err, ValidationError::InvalidCreatorShare);
    }

    #[test]
    fn a_missing_collection_id_fails_before_the_mismatch_check() {
        let tx = transaction(100, TransactionMetadata::default(), Some("payee"));
        let err = earnings_credit(&collection("col-1"), &tx).unwrap_err();
        assert_eq!(err, ValidationError::MissingCollectionId);
    }

    #[test]
    fn a_mismatched_collection_id_is_rejected() {
        let metadata = TransactionMetadata::for_collection(CollectionId::from("someone-elses-pool"));
        let tx = transaction(100, metadata, Some("payee"));
        let err = earnings_credit(&collection("col-1"), &tx).unwrap_err();
        assert_eq!(err, ValidationError::CollectionIdMismatch);
    }

    #[test]
    fn a_missing_member_business_is_rejected() {
        let metadata = TransactionMetadata::for_collection(CollectionId::from("col-1"));
        let tx = transaction(100, metadata, None);
        let err = earnings_credit(&collection("col-1"), &tx).unwrap_err();
        assert_eq!(err, ValidationError::MissingPayee);
    }

    #[test]
    fn the_payee_wins_over_the_metadata_business() {
        let metadata = TransactionMetadata::for_collection(CollectionId::from("col-1"))
            .with_business(BusinessId::from("from-metadata"))
            .with_contribution_percent(40.0);
        let tx = transaction(8228, metadata, Some("the-payee"));
        let credit = earnings_credit(&collection("col-1"), &tx).unwrap();
        assert_eq!(credit.business_id, BusinessId::from("the-payee"));
        assert_eq!(credit.amount.value(), 8228);
        assert_eq!(credit.contribution_percent, Some(40.0));
    }

    #[test]
    fn a_zero_share_is_valid() {
        let metadata = TransactionMetadata::for_collection(CollectionId::from("col-1"));
        let tx = transaction(0, metadata, Some("payee"));
        assert!(earnings_credit(&collection("col-1"), &tx).is_ok());
    }
}
