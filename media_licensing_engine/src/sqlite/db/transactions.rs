use chrono::{DateTime, Utc};
use mlm_common::UsdAmount;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{BusinessId, NewTransaction, Transaction, TransactionId, TransactionMetadata, TransactionStatus},
    traits::MarketplaceDbError,
};

/// The raw row shape; `metadata` is JSON text until [`TryFrom`] parses it.
#[derive(Debug, Clone, FromRow)]
struct TransactionRow {
    id: TransactionId,
    status: TransactionStatus,
    payer_id: Option<BusinessId>,
    payee_id: Option<BusinessId>,
    gross_amount: UsdAmount,
    creator_share: UsdAmount,
    stripe_payment_intent_id: Option<String>,
    stripe_refund_id: Option<String>,
    refunded_at: Option<DateTime<Utc>>,
    metadata: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = MarketplaceDbError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let metadata: TransactionMetadata = serde_json::from_str(&row.metadata)
            .map_err(|e| MarketplaceDbError::DecodeError(format!("metadata of transaction {}: {e}", row.id)))?;
        Ok(Transaction {
            id: row.id,
            status: row.status,
            payer: row.payer_id,
            payee: row.payee_id,
            gross_amount: row.gross_amount,
            creator_share: row.creator_share,
            stripe_payment_intent_id: row.stripe_payment_intent_id,
            stripe_refund_id: row.stripe_refund_id,
            refunded_at: row.refunded_at,
            metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn encode_metadata(metadata: &TransactionMetadata) -> Result<String, MarketplaceDbError> {
    serde_json::to_string(metadata).map_err(|e| MarketplaceDbError::DecodeError(format!("metadata encode: {e}")))
}

/// Stores a new charge in `pending` state. A duplicate id is an error.
pub async fn insert_transaction(
    transaction: NewTransaction,
    conn: &mut SqliteConnection,
) -> Result<Transaction, MarketplaceDbError> {
    let id = transaction.id.clone();
    let metadata = encode_metadata(&transaction.metadata)?;
    let row: TransactionRow = sqlx::query_as(
        r#"
            INSERT INTO transactions (id, payer_id, payee_id, gross_amount, creator_share, stripe_payment_intent_id, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(transaction.id)
    .bind(transaction.payer)
    .bind(transaction.payee)
    .bind(transaction.gross_amount)
    .bind(transaction.creator_share)
    .bind(transaction.stripe_payment_intent_id)
    .bind(metadata)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => MarketplaceDbError::TransactionAlreadyExists(id),
        _ => MarketplaceDbError::from(e),
    })?;
    Transaction::try_from(row)
}

pub async fn fetch_transaction_by_id(
    id: &TransactionId,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, MarketplaceDbError> {
    let row: Option<TransactionRow> = sqlx::query_as(
        r#"
            SELECT * FROM transactions WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    row.map(Transaction::try_from).transpose()
}

/// Moves a `pending` transaction to `completed`. The status guard lives in the statement, so a
/// transaction in any other state fails without a read-check race.
pub async fn mark_completed(
    id: &TransactionId,
    conn: &mut SqliteConnection,
) -> Result<Transaction, MarketplaceDbError> {
    let row: Option<TransactionRow> = sqlx::query_as(
        r#"
            UPDATE transactions
            SET status = 'completed', updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    match row {
        Some(row) => Transaction::try_from(row),
        None => Err(MarketplaceDbError::StatusUpdateError(format!("Transaction {id} is not pending"))),
    }
}

/// Moves a `completed` transaction to `refunded`, recording the gateway refund id and timestamp.
/// The guard in the statement makes a concurrent double refund lose cleanly.
pub async fn mark_refunded(
    id: &TransactionId,
    refund_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Transaction, MarketplaceDbError> {
    let row: Option<TransactionRow> = sqlx::query_as(
        r#"
            UPDATE transactions
            SET status = 'refunded',
                stripe_refund_id = $1,
                refunded_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = 'completed'
            RETURNING *;
        "#,
    )
    .bind(refund_id)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    match row {
        Some(row) => Transaction::try_from(row),
        None => Err(MarketplaceDbError::StatusUpdateError(format!("Transaction {id} is not completed"))),
    }
}
