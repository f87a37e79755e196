use log::warn;
use mlm_common::UsdAmount;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Business, BusinessId, NewBusiness},
    ledger::{ChargeSettlement, RefundAdjustments},
    traits::{BusinessApiError, MarketplaceDbError},
};

pub async fn insert_business(
    business: NewBusiness,
    conn: &mut SqliteConnection,
) -> Result<Business, BusinessApiError> {
    let id = business.id.clone();
    let business = sqlx::query_as(
        r#"
            INSERT INTO businesses (id, email) VALUES ($1, $2)
            RETURNING *;
        "#,
    )
    .bind(business.id)
    .bind(business.email)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => BusinessApiError::BusinessAlreadyExists(id),
        _ => BusinessApiError::from(e),
    })?;
    Ok(business)
}

pub async fn fetch_business_by_id(
    id: &BusinessId,
    conn: &mut SqliteConnection,
) -> Result<Option<Business>, BusinessApiError> {
    let business = sqlx::query_as(
        r#"
            SELECT * FROM businesses WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(business)
}

/// Atomically shifts a business's withdrawable balance by `delta` (negative for clawbacks).
/// Balances have no floor; a clawback may push one negative.
pub async fn adjust_revenue_balance(
    id: &BusinessId,
    delta: UsdAmount,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceDbError> {
    let result = sqlx::query(
        r#"UPDATE businesses SET
       revenue_balance = revenue_balance + $1,
       updated_at = CURRENT_TIMESTAMP
       WHERE id = $2
       "#,
    )
    .bind(delta)
    .bind(id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        // The business row is owned externally; a missing row is logged, not fatal, so the
        // other side of the adjustment still lands.
        warn!("🏦️ No business {id} to adjust balance by {delta}. Skipping this side.");
    }
    Ok(())
}

/// Credits a payee for a settled charge: the creator share lands in both the withdrawable
/// balance and the lifetime earnings, in one statement.
pub async fn credit_settlement_to_payee(
    id: &BusinessId,
    share: UsdAmount,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceDbError> {
    let result = sqlx::query(
        r#"UPDATE businesses SET
       revenue_balance = revenue_balance + $1,
       total_earnings = total_earnings + $1,
       updated_at = CURRENT_TIMESTAMP
       WHERE id = $2
       "#,
    )
    .bind(share)
    .bind(id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        warn!("🏦️ No payee {id} to credit settlement of {share}.");
    }
    Ok(())
}

/// Records what a payer spent on a settled charge.
pub async fn record_spend_for_payer(
    id: &BusinessId,
    gross: UsdAmount,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceDbError> {
    let result = sqlx::query(
        r#"UPDATE businesses SET
       total_spent = total_spent + $1,
       updated_at = CURRENT_TIMESTAMP
       WHERE id = $2
       "#,
    )
    .bind(gross)
    .bind(id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        warn!("🏦️ No payer {id} to record spend of {gross}.");
    }
    Ok(())
}

/// Applies a settlement's two sides. Callers that need atomicity with a status change should
/// pass a transaction connection.
pub async fn apply_settlement(
    settlement: &ChargeSettlement,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceDbError> {
    if let Some(spent) = &settlement.payer_spent {
        record_spend_for_payer(&spent.business_id, spent.amount, &mut *conn).await?;
    }
    if let Some(credit) = &settlement.payee_credit {
        credit_settlement_to_payee(&credit.business_id, credit.amount, &mut *conn).await?;
    }
    Ok(())
}

/// Applies the two sides of a refund adjustment as independent increments (deliberately not a
/// database transaction).
pub async fn apply_refund_adjustments(
    adjustments: &RefundAdjustments,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceDbError> {
    if let Some(credit) = &adjustments.payer_credit {
        adjust_revenue_balance(&credit.business_id, credit.amount, &mut *conn).await?;
    }
    if let Some(debit) = &adjustments.payee_debit {
        adjust_revenue_balance(&debit.business_id, debit.amount, &mut *conn).await?;
    }
    Ok(())
}
