use chrono::{DateTime, Utc};
use log::trace;
use mlm_common::UsdAmount;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{
        BusinessId,
        Collection,
        CollectionId,
        EarningsCredit,
        MediaId,
        MemberEarning,
        NewCollection,
        PoolType,
        RevenueSharingModel,
    },
    traits::{CollectionApiError, MarketplaceDbError},
};

/// The raw `collections` row; the sharing model is JSON text and the member/media/earnings rows
/// live in their own tables.
#[derive(Debug, Clone, FromRow)]
struct CollectionRow {
    id: CollectionId,
    name: String,
    pool_type: PoolType,
    owner_id: BusinessId,
    revenue_sharing_model: String,
    total_revenue: UsdAmount,
    total_licenses: i64,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn decode_sharing_model(raw: &str, id: &CollectionId) -> Result<RevenueSharingModel, MarketplaceDbError> {
    serde_json::from_str(raw)
        .map_err(|e| MarketplaceDbError::DecodeError(format!("sharing model of collection {id}: {e}")))
}

pub async fn insert_collection(
    collection: NewCollection,
    conn: &mut SqliteConnection,
) -> Result<(), CollectionApiError> {
    let id = collection.id.clone();
    let model = serde_json::to_string(&collection.revenue_sharing_model)
        .map_err(|e| CollectionApiError::DatabaseError(format!("sharing model encode: {e}")))?;
    sqlx::query(
        r#"
            INSERT INTO collections (id, name, pool_type, owner_id, revenue_sharing_model)
            VALUES ($1, $2, $3, $4, $5);
        "#,
    )
    .bind(&collection.id)
    .bind(&collection.name)
    .bind(collection.pool_type)
    .bind(&collection.owner_id)
    .bind(model)
    .execute(&mut *conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => CollectionApiError::CollectionAlreadyExists(id),
        _ => CollectionApiError::from(e),
    })?;
    for member in collection.members() {
        sqlx::query("INSERT INTO collection_members (collection_id, business_id) VALUES ($1, $2);")
            .bind(&collection.id)
            .bind(member)
            .execute(&mut *conn)
            .await?;
    }
    for media in &collection.media_assets {
        sqlx::query("INSERT INTO collection_media (collection_id, media_id) VALUES ($1, $2);")
            .bind(&collection.id)
            .bind(media)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Fetches a collection with its members, media and earnings rows resolved, all in insertion
/// order.
pub async fn fetch_collection(
    id: &CollectionId,
    conn: &mut SqliteConnection,
) -> Result<Option<Collection>, MarketplaceDbError> {
    let row: Option<CollectionRow> = sqlx::query_as(
        r#"
            SELECT * FROM collections WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };

    let member_businesses: Vec<BusinessId> =
        sqlx::query_scalar("SELECT business_id FROM collection_members WHERE collection_id = $1 ORDER BY id;")
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;
    let media_assets: Vec<MediaId> =
        sqlx::query_scalar("SELECT media_id FROM collection_media WHERE collection_id = $1 ORDER BY id;")
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;
    let member_earnings: Vec<MemberEarning> = sqlx::query_as(
        r#"
            SELECT business_id, total_earned, license_count, contribution_percent
            FROM member_earnings WHERE collection_id = $1 ORDER BY id;
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let revenue_sharing_model = decode_sharing_model(&row.revenue_sharing_model, id)?;
    Ok(Some(Collection {
        id: row.id,
        name: row.name,
        pool_type: row.pool_type,
        owner_id: row.owner_id,
        member_businesses,
        media_assets,
        revenue_sharing_model,
        total_revenue: row.total_revenue,
        total_licenses: row.total_licenses,
        member_earnings,
        version: row.version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

/// One optimistic attempt to apply an earnings credit.
///
/// Reads the current document, applies the credit to the snapshot, and writes the new totals
/// guarded by a version compare-and-swap, together with the member-earnings upsert. All of it
/// must run on a transaction connection so the CAS and the upsert land or roll back together.
///
/// Returns `Ok(None)` when another writer bumped the version first.
pub async fn try_record_earnings(
    credit: &EarningsCredit,
    conn: &mut SqliteConnection,
) -> Result<Option<Collection>, MarketplaceDbError> {
    let collection = fetch_collection(&credit.collection_id, &mut *conn)
        .await?
        .ok_or_else(|| MarketplaceDbError::CollectionNotFound(credit.collection_id.clone()))?;

    let mut updated = collection.clone();
    updated.apply_credit(credit);

    let result = sqlx::query(
        r#"
            UPDATE collections
            SET total_revenue = $1,
                total_licenses = $2,
                version = version + 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND version = $4;
        "#,
    )
    .bind(updated.total_revenue)
    .bind(updated.total_licenses)
    .bind(&credit.collection_id)
    .bind(collection.version)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        trace!("🏦️ Version check lost for collection {}, expected v{}", credit.collection_id, collection.version);
        return Ok(None);
    }

    let member = updated
        .member(&credit.business_id)
        .ok_or_else(|| MarketplaceDbError::DatabaseError("member entry missing after credit".to_string()))?;
    sqlx::query(
        r#"
            INSERT INTO member_earnings (collection_id, business_id, total_earned, license_count, contribution_percent)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (collection_id, business_id) DO UPDATE SET
                total_earned = excluded.total_earned,
                license_count = excluded.license_count,
                contribution_percent = excluded.contribution_percent;
        "#,
    )
    .bind(&credit.collection_id)
    .bind(&member.business_id)
    .bind(member.total_earned)
    .bind(member.license_count)
    .bind(member.contribution_percent)
    .execute(&mut *conn)
    .await?;

    updated.version = collection.version + 1;
    Ok(Some(updated))
}
