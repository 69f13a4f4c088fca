use anyhow::Context as _;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::database::Database;
use crate::impls::records::insert_record_batch;
use crate::model::dataset::{Dataset, NewDataset, Viewer};
use crate::model::record::NewRecord;

#[derive(sqlx::FromRow)]
struct DatasetRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    filename: String,
    size_bytes: i64,
    mime_type: String,
    row_count: i64,
    created_at: DateTime<Utc>,
}

/// Persist a dataset and all of its rows.
///
/// The dataset row goes in first, then the records in `batch_size` chunks so no
/// single statement grows unbounded. Everything shares one transaction: a failing
/// chunk leaves neither the dataset nor any of its rows behind.
pub async fn create_dataset_with_records(
    db: &Database,
    dataset: &NewDataset,
    records: &[NewRecord],
    batch_size: usize,
) -> anyhow::Result<Dataset> {
    let size_bytes_i64 = i64::try_from(dataset.size_bytes).context("size_bytes out of i64 range")?;
    let row_count_i64 = i64::try_from(records.len()).context("row_count out of i64 range")?;

    let mut tx = db
        .pool()
        .begin()
        .await
        .context("failed to open ingestion transaction")?;

    let row: DatasetRow = sqlx::query_as(
        "INSERT INTO datasets (id, user_id, name, filename, size_bytes, mime_type, row_count)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING id, user_id, name, filename, size_bytes, mime_type, row_count, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(dataset.user_id)
    .bind(&dataset.name)
    .bind(&dataset.filename)
    .bind(size_bytes_i64)
    .bind(&dataset.mime_type)
    .bind(row_count_i64)
    .fetch_one(&mut *tx)
    .await
    .context("failed to insert dataset")?;

    for (batch_number, chunk) in records.chunks(batch_size.max(1)).enumerate() {
        insert_record_batch(&mut tx, row.id, chunk)
            .await
            .with_context(|| format!("failed to insert record batch {batch_number}"))?;
        debug!(dataset_id = %row.id, batch_number, rows = chunk.len(), "record batch inserted");
    }

    tx.commit()
        .await
        .context("failed to commit ingestion transaction")?;

    to_dataset(row)
}

/// Fetch a dataset if `viewer` owns it or is an admin.
pub async fn find_visible_dataset(
    db: &Database,
    dataset_id: Uuid,
    viewer: Viewer,
) -> anyhow::Result<Option<Dataset>> {
    let row: Option<DatasetRow> = sqlx::query_as(
        "SELECT id, user_id, name, filename, size_bytes, mime_type, row_count, created_at
         FROM datasets
         WHERE id = $1 AND ($2 OR user_id = $3)",
    )
    .bind(dataset_id)
    .bind(viewer.is_admin)
    .bind(viewer.user_id)
    .fetch_optional(db.pool())
    .await?;

    row.map(to_dataset).transpose()
}

/// Most recently created datasets owned by `user_id`, newest first.
pub async fn list_recent_datasets(
    db: &Database,
    user_id: Uuid,
    limit: u32,
) -> anyhow::Result<Vec<Dataset>> {
    let rows: Vec<DatasetRow> = sqlx::query_as(
        "SELECT id, user_id, name, filename, size_bytes, mime_type, row_count, created_at
         FROM datasets
         WHERE user_id = $1
         ORDER BY created_at DESC, id DESC
         LIMIT $2",
    )
    .bind(user_id)
    .bind(i64::from(limit))
    .fetch_all(db.pool())
    .await?;

    rows.into_iter().map(to_dataset).collect()
}

fn to_dataset(row: DatasetRow) -> anyhow::Result<Dataset> {
    Ok(Dataset {
        id: row.id,
        user_id: row.user_id,
        name: row.name,
        filename: row.filename,
        size_bytes: u64::try_from(row.size_bytes).context("size_bytes row out of u64 range")?,
        mime_type: row.mime_type,
        row_count: u64::try_from(row.row_count).context("row_count row out of u64 range")?,
        created_at: row.created_at,
    })
}
