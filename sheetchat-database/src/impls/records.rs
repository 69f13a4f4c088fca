use std::time::Duration;

use anyhow::Context as _;
use serde_json::{Map, Value};
use sqlx::PgConnection;
use sqlx::types::Json;
use uuid::Uuid;

use crate::cache::dataset_sample_key;
use crate::database::Database;
use crate::model::record::{DatasetRecord, NewRecord};

/// Rows never change after ingestion, so the sample can live for a while.
const SAMPLE_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: i64,
    row_index: i64,
    data: Json<Map<String, Value>>,
}

/// Insert one chunk of records with a single statement.
///
/// Payloads travel as text and are cast to `json` server-side so key order survives.
pub(crate) async fn insert_record_batch(
    conn: &mut PgConnection,
    dataset_id: Uuid,
    records: &[NewRecord],
) -> anyhow::Result<()> {
    let mut indices = Vec::with_capacity(records.len());
    let mut payloads = Vec::with_capacity(records.len());

    for record in records {
        indices.push(i64::try_from(record.index).context("record index out of i64 range")?);
        payloads.push(serde_json::to_string(&record.data).context("failed to encode record")?);
    }

    sqlx::query(
        "INSERT INTO records (dataset_id, row_index, data)
         SELECT $1, batch.row_index, batch.data::json
         FROM UNNEST($2::bigint[], $3::text[]) AS batch (row_index, data)",
    )
    .bind(dataset_id)
    .bind(indices)
    .bind(payloads)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn count_records(db: &Database, dataset_id: Uuid) -> anyhow::Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE dataset_id = $1")
        .bind(dataset_id)
        .fetch_one(db.pool())
        .await?;

    u64::try_from(count).context("record count out of u64 range")
}

/// One page of a dataset's rows in display order.
pub async fn list_records_page(
    db: &Database,
    dataset_id: Uuid,
    offset: u64,
    limit: u32,
) -> anyhow::Result<Vec<DatasetRecord>> {
    let offset_i64 = i64::try_from(offset).context("offset out of i64 range")?;

    let rows: Vec<RecordRow> = sqlx::query_as(
        "SELECT id, row_index, data
         FROM records
         WHERE dataset_id = $1
         ORDER BY row_index ASC
         OFFSET $2
         LIMIT $3",
    )
    .bind(dataset_id)
    .bind(offset_i64)
    .bind(i64::from(limit))
    .fetch_all(db.pool())
    .await?;

    rows.into_iter().map(to_record).collect()
}

/// Payloads of the first `limit` rows of a dataset, served from cache when possible.
pub async fn sample_record_payloads(
    db: &Database,
    dataset_id: Uuid,
    limit: u32,
) -> anyhow::Result<Vec<Map<String, Value>>> {
    let key = dataset_sample_key(db.cache(), dataset_id, limit);

    db.cache()
        .get_or_load_json(&key, SAMPLE_CACHE_TTL, || async {
            let records = list_records_page(db, dataset_id, 0, limit).await?;
            Ok(records.into_iter().map(|record| record.data).collect())
        })
        .await
}

fn to_record(row: RecordRow) -> anyhow::Result<DatasetRecord> {
    Ok(DatasetRecord {
        id: row.id,
        index: u64::try_from(row.row_index).context("row_index row out of u64 range")?,
        data: row.data.0,
    })
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::{count_records, list_records_page, sample_record_payloads};
    use crate::database::Database;
    use crate::impls::test_support::{payload, seed_dataset, seed_user};

    #[sqlx::test(migrator = "crate::MIGRATOR")]
    async fn pages_walk_the_rows_without_gaps(pool: PgPool) {
        let db = Database::new(pool);
        let user = seed_user(&db, "ada@example.com").await;
        let dataset = seed_dataset(&db, user, 7).await;
        let page_size = 3_u32;

        let mut seen = Vec::new();
        for page in 1..=4_u64 {
            let offset = (page - 1) * u64::from(page_size);
            let rows = list_records_page(&db, dataset.id, offset, page_size).await.unwrap();

            let remaining = 7_u64.saturating_sub(offset);
            assert_eq!(rows.len() as u64, remaining.min(u64::from(page_size)));
            assert_eq!(count_records(&db, dataset.id).await.unwrap(), 7);

            seen.extend(rows.into_iter().map(|record| record.index));
        }

        assert_eq!(seen, (0..7).collect::<Vec<u64>>());
    }

    #[sqlx::test(migrator = "crate::MIGRATOR")]
    async fn sample_is_the_earliest_rows(pool: PgPool) {
        let db = Database::new(pool);
        let user = seed_user(&db, "ada@example.com").await;
        let dataset = seed_dataset(&db, user, 5).await;

        let sample = sample_record_payloads(&db, dataset.id, 2).await.unwrap();

        assert_eq!(sample, [payload(0), payload(1)]);
    }
}
