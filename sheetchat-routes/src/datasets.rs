use std::sync::Arc;

use anyhow::Context as _;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use uuid::Uuid;

use sheetchat_core::{ApiError, Data};
use sheetchat_database::impls::datasets::{
    create_dataset_with_records, find_visible_dataset, list_recent_datasets,
};
use sheetchat_database::impls::records::{count_records, list_records_page};
use sheetchat_database::model::dataset::NewDataset;
use sheetchat_database::model::record::NewRecord;
use sheetchat_ingest::parse_workbook;
use sheetchat_utils::pagination::{PageRequest, clamp_limit, total_pages};
use sheetchat_utils::parse::non_empty_trimmed;

use crate::RouteMeta;
use crate::extract::CurrentUser;

pub const META: &[RouteMeta] = &[
    RouteMeta {
        method: "POST",
        path: "/datasets/upload",
        desc: "Upload a spreadsheet and store its rows.",
    },
    RouteMeta {
        method: "GET",
        path: "/datasets",
        desc: "Most recent datasets of the requester.",
    },
    RouteMeta {
        method: "GET",
        path: "/datasets/{id}/rows",
        desc: "One page of a dataset's rows.",
    },
];

const DEFAULT_LIST_LIMIT: u32 = 5;
const MAX_LIST_LIMIT: u32 = 100;
/// Headroom for multipart boundaries and the small text fields around the file.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;
const UNTITLED_DATASET: &str = "Untitled dataset";
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

pub fn router(max_upload_bytes: usize) -> Router<Arc<Data>> {
    Router::new()
        .route(
            "/datasets/upload",
            post(upload).layer(DefaultBodyLimit::max(
                max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
            )),
        )
        .route("/datasets", get(list))
        .route("/datasets/{id}/rows", get(rows))
}

struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

async fn upload(
    State(data): State<Arc<Data>>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let max_upload_bytes = data.settings.max_upload_bytes;
    let mut file: Option<UploadedFile> = None;
    let mut name: Option<String> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart field: {e}")))?
    {
        let field_name = field.name().unwrap_or_default().to_owned();

        match field_name.as_str() {
            "file" => {
                // A plain text part named `file` is not an upload.
                let Some(filename) = field.file_name().map(str::to_owned) else {
                    debug!("ignoring `file` field without a filename");
                    continue;
                };
                let content_type = field.content_type().map(str::to_owned);
                let mut bytes = Vec::new();

                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file chunk: {e}")))?
                {
                    bytes.extend_from_slice(&chunk);

                    if bytes.len() > max_upload_bytes {
                        return Err(ApiError::BadRequest("File too large".to_owned()));
                    }
                }

                file = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes,
                });
            }
            "name" => {
                name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Failed to read name: {e}")))?,
                );
            }
            other => debug!(field = other, "ignoring multipart field"),
        }
    }

    let Some(file) = file else {
        return Err(ApiError::BadRequest("No file provided".to_owned()));
    };

    let size_bytes = file.bytes.len() as u64;
    let bytes = file.bytes;
    let parsed = tokio::task::spawn_blocking(move || parse_workbook(&bytes))
        .await
        .context("workbook parsing task failed")?;

    let rows = match parsed {
        Ok(rows) => rows,
        Err(err) => {
            warn!(?err, user_id = %user.id, "rejected unreadable workbook");
            return Err(ApiError::BadRequest(
                "Could not read the uploaded file as a spreadsheet.".to_owned(),
            ));
        }
    };

    if rows.is_empty() {
        return Err(ApiError::BadRequest("No data rows found in file.".to_owned()));
    }

    let dataset_name = non_empty_trimmed(name.as_deref())
        .or_else(|| non_empty_trimmed(Some(&file.filename)))
        .unwrap_or(UNTITLED_DATASET)
        .to_owned();

    let new_dataset = NewDataset {
        user_id: user.id,
        name: dataset_name,
        filename: file.filename,
        size_bytes,
        mime_type: non_empty_trimmed(file.content_type.as_deref())
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_owned(),
    };

    let records: Vec<NewRecord> = rows
        .into_iter()
        .map(|row| NewRecord {
            index: row.index,
            data: row.data,
        })
        .collect();

    let dataset = create_dataset_with_records(
        &data.db,
        &new_dataset,
        &records,
        data.settings.insert_batch_size,
    )
    .await?;

    info!(
        dataset_id = %dataset.id,
        user_id = %user.id,
        row_count = dataset.row_count,
        size_bytes,
        "dataset ingested"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "datasetId": dataset.id, "dataset": dataset })),
    ))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<String>,
}

async fn list(
    State(data): State<Arc<Data>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = clamp_limit(query.limit.as_deref(), DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let datasets = list_recent_datasets(&data.db, user.id, limit).await?;

    Ok(Json(json!({ "datasets": datasets })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RowsQuery {
    page: Option<String>,
    page_size: Option<String>,
}

async fn rows(
    State(data): State<Arc<Data>>,
    CurrentUser(user): CurrentUser,
    Path(raw_id): Path<String>,
    Query(query): Query<RowsQuery>,
) -> Result<Json<Value>, ApiError> {
    let dataset_id = Uuid::parse_str(&raw_id).map_err(|_| ApiError::NotFound)?;

    let dataset = find_visible_dataset(&data.db, dataset_id, user.viewer())
        .await?
        .ok_or(ApiError::NotFound)?;

    let page = PageRequest::from_query(
        query.page.as_deref(),
        query.page_size.as_deref(),
        data.settings.default_page_size,
        data.settings.max_page_size,
    );

    let total_count = count_records(&data.db, dataset.id).await?;
    let rows = list_records_page(&data.db, dataset.id, page.offset(), page.limit()).await?;

    Ok(Json(json!({
        "dataset": dataset,
        "rows": rows,
        "page": page.page,
        "pageSize": page.page_size,
        "totalCount": total_count,
        "totalPages": total_pages(total_count, page.page_size),
    })))
}
