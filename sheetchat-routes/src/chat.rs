use std::sync::Arc;

use anyhow::Context as _;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use sheetchat_core::{ApiError, AuthUser, Data};
use sheetchat_database::impls::chat::{
    insert_chat_message, list_session_messages, resolve_chat_session,
};
use sheetchat_database::impls::datasets::find_visible_dataset;
use sheetchat_database::impls::rate_limit::chat_within_limit;
use sheetchat_database::impls::records::{count_records, sample_record_payloads};
use sheetchat_database::model::chat::ChatRole;
use sheetchat_database::model::dataset::Dataset;
use sheetchat_llm::DatasetContext;
use sheetchat_utils::parse::non_empty_trimmed;

use crate::RouteMeta;
use crate::extract::{CurrentUser, ValidJson};

pub const META: &[RouteMeta] = &[
    RouteMeta {
        method: "GET",
        path: "/chat",
        desc: "Latest chat session for a dataset and its messages.",
    },
    RouteMeta {
        method: "POST",
        path: "/chat",
        desc: "Ask the assistant a question about a dataset.",
    },
];

pub fn router() -> Router<Arc<Data>> {
    Router::new().route("/chat", get(history).post(ask))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryQuery {
    dataset_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AskBody {
    pub dataset_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[validate(length(min = 1))]
    pub message: String,
}

async fn history(
    State(data): State<Arc<Data>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(raw_id) = non_empty_trimmed(query.dataset_id.as_deref()) else {
        return Err(ApiError::BadRequest("datasetId is required".to_owned()));
    };

    let dataset = visible_dataset(&data, raw_id, &user).await?;

    let session =
        resolve_chat_session(&data.db, user.id, dataset.id, &session_title(&dataset), None)
            .await?;

    let messages = list_session_messages(&data.db, session.id).await?;

    Ok(Json(json!({ "sessionId": session.id, "messages": messages })))
}

async fn ask(
    State(data): State<Arc<Data>>,
    CurrentUser(user): CurrentUser,
    ValidJson(body): ValidJson<AskBody>,
) -> Result<Json<Value>, ApiError> {
    let question = body.message.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Message is required".to_owned()));
    }

    let dataset = visible_dataset(&data, &body.dataset_id, &user).await?;

    match chat_within_limit(&data.db, user.id).await {
        Ok(true) => {}
        Ok(false) => {
            info!(user_id = %user.id, "chat rate limit exceeded");
            return Err(ApiError::TooManyRequests);
        }
        Err(err) => warn!(?err, user_id = %user.id, "chat rate limit check failed; allowing request"),
    }

    let requested = body
        .session_id
        .as_deref()
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok());
    let session = resolve_chat_session(
        &data.db,
        user.id,
        dataset.id,
        &session_title(&dataset),
        requested,
    )
    .await?;

    insert_chat_message(&data.db, session.id, ChatRole::User, question).await?;

    let Some(llm) = data.llm.as_ref() else {
        return Err(ApiError::ServiceUnavailable(
            "Assistant is not configured".to_owned(),
        ));
    };

    let sample_cap = data.settings.prompt_sample_rows;
    let total_rows = count_records(&data.db, dataset.id).await?;
    let sample_rows = sample_record_payloads(&data.db, dataset.id, sample_cap).await?;

    let context = DatasetContext {
        name: &dataset.name,
        total_rows,
        sample_cap,
        sample_rows: &sample_rows,
    };

    let reply = llm
        .answer_dataset_question(&context, question)
        .await
        .with_context(|| format!("{} provider failed to answer", llm.provider_name()))?;

    insert_chat_message(&data.db, session.id, ChatRole::Assistant, &reply).await?;

    info!(
        session_id = %session.id,
        dataset_id = %dataset.id,
        provider = llm.provider_name(),
        reply_chars = reply.len(),
        "assistant replied"
    );

    let messages = list_session_messages(&data.db, session.id).await?;

    Ok(Json(json!({ "sessionId": session.id, "messages": messages })))
}

async fn visible_dataset(
    data: &Data,
    raw_id: &str,
    user: &AuthUser,
) -> Result<Dataset, ApiError> {
    let dataset_id = Uuid::parse_str(raw_id.trim()).map_err(|_| ApiError::NotFound)?;

    find_visible_dataset(&data.db, dataset_id, user.viewer())
        .await?
        .ok_or(ApiError::NotFound)
}

fn session_title(dataset: &Dataset) -> String {
    format!("Chat about {}", dataset.name)
}
