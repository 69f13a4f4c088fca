use anyhow::Context as _;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::database::Database;
use crate::model::chat::{ChatMessage, ChatRole, ChatSession};

#[derive(sqlx::FromRow)]
struct ChatSessionRow {
    id: Uuid,
    user_id: Uuid,
    dataset_id: Uuid,
    title: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ChatMessageRow {
    id: i64,
    session_id: Uuid,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}

/// Look up a session by id, but only if it belongs to `user_id` and is bound to `dataset_id`.
pub async fn find_owned_session(
    db: &Database,
    session_id: Uuid,
    user_id: Uuid,
    dataset_id: Uuid,
) -> anyhow::Result<Option<ChatSession>> {
    let row: Option<ChatSessionRow> = sqlx::query_as(
        "SELECT id, user_id, dataset_id, title, created_at
         FROM chat_sessions
         WHERE id = $1 AND user_id = $2 AND dataset_id = $3",
    )
    .bind(session_id)
    .bind(user_id)
    .bind(dataset_id)
    .fetch_optional(db.pool())
    .await?;

    Ok(row.map(to_session))
}

/// The user's most recently created session for a dataset.
pub async fn latest_session(
    db: &Database,
    user_id: Uuid,
    dataset_id: Uuid,
) -> anyhow::Result<Option<ChatSession>> {
    let row: Option<ChatSessionRow> = sqlx::query_as(
        "SELECT id, user_id, dataset_id, title, created_at
         FROM chat_sessions
         WHERE user_id = $1 AND dataset_id = $2
         ORDER BY created_at DESC, id DESC
         LIMIT 1",
    )
    .bind(user_id)
    .bind(dataset_id)
    .fetch_optional(db.pool())
    .await?;

    Ok(row.map(to_session))
}

/// Pick the session a chat request continues.
///
/// An explicitly requested session is used only when it belongs to `user_id` and
/// is bound to `dataset_id`; otherwise the user's latest session for the dataset
/// is reused, and a new one titled `title` is opened when none exists.
pub async fn resolve_chat_session(
    db: &Database,
    user_id: Uuid,
    dataset_id: Uuid,
    title: &str,
    requested: Option<Uuid>,
) -> anyhow::Result<ChatSession> {
    if let Some(session_id) = requested {
        if let Some(session) = find_owned_session(db, session_id, user_id, dataset_id).await? {
            return Ok(session);
        }
    }

    if let Some(session) = latest_session(db, user_id, dataset_id).await? {
        return Ok(session);
    }

    let session = create_session(db, user_id, dataset_id, title).await?;
    info!(session_id = %session.id, %dataset_id, "chat session opened");
    Ok(session)
}

pub async fn create_session(
    db: &Database,
    user_id: Uuid,
    dataset_id: Uuid,
    title: &str,
) -> anyhow::Result<ChatSession> {
    let row: ChatSessionRow = sqlx::query_as(
        "INSERT INTO chat_sessions (id, user_id, dataset_id, title)
         VALUES ($1, $2, $3, $4)
         RETURNING id, user_id, dataset_id, title, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(dataset_id)
    .bind(title)
    .fetch_one(db.pool())
    .await?;

    Ok(to_session(row))
}

pub async fn insert_chat_message(
    db: &Database,
    session_id: Uuid,
    role: ChatRole,
    content: &str,
) -> anyhow::Result<ChatMessage> {
    let row: ChatMessageRow = sqlx::query_as(
        "INSERT INTO chat_messages (session_id, role, content)
         VALUES ($1, $2, $3)
         RETURNING id, session_id, role, content, created_at",
    )
    .bind(session_id)
    .bind(role.as_str())
    .bind(content)
    .fetch_one(db.pool())
    .await?;

    to_message(row)
}

/// Full history of a session, oldest first.
pub async fn list_session_messages(
    db: &Database,
    session_id: Uuid,
) -> anyhow::Result<Vec<ChatMessage>> {
    let rows: Vec<ChatMessageRow> = sqlx::query_as(
        "SELECT id, session_id, role, content, created_at
         FROM chat_messages
         WHERE session_id = $1
         ORDER BY created_at ASC, id ASC",
    )
    .bind(session_id)
    .fetch_all(db.pool())
    .await?;

    rows.into_iter().map(to_message).collect()
}

fn to_session(row: ChatSessionRow) -> ChatSession {
    ChatSession {
        id: row.id,
        user_id: row.user_id,
        dataset_id: row.dataset_id,
        title: row.title,
        created_at: row.created_at,
    }
}

fn to_message(row: ChatMessageRow) -> anyhow::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.id,
        session_id: row.session_id,
        role: row.role.parse().context("chat message row has an invalid role")?,
        content: row.content,
        created_at: row.created_at,
    })
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::{insert_chat_message, list_session_messages, resolve_chat_session};
    use crate::database::Database;
    use crate::impls::test_support::{seed_dataset, seed_user};
    use crate::model::chat::ChatRole;

    #[sqlx::test(migrator = "crate::MIGRATOR")]
    async fn repeated_requests_share_one_session(pool: PgPool) {
        let db = Database::new(pool);
        let user = seed_user(&db, "ada@example.com").await;
        let dataset = seed_dataset(&db, user, 3).await;

        let first = resolve_chat_session(&db, user, dataset.id, "Chat about sales", None)
            .await
            .unwrap();
        insert_chat_message(&db, first.id, ChatRole::User, "how many rows?").await.unwrap();
        insert_chat_message(&db, first.id, ChatRole::Assistant, "three").await.unwrap();

        let second = resolve_chat_session(&db, user, dataset.id, "Chat about sales", None)
            .await
            .unwrap();
        insert_chat_message(&db, second.id, ChatRole::User, "which region?").await.unwrap();
        insert_chat_message(&db, second.id, ChatRole::Assistant, "north").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.title, "Chat about sales");

        let history = list_session_messages(&db, first.id).await.unwrap();
        let roles: Vec<ChatRole> = history.iter().map(|message| message.role).collect();
        assert_eq!(
            roles,
            [ChatRole::User, ChatRole::Assistant, ChatRole::User, ChatRole::Assistant]
        );
        assert_eq!(history[2].content, "which region?");
    }

    #[sqlx::test(migrator = "crate::MIGRATOR")]
    async fn foreign_or_mismatched_sessions_are_not_reused(pool: PgPool) {
        let db = Database::new(pool);
        let ada = seed_user(&db, "ada@example.com").await;
        let bob = seed_user(&db, "bob@example.com").await;
        let sales = seed_dataset(&db, ada, 2).await;
        let costs = seed_dataset(&db, ada, 2).await;

        let sales_session = resolve_chat_session(&db, ada, sales.id, "Chat about sales", None)
            .await
            .unwrap();
        let bob_session = resolve_chat_session(&db, bob, sales.id, "Chat about sales", None)
            .await
            .unwrap();

        let explicit = resolve_chat_session(&db, ada, sales.id, "t", Some(sales_session.id))
            .await
            .unwrap();
        assert_eq!(explicit.id, sales_session.id);

        let stolen = resolve_chat_session(&db, ada, sales.id, "t", Some(bob_session.id))
            .await
            .unwrap();
        assert_eq!(stolen.id, sales_session.id);

        let other_dataset = resolve_chat_session(&db, ada, costs.id, "Chat about costs", Some(sales_session.id))
            .await
            .unwrap();
        assert_ne!(other_dataset.id, sales_session.id);
        assert_eq!(other_dataset.dataset_id, costs.id);
    }
}
