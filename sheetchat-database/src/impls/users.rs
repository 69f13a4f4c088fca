use anyhow::Context as _;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::Database;
use crate::model::user::User;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    name: Option<String>,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

pub async fn find_user_by_email(db: &Database, email: &str) -> anyhow::Result<Option<User>> {
    let row: Option<UserRow> = sqlx::query_as(
        "SELECT id, email, password_hash, name, role, is_active, created_at
         FROM users
         WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(db.pool())
    .await?;

    row.map(to_user).transpose()
}

/// Insert a new `USER` account. Returns `None` when the email is already registered.
pub async fn create_user(
    db: &Database,
    email: &str,
    password_hash: &str,
    name: Option<&str>,
) -> anyhow::Result<Option<User>> {
    let result = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (id, email, password_hash, name)
         VALUES ($1, $2, $3, $4)
         RETURNING id, email, password_hash, name, role, is_active, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .fetch_one(db.pool())
    .await;

    match result {
        Ok(row) => to_user(row).map(Some),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Ok(None),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

fn to_user(row: UserRow) -> anyhow::Result<User> {
    Ok(User {
        id: row.id,
        email: row.email,
        password_hash: row.password_hash,
        name: row.name,
        role: row.role.parse().context("user row has an invalid role")?,
        is_active: row.is_active,
        created_at: row.created_at,
    })
}
