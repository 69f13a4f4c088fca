use uuid::Uuid;

use crate::cache::chat_rate_limit_key;
use crate::database::Database;

/// Count one chat request against the user's window and report whether it is allowed.
pub async fn chat_within_limit(db: &Database, user_id: Uuid) -> anyhow::Result<bool> {
    let cache = db.cache();
    let key = chat_rate_limit_key(cache, user_id);
    let count = cache
        .increment_with_window(&key, cache.chat_rate_limit_window())
        .await?;

    Ok(count <= cache.chat_rate_limit_max_hits())
}
