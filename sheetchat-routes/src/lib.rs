pub mod auth;
pub mod chat;
pub mod datasets;
pub mod extract;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use sheetchat_core::Data;

pub struct RouteMeta {
    pub method: &'static str,
    pub path: &'static str,
    pub desc: &'static str,
}

pub const ROUTE_GROUPS: &[&[RouteMeta]] = &[auth::META, datasets::META, chat::META];

pub fn routes() -> impl Iterator<Item = &'static RouteMeta> {
    ROUTE_GROUPS.iter().flat_map(|group| group.iter())
}

pub fn router(data: Arc<Data>) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(datasets::router(data.settings.max_upload_bytes))
        .merge(chat::router())
        .layer(TraceLayer::new_for_http())
        .with_state(data)
}
