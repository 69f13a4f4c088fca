use std::sync::Arc;

use anyhow::Context as _;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};
use validator::Validate;

use sheetchat_core::auth::{AUTH_COOKIE, hash_password, verify_password};
use sheetchat_core::{ApiError, AuthUser, Data};
use sheetchat_database::impls::users::{create_user, find_user_by_email};
use sheetchat_database::model::user::PublicUser;
use sheetchat_utils::parse::non_empty_trimmed;

use crate::RouteMeta;
use crate::extract::{ValidJson, authenticate};

pub const META: &[RouteMeta] = &[
    RouteMeta {
        method: "POST",
        path: "/auth/register",
        desc: "Create an account and sign in.",
    },
    RouteMeta {
        method: "POST",
        path: "/auth/login",
        desc: "Sign in with email and password.",
    },
    RouteMeta {
        method: "GET",
        path: "/auth/me",
        desc: "Identity behind the current token.",
    },
    RouteMeta {
        method: "POST",
        path: "/auth/logout",
        desc: "Clear the auth cookie.",
    },
];

pub fn router() -> Router<Arc<Data>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterBody {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginBody {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

async fn register(
    State(data): State<Arc<Data>>,
    jar: CookieJar,
    ValidJson(body): ValidJson<RegisterBody>,
) -> Result<(StatusCode, CookieJar, Json<Value>), ApiError> {
    let email = normalize_email(&body.email);

    if find_user_by_email(&data.db, &email).await?.is_some() {
        return Err(ApiError::Conflict("Email already in use".to_owned()));
    }

    let password = body.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("password hashing task failed")??;

    let name = non_empty_trimmed(body.name.as_deref());
    let Some(user) = create_user(&data.db, &email, &password_hash, name).await? else {
        return Err(ApiError::Conflict("Email already in use".to_owned()));
    };

    info!(user_id = %user.id, "user registered");

    let jar = jar.add(auth_cookie(&data, &AuthUser::from(&user))?);
    Ok((
        StatusCode::CREATED,
        jar,
        Json(json!({ "user": PublicUser::from(&user) })),
    ))
}

async fn login(
    State(data): State<Arc<Data>>,
    jar: CookieJar,
    ValidJson(body): ValidJson<LoginBody>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let email = normalize_email(&body.email);
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_owned());

    let Some(user) = find_user_by_email(&data.db, &email).await? else {
        debug!("login for unknown email");
        return Err(invalid());
    };

    if !user.is_active {
        debug!(user_id = %user.id, "login for inactive account");
        return Err(invalid());
    }

    let password = body.password;
    let stored_hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .context("password verification task failed")??;

    if !matches {
        return Err(invalid());
    }

    info!(user_id = %user.id, "user logged in");

    let jar = jar.add(auth_cookie(&data, &AuthUser::from(&user))?);
    Ok((jar, Json(json!({ "user": PublicUser::from(&user) }))))
}

async fn me(State(data): State<Arc<Data>>, headers: HeaderMap) -> Response {
    match authenticate(&headers, &data) {
        Some(user) => Json(json!({ "authenticated": true, "user": user })).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "authenticated": false })),
        )
            .into_response(),
    }
}

async fn logout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    // Emitted even when the request carried no cookie, unlike `CookieJar::remove`.
    let expired = Cookie::build((AUTH_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::ZERO);

    (jar.add(expired), Json(json!({ "ok": true })))
}

fn auth_cookie(data: &Data, user: &AuthUser) -> anyhow::Result<Cookie<'static>> {
    let token = data.tokens.issue(user)?;
    let max_age = i64::try_from(data.tokens.ttl().as_secs()).context("token ttl out of range")?;

    Ok(Cookie::build((AUTH_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(data.settings.cookie_secure)
        .max_age(time::Duration::seconds(max_age))
        .build())
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
