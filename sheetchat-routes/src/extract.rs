use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Json, Request};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use serde::de::DeserializeOwned;
use validator::Validate;

use sheetchat_core::auth::AUTH_COOKIE;
use sheetchat_core::{ApiError, AuthUser, Data};

/// The authenticated requester. Rejects with 401 when no valid token is presented.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

impl FromRequestParts<Arc<Data>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, data: &Arc<Data>) -> Result<Self, Self::Rejection> {
        authenticate(&parts.headers, data)
            .map(CurrentUser)
            .ok_or_else(ApiError::unauthorized)
    }
}

/// Resolve the identity behind the `token` cookie, falling back to a bearer header
/// when the cookie is absent or does not verify.
pub fn authenticate(headers: &HeaderMap, data: &Data) -> Option<AuthUser> {
    let verify = |token: &str| {
        let token = token.trim();
        (!token.is_empty()).then(|| data.tokens.verify(token)).flatten()
    };

    let jar = CookieJar::from_headers(headers);
    if let Some(user) = jar.get(AUTH_COOKIE).and_then(|cookie| verify(cookie.value())) {
        return Some(user);
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(verify)
}

/// JSON body that must also pass its `validator` rules.
///
/// Unreadable bodies are reported as 400 rather than axum's default 415/422.
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text())))?;

        value.validate()?;

        Ok(Self(value))
    }
}
