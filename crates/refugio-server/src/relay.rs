//! Token relay endpoints.
//!
//! `get-token` turns the session cookie back into a bearer token for
//! client-side code; `set-token` takes a token freshly issued by the backend,
//! re-verifies it and stores it in the session cookie.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use refugio_api::{Role, UserId};
use refugio_auth::{CookieOptions, LOGIN_ROUTE, VerifiedCredential, build_set_cookie, find_cookie};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("no session token presented")]
    MissingToken,
    #[error("session token rejected: {0}")]
    InvalidOrExpiredToken(#[source] refugio_auth::Error),
}

impl RelayError {
    fn log(&self, endpoint: &'static str) {
        match self {
            RelayError::MissingToken => tracing::debug!(endpoint, "no session token presented"),
            RelayError::InvalidOrExpiredToken(e) => {
                tracing::warn!(endpoint, reason = %e, "session token rejected");
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub user_id: UserId,
    pub role: Role,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: UserId,
    pub rol: Role,
}

impl From<&VerifiedCredential> for SessionResponse {
    fn from(credential: &VerifiedCredential) -> Self {
        Self {
            user_id: credential.user_id().clone(),
            rol: credential.role(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SetTokenBody {
    data: SetTokenData,
}

#[derive(Debug, Deserialize)]
struct SetTokenData {
    access: String,
}

fn redirect_to_login() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, LOGIN_ROUTE)]).into_response()
}

fn verified_cookie(state: &AppState, headers: &HeaderMap) -> Result<VerifiedCredential, RelayError> {
    let cookies = headers
        .get_all(header::COOKIE)
        .iter()
        .map(HeaderValue::as_bytes);
    let token = find_cookie(cookies, state.cookie_name())
        .map_err(RelayError::InvalidOrExpiredToken)?
        .ok_or(RelayError::MissingToken)?;
    state
        .codec
        .verify(token)
        .map_err(RelayError::InvalidOrExpiredToken)
}

/// `POST /api/get-token`
pub async fn get_token(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match verified_cookie(&state, &headers) {
        Ok(credential) => Json(TokenResponse {
            user_id: credential.user_id().clone(),
            role: credential.role(),
            token: credential.token().to_string(),
        })
        .into_response(),
        Err(e) => {
            e.log("get-token");
            redirect_to_login()
        }
    }
}

/// `POST /api/set-token`
///
/// The body is parsed by hand so that a missing or malformed body is reported
/// the same way as a bad token.
pub async fn set_token(State(state): State<AppState>, body: Bytes) -> Response {
    let verified = serde_json::from_slice::<SetTokenBody>(&body)
        .ok()
        .map(|b| b.data.access)
        .filter(|access| !access.is_empty())
        .ok_or(RelayError::MissingToken)
        .and_then(|access| {
            state
                .codec
                .verify(&access)
                .map_err(RelayError::InvalidOrExpiredToken)
        });

    match verified {
        Ok(credential) => match session_cookie(&state.cookie, &credential) {
            Ok(cookie) => (
                [(header::SET_COOKIE, cookie)],
                Json(SessionResponse::from(&credential)),
            )
                .into_response(),
            Err(e) => e.into_response(),
        },
        Err(e) => {
            e.log("set-token");
            ApiError::Unauthenticated.into_response()
        }
    }
}

/// `Set-Cookie` value storing a verified credential.
pub(crate) fn session_cookie(
    opts: &CookieOptions,
    credential: &VerifiedCredential,
) -> Result<HeaderValue, ApiError> {
    let cookie = build_set_cookie(credential.token(), opts).map_err(|e| {
        tracing::error!(error = %e, "failed to build session cookie");
        ApiError::Internal
    })?;
    HeaderValue::from_str(&cookie).map_err(|e| {
        tracing::error!(error = %e, "session cookie is not a valid header value");
        ApiError::Internal
    })
}
