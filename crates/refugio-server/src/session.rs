//! Sign-in and self-registration endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use refugio_api::{LoginRequest, RefugioError, RegistrationRequest, Role, UserId};
use refugio_auth::validate::{validate_login, validate_registration};
use refugio_auth::LOGIN_ROUTE;
use serde::Serialize;
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::relay::session_cookie;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub rol: Role,
    pub redirect: &'static str,
}

/// `POST /api/login`
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Response> {
    validate_login(&request).map_err(ApiError::Validation)?;

    let issued = state.backend.login(&request).await.map_err(|e| match e {
        RefugioError::Unauthenticated(_)
        | RefugioError::Validation(_)
        | RefugioError::NotFound(_) => {
            tracing::info!(reason = %e, "login refused");
            ApiError::InvalidCredentials
        }
        other => {
            tracing::warn!(error = %other, "login could not reach the backend");
            ApiError::Upstream
        }
    })?;

    // A token the backend handed out but this server cannot verify means the
    // two disagree on the secret.
    let credential = state.codec.verify(&issued.access).map_err(|e| {
        tracing::error!(reason = %e, "backend issued a token that does not verify");
        ApiError::Upstream
    })?;

    let cookie = session_cookie(&state.cookie, &credential)?;
    tracing::info!(user_id = %credential.user_id(), rol = %credential.role(), "signed in");

    let body = LoginResponse {
        user_id: credential.user_id().clone(),
        rol: credential.role(),
        redirect: credential.role().home_route(),
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// `POST /api/register`
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegistrationRequest>,
) -> ApiResult<Response> {
    validate_registration(&request).map_err(ApiError::Validation)?;

    state.backend.register(&request).await?;
    tracing::info!(rol = %request.rol, "account registered");

    Ok((StatusCode::CREATED, Json(json!({ "redirect": LOGIN_ROUTE }))).into_response())
}
