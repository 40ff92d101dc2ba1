//! Route authorization middleware.
//!
//! Every request passes through [`route_gateway`], which hands the path and
//! cookie headers to [`refugio_auth::evaluate`] and executes the resulting
//! [`Navigation`]. Verified credentials travel on to handlers as a request
//! extension and are read back with the [`Caller`] extractor.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use refugio_auth::{Navigation, VerifiedCredential, evaluate, fail_safe};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn route_gateway(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();

    let evaluation = {
        let cookies = req
            .headers()
            .get_all(header::COOKIE)
            .iter()
            .map(axum::http::HeaderValue::as_bytes);
        evaluate(&state.codec, &path, cookies, state.cookie_name())
    };

    let navigation = match evaluation {
        Ok(eval) => {
            if let Some(reason) = &eval.rejection {
                tracing::debug!(path = %path, reason = %reason, "no verified session");
            }
            if let (Navigation::Allow, Some(credential)) = (eval.navigation, eval.credential) {
                req.extensions_mut().insert(credential);
            }
            eval.navigation
        }
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "gateway failed to evaluate request");
            fail_safe(&path)
        }
    };

    match navigation {
        Navigation::Allow => next.run(req).await,
        Navigation::Redirect(target) => {
            tracing::debug!(path = %path, target, "redirecting");
            Redirect::temporary(target).into_response()
        }
    }
}

/// The verified caller of a request that went through [`route_gateway`].
///
/// Rejects with 401 if the gateway did not attach a credential, so a handler
/// mounted without the middleware fails closed.
#[derive(Debug, Clone)]
pub struct Caller(pub VerifiedCredential);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedCredential>()
            .cloned()
            .map(Caller)
            .ok_or(ApiError::Unauthenticated)
    }
}
