//! HTTP surface of the adoption portal: relay endpoints, login and
//! registration, and the three role pages, all behind [`gateway::route_gateway`].

pub mod error;
pub mod gateway;
pub mod pages;
pub mod relay;
pub mod session;
pub mod state;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use refugio_api::RefugioError;
use refugio_core::Settings;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Every route, wrapped in the gateway. The gateway also runs for paths that
/// match no route, so unknown protected paths still redirect.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/get-token", post(relay::get_token))
        .route("/set-token", post(relay::set_token))
        .route("/login", post(session::login))
        .route("/register", post(session::register));

    Router::new()
        .route("/", get(pages::root))
        .route("/login", get(pages::login_page))
        .route("/login/register", get(pages::register_page))
        .route("/administrador", get(pages::admin_page))
        .route("/administrador/{resource}", post(pages::admin_create))
        .route("/administrador/{resource}/{id}", post(pages::admin_update))
        .route(
            "/administrador/{resource}/{id}/delete",
            post(pages::admin_delete),
        )
        .route("/voluntario", get(pages::voluntario_page))
        .route(
            "/voluntario/adopciones/{id}/finalizar",
            post(pages::finalize_adoption),
        )
        .route("/adoptante", get(pages::adoptante_page))
        .route(
            "/adoptante/animales/{id}/adoptar",
            post(pages::request_adoption),
        )
        .nest("/api", api)
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), gateway::route_gateway))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(settings: &Settings) -> Result<(), RefugioError> {
    let state = AppState::from_settings(settings)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.bind)
        .await
        .map_err(|e| {
            RefugioError::Internal(format!("failed to bind {}: {e}", settings.server.bind))
        })?;
    tracing::info!(
        addr = %settings.server.bind,
        backend = %settings.backend.base_url,
        environment = ?settings.environment,
        "refugio listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RefugioError::Internal(format!("server error: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
