//! Shared application state.

use std::sync::Arc;

use refugio_api::{BackendApi, RefugioError};
use refugio_auth::{CookieOptions, CredentialCodec};
use refugio_connectors::HttpBackend;
use refugio_core::Settings;

/// Read-only state shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<CredentialCodec>,
    pub cookie: Arc<CookieOptions>,
    pub backend: Arc<dyn BackendApi>,
}

impl AppState {
    pub fn new(settings: &Settings, backend: Arc<dyn BackendApi>) -> Result<Self, RefugioError> {
        let codec = CredentialCodec::new(settings.auth.secret.expose(), settings.codec_options())
            .map_err(|e| RefugioError::Validation(e.to_string()))?;
        Ok(Self {
            codec: Arc::new(codec),
            cookie: Arc::new(settings.cookie_options()),
            backend,
        })
    }

    /// State talking to the configured HTTP backend.
    pub fn from_settings(settings: &Settings) -> Result<Self, RefugioError> {
        let backend = HttpBackend::new(
            settings.backend.base_url.clone(),
            settings.backend.request_timeout,
        )?;
        Self::new(settings, Arc::new(backend))
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie.name
    }
}
