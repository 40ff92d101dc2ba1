use std::time::Duration;

use refugio_api::{
    AdoptionRequest, BackendApi, Id, IssuedToken, LoginRequest, RefugioError, RegistrationRequest,
    Resource, SecretStore,
};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn get(&self, secret_ref: &str) -> Result<String, RefugioError> {
        std::env::var(secret_ref)
            .map_err(|_| RefugioError::NotFound(format!("missing secret env var {secret_ref}")))
    }
}

/// The adoption backend reached over HTTP. Every endpoint is a `POST` to
/// `<base_url>/<endpoint>`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    http: Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RefugioError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RefugioError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }

    async fn post(
        &self,
        endpoint: &str,
        token: Option<&str>,
        body: Option<&Value>,
    ) -> Result<Response, RefugioError> {
        let mut req = self.http.post(self.url(endpoint));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req = match body {
            Some(body) => req.json(body),
            None => req.header(reqwest::header::CONTENT_TYPE, "application/json"),
        };

        let resp = req.send().await.map_err(|e| {
            tracing::warn!(endpoint, error = %e, "backend request failed");
            RefugioError::UpstreamUnavailable(format!("{endpoint}: {e}"))
        })?;
        tracing::debug!(endpoint, status = %resp.status(), "backend responded");
        Ok(resp)
    }

    async fn post_expecting_success(
        &self,
        endpoint: &str,
        token: &str,
        body: Option<&Value>,
    ) -> Result<Response, RefugioError> {
        let resp = self.post(endpoint, Some(token), body).await?;
        ensure_success(endpoint, resp).await
    }
}

async fn ensure_success(endpoint: &str, resp: Response) -> Result<Response, RefugioError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RefugioError::Unauthenticated(
            format!("{endpoint} rejected the bearer token ({status})"),
        )),
        StatusCode::NOT_FOUND => Err(RefugioError::NotFound(format!("{endpoint}: {snippet}"))),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            Err(RefugioError::Validation(format!("{endpoint}: {snippet}")))
        }
        _ => Err(RefugioError::UpstreamUnavailable(format!(
            "{endpoint} failed ({status}): {snippet}"
        ))),
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, RefugioError> {
    serde_json::to_value(value).map_err(|e| RefugioError::Internal(e.to_string()))
}

#[async_trait::async_trait]
impl BackendApi for HttpBackend {
    async fn login(&self, request: &LoginRequest) -> Result<IssuedToken, RefugioError> {
        let endpoint = "usuario-validar-contra";
        let resp = self.post(endpoint, None, Some(&to_value(request)?)).await?;
        let status = resp.status();
        if status.is_client_error() {
            return Err(RefugioError::Unauthenticated(format!(
                "credential check refused ({status})"
            )));
        }
        let resp = ensure_success(endpoint, resp).await?;
        resp.json::<IssuedToken>().await.map_err(|e| {
            RefugioError::UpstreamUnavailable(format!("{endpoint} returned no token: {e}"))
        })
    }

    async fn register(&self, request: &RegistrationRequest) -> Result<(), RefugioError> {
        let endpoint = "usuario-create";
        let resp = self.post(endpoint, None, Some(&to_value(request)?)).await?;
        ensure_success(endpoint, resp).await?;
        Ok(())
    }

    async fn list(&self, token: &str, resource: Resource) -> Result<Vec<Value>, RefugioError> {
        let endpoint = resource.list_endpoint();
        let resp = self.post_expecting_success(&endpoint, token, None).await?;
        resp.json::<Vec<Value>>().await.map_err(|e| {
            RefugioError::UpstreamUnavailable(format!("{endpoint} returned an unexpected body: {e}"))
        })
    }

    async fn create(
        &self,
        token: &str,
        resource: Resource,
        body: &Value,
    ) -> Result<(), RefugioError> {
        self.post_expecting_success(&resource.create_endpoint(), token, Some(body))
            .await?;
        Ok(())
    }

    async fn update(
        &self,
        token: &str,
        resource: Resource,
        id: &Id,
        body: &Value,
    ) -> Result<(), RefugioError> {
        self.post_expecting_success(&resource.update_endpoint(id), token, Some(body))
            .await?;
        Ok(())
    }

    async fn delete(&self, token: &str, resource: Resource, id: &Id) -> Result<(), RefugioError> {
        self.post_expecting_success(&resource.delete_endpoint(id), token, None)
            .await?;
        Ok(())
    }

    async fn request_adoption(
        &self,
        token: &str,
        request: &AdoptionRequest,
    ) -> Result<(), RefugioError> {
        self.post_expecting_success(
            "adopcion-creacion-edicion-animal",
            token,
            Some(&to_value(request)?),
        )
        .await?;
        Ok(())
    }
}
