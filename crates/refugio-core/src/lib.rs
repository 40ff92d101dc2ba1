use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use refugio_api::{RefugioError, SecretStore};
use refugio_auth::{CodecOptions, CookieOptions, SameSite};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "refugio.toml";

pub const ENV_BACKEND_URL: &str = "BACK_API";
pub const ENV_ENVIRONMENT: &str = "REFUGIO_ENV";
pub const ENV_BIND: &str = "REFUGIO_BIND";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = RefugioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(RefugioError::Validation(format!(
                "unknown environment: {other}"
            ))),
        }
    }
}

/// The HMAC secret shared with the backend. Never printed.
#[derive(Clone)]
pub struct SigningSecret(String);

impl SigningSecret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(***)")
    }
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub secret_ref: String,
    pub secret: SigningSecret,
    pub leeway_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub max_age_seconds: u64,
    pub same_site: Option<SameSite>,
}

/// Process-wide configuration, built once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: Environment,
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub auth: AuthSettings,
    pub cookie: CookieSettings,
}

impl Settings {
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn codec_options(&self) -> CodecOptions {
        CodecOptions {
            leeway_seconds: self.auth.leeway_seconds,
            ..CodecOptions::default()
        }
    }

    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions {
            name: self.cookie.name.clone(),
            same_site: self.cookie.same_site,
            max_age_seconds: Some(self.cookie.max_age_seconds),
            ..CookieOptions::session(self.is_production())
        }
    }
}

pub fn validate_settings(settings: &Settings) -> Result<(), RefugioError> {
    let url = settings.backend.base_url.as_str();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(RefugioError::Validation(format!(
            "backend base_url must be an http(s) URL, got {url:?}"
        )));
    }
    if settings.auth.secret.expose().is_empty() {
        return Err(RefugioError::Validation(format!(
            "signing secret {} is empty",
            settings.auth.secret_ref
        )));
    }
    if settings.cookie.name.is_empty() {
        return Err(RefugioError::Validation("cookie name is empty".to_string()));
    }
    if settings.cookie.max_age_seconds == 0 {
        return Err(RefugioError::Validation(
            "cookie max_age_seconds must be positive".to_string(),
        ));
    }
    if settings.cookie.max_age_seconds > refugio_auth::MAX_AGE_LIMIT_SECONDS {
        return Err(RefugioError::Validation(format!(
            "cookie max_age_seconds must be at most {}",
            refugio_auth::MAX_AGE_LIMIT_SECONDS
        )));
    }
    if settings.backend.request_timeout.is_zero() {
        return Err(RefugioError::Validation(
            "backend request_timeout_ms must be positive".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    #[serde(default)]
    environment: Option<Environment>,
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    backend: RawBackend,
    #[serde(default)]
    auth: RawAuth,
    #[serde(default)]
    cookie: RawCookie,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawServer {
    bind: String,
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawBackend {
    base_url: Option<String>,
    request_timeout_ms: u64,
}

impl Default for RawBackend {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawAuth {
    secret_ref: String,
    leeway_seconds: u64,
}

impl Default for RawAuth {
    fn default() -> Self {
        Self {
            secret_ref: "JWT_SECRET".to_string(),
            leeway_seconds: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawCookie {
    name: String,
    max_age_seconds: u64,
    same_site: Option<String>,
}

impl Default for RawCookie {
    fn default() -> Self {
        Self {
            name: "auth".to_string(),
            max_age_seconds: refugio_auth::DEFAULT_MAX_AGE_SECONDS,
            same_site: None,
        }
    }
}

pub fn default_config_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config").join("refugio")
    } else {
        PathBuf::from(".refugio")
    }
}

/// Load settings from an explicit file, or from the default directory when
/// one exists there, or from defaults plus environment otherwise.
pub fn load_settings(path: Option<&Path>, env: &dyn SecretStore) -> Result<Settings, RefugioError> {
    match path {
        Some(path) => load_settings_from_file(path, env),
        None => {
            let default_path = default_config_dir().join(CONFIG_FILE);
            if default_path.exists() {
                load_settings_from_file(&default_path, env)
            } else {
                load_settings_from_str("", env)
            }
        }
    }
}

pub fn load_settings_from_file(path: &Path, env: &dyn SecretStore) -> Result<Settings, RefugioError> {
    let content = fs::read_to_string(path)
        .map_err(|e| RefugioError::NotFound(format!("failed to read {}: {e}", path.display())))?;
    load_settings_from_str(&content, env).map_err(|e| match e {
        RefugioError::Validation(msg) => {
            RefugioError::Validation(format!("{}: {msg}", path.display()))
        }
        other => other,
    })
}

pub fn load_settings_from_str(content: &str, env: &dyn SecretStore) -> Result<Settings, RefugioError> {
    let raw: RawSettings = toml::from_str(content)
        .map_err(|e| RefugioError::Validation(format!("invalid TOML: {e}")))?;

    let environment = match env.get(ENV_ENVIRONMENT) {
        Ok(value) => value.parse()?,
        Err(_) => raw.environment.unwrap_or_default(),
    };

    let bind = env.get(ENV_BIND).unwrap_or(raw.server.bind);
    let bind: SocketAddr = bind
        .parse()
        .map_err(|e| RefugioError::Validation(format!("invalid bind address {bind:?}: {e}")))?;

    let base_url = env
        .get(ENV_BACKEND_URL)
        .ok()
        .or(raw.backend.base_url)
        .ok_or_else(|| {
            RefugioError::Validation(format!(
                "backend base_url is not configured (set [backend].base_url or {ENV_BACKEND_URL})"
            ))
        })?;

    let secret = env.get(&raw.auth.secret_ref).map_err(|_| {
        RefugioError::Validation(format!(
            "signing secret not found in {}",
            raw.auth.secret_ref
        ))
    })?;

    let same_site = raw
        .cookie
        .same_site
        .as_deref()
        .map(str::parse::<SameSite>)
        .transpose()
        .map_err(|e| RefugioError::Validation(e.to_string()))?;

    let settings = Settings {
        environment,
        server: ServerSettings { bind },
        backend: BackendSettings {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_millis(raw.backend.request_timeout_ms),
        },
        auth: AuthSettings {
            secret_ref: raw.auth.secret_ref,
            secret: SigningSecret(secret),
            leeway_seconds: raw.auth.leeway_seconds,
        },
        cookie: CookieSettings {
            name: raw.cookie.name,
            max_age_seconds: raw.cookie.max_age_seconds,
            same_site,
        },
    };

    validate_settings(&settings)?;
    Ok(settings)
}

/// Write the example configuration into `dir` unless a file is already there.
/// Returns the path of the config file.
pub fn write_default_config_file(dir: &Path, force: bool) -> Result<PathBuf, RefugioError> {
    fs::create_dir_all(dir)
        .map_err(|e| RefugioError::Internal(format!("failed to create {}: {e}", dir.display())))?;

    let path = dir.join(CONFIG_FILE);
    if force || !path.exists() {
        fs::write(
            &path,
            include_str!("../../../docs/refugio/refugio.toml.example"),
        )
        .map_err(|e| RefugioError::Internal(format!("failed to write {}: {e}", path.display())))?;
    }
    Ok(path)
}
