//! Credential codec: HMAC-signed JWTs carrying `{user_id, rol}`.

use crate::{Error, Result};

use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use refugio_api::{Role, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Claims the portal relies on. Anything else the backend puts in the token
/// (`token_type`, `jti`, ...) is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Backend user id.
    pub user_id: UserId,
    /// Role partition the user belongs to.
    pub rol: Role,
    /// Issued at (seconds since epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiry (seconds since epoch).
    pub exp: i64,
}

impl Claims {
    /// Claims valid for `ttl_seconds` from now. A negative ttl yields an
    /// already expired credential.
    pub fn new(user_id: impl Into<UserId>, rol: Role, ttl_seconds: i64) -> Self {
        let now = now_epoch_secs();
        Self {
            user_id: user_id.into(),
            rol,
            iat: Some(now),
            exp: now.saturating_add(ttl_seconds),
        }
    }
}

/// Options for the codec.
#[derive(Debug, Clone)]
pub struct CodecOptions {
    /// Accepted HMAC algorithms.
    pub allowed_algs: Vec<Algorithm>,

    /// Clock skew/leeway in seconds.
    pub leeway_seconds: u64,

    /// Algorithm used by [`CredentialCodec::issue`].
    pub issue_alg: Algorithm,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            allowed_algs: vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512],
            leeway_seconds: 0,
            issue_alg: Algorithm::HS256,
        }
    }
}

/// A credential whose signature and expiry have been checked.
///
/// Only [`CredentialCodec::verify`] constructs this, so holding one is proof
/// that the claims can be used for authorization.
#[derive(Debug, Clone)]
pub struct VerifiedCredential {
    token: String,
    claims: Claims,
}

impl VerifiedCredential {
    /// The raw token, for relaying as a bearer credential.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Verified claims.
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Convenience accessor for `user_id`.
    pub fn user_id(&self) -> &UserId {
        &self.claims.user_id
    }

    /// Convenience accessor for `rol`.
    pub fn role(&self) -> Role {
        self.claims.rol
    }
}

/// Claims read without any signature or expiry check.
///
/// For display only. There is deliberately no conversion into
/// [`VerifiedCredential`] or [`Claims`].
#[derive(Debug, Clone)]
pub struct UnverifiedClaims(Value);

impl UnverifiedClaims {
    /// Get a claim by key.
    pub fn claim(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `rol` claim as written in the token, whatever it says.
    pub fn rol(&self) -> Option<&str> {
        self.claim("rol").and_then(Value::as_str)
    }

    /// Convenience accessor for `exp`.
    pub fn exp(&self) -> Option<i64> {
        self.claim("exp").and_then(Value::as_i64)
    }

    /// All claims as JSON.
    pub fn as_json(&self) -> &Value {
        &self.0
    }
}

/// Verifies and issues credentials with one shared secret.
#[derive(Clone)]
pub struct CredentialCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issue_alg: Algorithm,
}

impl CredentialCodec {
    /// Build a codec for `secret`.
    pub fn new(secret: &str, opts: CodecOptions) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::Config("signing secret is empty".to_string()));
        }
        if opts.allowed_algs.is_empty() {
            return Err(Error::Config("no JWT algorithms allowed".to_string()));
        }
        if !matches!(
            opts.issue_alg,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(Error::UnsupportedAlg(opts.issue_alg));
        }

        let mut validation = Validation::new(opts.issue_alg);
        validation.algorithms.clone_from(&opts.allowed_algs);
        validation.leeway = opts.leeway_seconds;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        // Backend tokens carry no audience.
        validation.validate_aud = false;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issue_alg: opts.issue_alg,
        })
    }

    /// Check signature and expiry, then return the claims.
    pub fn verify(&self, token: &str) -> Result<VerifiedCredential> {
        if token.is_empty() {
            return Err(Error::MissingToken);
        }

        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| Error::Malformed(format!("failed to decode header: {e}")))?;

        if !self.validation.algorithms.contains(&header.alg) {
            return Err(Error::UnsupportedAlg(header.alg));
        }

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(classify)?;

        Ok(VerifiedCredential {
            token: token.to_string(),
            claims: data.claims,
        })
    }

    /// Sign `claims` as-is.
    pub fn sign(&self, claims: &Claims) -> Result<String> {
        Ok(jsonwebtoken::encode(
            &Header::new(self.issue_alg),
            claims,
            &self.encoding_key,
        )?)
    }

    /// Mint a credential valid for `ttl`.
    pub fn issue(&self, user_id: impl Into<UserId>, rol: Role, ttl: Duration) -> Result<String> {
        let ttl = i64::try_from(ttl.as_secs())
            .map_err(|_| Error::Config("token lifetime out of range".to_string()))?;
        self.sign(&Claims::new(user_id, rol, ttl))
    }
}

impl std::fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCodec")
            .field("algorithms", &self.validation.algorithms)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

/// Read the payload segment without checking anything.
///
/// Returns `None` when the token does not have three segments or the payload
/// is not a JSON object.
pub fn decode_unverified(token: &str) -> Option<UnverifiedClaims> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    claims.is_object().then_some(UnverifiedClaims(claims))
}

fn classify(e: jsonwebtoken::errors::Error) -> Error {
    match e.kind() {
        ErrorKind::InvalidSignature => Error::InvalidSignature,
        ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => Error::Expired,
        ErrorKind::InvalidAlgorithm => Error::Malformed("algorithm not allowed".to_string()),
        _ => Error::Malformed(e.to_string()),
    }
}

fn now_epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
        .try_into()
        .unwrap_or(i64::MAX)
}
