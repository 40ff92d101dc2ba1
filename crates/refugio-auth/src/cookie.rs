//! Session cookie helpers.

use crate::{Error, Result};
use httpdate::fmt_http_date;
use std::time::{Duration, SystemTime};

/// Seven days, the lifetime of the session cookie.
pub const DEFAULT_MAX_AGE_SECONDS: u64 = 60 * 60 * 24 * 7;

/// Longest lifetime browsers honour (400 days).
pub const MAX_AGE_LIMIT_SECONDS: u64 = 60 * 60 * 24 * 400;

/// Beyond this an `Expires` date would run past year 9999.
const MAX_EXPIRES_SECONDS: u64 = 60 * 60 * 24 * 365 * 7000;

/// SameSite attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    /// SameSite=Strict
    Strict,
    /// SameSite=Lax
    Lax,
    /// SameSite=None
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

impl std::str::FromStr for SameSite {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            other => Err(Error::Config(format!("unknown SameSite value: {other}"))),
        }
    }
}

/// Options used to build the session cookie.
#[derive(Debug, Clone)]
pub struct CookieOptions {
    /// Cookie name.
    pub name: String,

    /// Cookie path.
    pub path: String,

    /// Send on HTTPS only.
    pub secure: bool,

    /// Not accessible to JS.
    pub http_only: bool,

    /// SameSite attribute, omitted when unset.
    pub same_site: Option<SameSite>,

    /// Max-Age in seconds.
    pub max_age_seconds: Option<u64>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            name: "auth".to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: true,
            same_site: None,
            max_age_seconds: Some(DEFAULT_MAX_AGE_SECONDS),
        }
    }
}

impl CookieOptions {
    /// Session cookie defaults; `Secure` is only set in production so local
    /// plain-HTTP development keeps working.
    pub fn session(production: bool) -> Self {
        Self {
            secure: production,
            ..Self::default()
        }
    }
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_graphic() && !matches!(c, '"' | ',' | ';' | '\\')
}

/// Build a `Set-Cookie` header value.
pub fn build_set_cookie(value: &str, opts: &CookieOptions) -> Result<String> {
    if opts.name.is_empty() || !opts.name.chars().all(|c| is_token_char(c) && c != '=') {
        return Err(Error::Config(format!("invalid cookie name: {:?}", opts.name)));
    }
    if !value.chars().all(is_token_char) {
        return Err(Error::Config("cookie value contains reserved characters".to_string()));
    }

    let mut parts: Vec<String> = Vec::new();
    parts.push(format!("{}={value}", opts.name));
    parts.push(format!("Path={}", opts.path));

    if opts.secure {
        parts.push("Secure".to_string());
    }
    if opts.http_only {
        parts.push("HttpOnly".to_string());
    }

    if let Some(same_site) = opts.same_site {
        parts.push(format!("SameSite={}", same_site.as_str()));
    }

    if let Some(max_age) = opts.max_age_seconds {
        parts.push(format!("Max-Age={max_age}"));
        // Expires for older clients, left out when the date is out of range.
        let expires = (max_age <= MAX_EXPIRES_SECONDS)
            .then(|| SystemTime::now().checked_add(Duration::from_secs(max_age)))
            .flatten();
        if let Some(expires) = expires {
            parts.push(format!("Expires={}", fmt_http_date(expires)));
        }
    }

    Ok(parts.join("; "))
}

/// Find cookie `name` across one or more `Cookie` header values.
///
/// Pairs are read as raw bytes, so an unrelated cookie with non-ASCII content
/// never hides the session cookie. A session cookie whose value is not
/// visible ASCII comes back as [`Error::Malformed`], a credential rejection.
pub fn find_cookie<'a, I>(headers: I, name: &str) -> Result<Option<&'a str>>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    for raw in headers {
        for pair in raw.split(|b| *b == b';') {
            let Some(eq) = pair.iter().position(|b| *b == b'=') else {
                continue;
            };
            if pair[..eq].trim_ascii() != name.as_bytes() {
                continue;
            }
            let v = pair[eq + 1..].trim_ascii();
            let v = v
                .strip_prefix(b"\"")
                .and_then(|s| s.strip_suffix(b"\""))
                .unwrap_or(v);
            if !v.iter().all(u8::is_ascii_graphic) {
                return Err(Error::Malformed(format!(
                    "cookie {name} is not visible ASCII"
                )));
            }
            let v = std::str::from_utf8(v).map_err(|e| Error::Malformed(e.to_string()))?;
            return Ok(Some(v));
        }
    }
    Ok(None)
}
