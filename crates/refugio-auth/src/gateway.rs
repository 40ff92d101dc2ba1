//! Per-request authorization decision.
//!
//! Everything here is pure: the caller supplies the path and the raw cookie
//! headers and gets back a [`Navigation`] to execute. Nothing is remembered
//! between requests.

use refugio_api::Role;

use crate::cookie::find_cookie;
use crate::jwt::{CredentialCodec, VerifiedCredential};
use crate::partition::{LOGIN_ROUTE, Partition, classify};
use crate::{Error, Result};

/// What the boundary should do with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Pass the request through unchanged.
    Allow,
    /// Send the browser elsewhere.
    Redirect(&'static str),
}

/// Outcome of [`evaluate`].
#[derive(Debug)]
pub struct Evaluation {
    /// Decision to execute.
    pub navigation: Navigation,
    /// Present when the cookie verified; handed on to page handlers.
    pub credential: Option<VerifiedCredential>,
    /// Why a presented (or absent) credential was not accepted, for logs only.
    pub rejection: Option<Error>,
}

/// The policy itself. `caller` is `None` whenever the credential was missing
/// or failed verification.
pub fn decide(path: &str, caller: Option<Role>) -> Navigation {
    let partition = classify(path);
    match caller {
        None => match partition {
            Partition::Protected(_) => Navigation::Redirect(LOGIN_ROUTE),
            Partition::Public | Partition::Login => Navigation::Allow,
        },
        Some(role) => match partition {
            Partition::Protected(required) if required != role => {
                Navigation::Redirect(role.home_route())
            }
            Partition::Protected(_) | Partition::Public | Partition::Login => Navigation::Allow,
        },
    }
}

/// Extract and verify the session cookie, then [`decide`].
///
/// Credential problems, including a session cookie that cannot be decoded,
/// are folded into the decision. Anything else is returned as an error; see
/// [`fail_safe`].
pub fn evaluate<'a, I>(
    codec: &CredentialCodec,
    path: &str,
    cookie_headers: I,
    cookie_name: &str,
) -> Result<Evaluation>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let verified = match find_cookie(cookie_headers, cookie_name) {
        Ok(Some(token)) => codec.verify(token),
        Ok(None) => Err(Error::MissingToken),
        Err(e) => Err(e),
    };

    let (credential, rejection) = match verified {
        Ok(credential) => (Some(credential), None),
        Err(e) if e.is_rejection() => (None, Some(e)),
        Err(e) => return Err(e),
    };

    let navigation = decide(path, credential.as_ref().map(VerifiedCredential::role));
    Ok(Evaluation {
        navigation,
        credential,
        rejection,
    })
}

/// Decision when [`evaluate`] itself failed: back to login, unless the request
/// is already headed there.
pub fn fail_safe(path: &str) -> Navigation {
    match classify(path) {
        Partition::Login => Navigation::Allow,
        Partition::Public | Partition::Protected(_) => Navigation::Redirect(LOGIN_ROUTE),
    }
}
