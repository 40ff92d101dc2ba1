//! refugio-auth
//!
//! Authentication and route authorization for the adoption portal.
//! It focuses on four recurring problems:
//!
//! - **Verifying credentials** signed with the backend's shared HMAC secret
//!   (signature, expiry, algorithm allow-list)
//! - **Building and reading the session cookie** (`auth`, HttpOnly, 7 days)
//! - **Deciding where a request may go** from its path and the caller's role
//! - **Checking login/registration input** before it is sent anywhere
//!
//! ## Quick start
//! ```no_run
//! use refugio_auth::{CodecOptions, CredentialCodec, Navigation, evaluate};
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let codec = CredentialCodec::new("shared-secret", CodecOptions::default())?;
//! let cookie = b"auth=eyJ...";
//! let eval = evaluate(&codec, "/voluntario", [cookie.as_slice()], "auth")?;
//! match eval.navigation {
//!     Navigation::Allow => println!("pass through"),
//!     Navigation::Redirect(target) => println!("redirect to {target}"),
//! }
//! # Ok(()) }
//! ```

#![forbid(unsafe_code)]

mod cookie;
mod error;
mod gateway;
mod jwt;
mod partition;
pub mod validate;

pub use cookie::{
    CookieOptions, DEFAULT_MAX_AGE_SECONDS, MAX_AGE_LIMIT_SECONDS, SameSite, build_set_cookie,
    find_cookie,
};
pub use error::{Error, Result};
pub use gateway::{Evaluation, Navigation, decide, evaluate, fail_safe};
pub use jsonwebtoken::Algorithm;
pub use jwt::{
    Claims, CodecOptions, CredentialCodec, UnverifiedClaims, VerifiedCredential,
    decode_unverified,
};
pub use partition::{LOGIN_ROUTE, Partition, classify};
