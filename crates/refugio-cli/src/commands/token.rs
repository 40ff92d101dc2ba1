use std::path::PathBuf;
use std::time::Duration;

use clap::Subcommand;
use refugio_api::{Id, Role};
use refugio_auth::{CredentialCodec, DEFAULT_MAX_AGE_SECONDS, decode_unverified};

#[derive(Debug, Subcommand)]
pub enum TokenCommands {
    /// Sign a session token with the configured secret (local development)
    Issue {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        rol: Role,
        /// Lifetime in seconds
        #[arg(long, default_value_t = DEFAULT_MAX_AGE_SECONDS)]
        ttl: u64,
    },
    /// Print a token's claims WITHOUT checking its signature or expiry
    Inspect { token: String },
}

pub fn cmd_token(
    command: TokenCommands,
    config: Option<&PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    match command {
        TokenCommands::Issue { user_id, rol, ttl } => {
            let settings = crate::settings(config)?;
            let codec =
                CredentialCodec::new(settings.auth.secret.expose(), settings.codec_options())?;
            let user_id = Id::from(user_id.as_str());
            let token = codec.issue(user_id.clone(), rol, Duration::from_secs(ttl))?;
            tracing::debug!(%user_id, %rol, ttl, "issued token");
            crate::pout(
                json,
                serde_json::json!({ "token": token, "user_id": user_id, "rol": rol }),
                &token,
            )
        }
        TokenCommands::Inspect { token } => {
            let claims = decode_unverified(&token)
                .ok_or_else(|| anyhow::anyhow!("not a decodable JWT"))?;
            let text = format!(
                "UNVERIFIED claims\n{}",
                serde_json::to_string_pretty(claims.as_json())?
            );
            crate::pout(
                json,
                serde_json::json!({ "verified": false, "claims": claims.as_json() }),
                &text,
            )
        }
    }
}
