use std::path::PathBuf;

use clap::Args;
use refugio_auth::{CredentialCodec, Navigation, evaluate, fail_safe};

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Request path, e.g. `/voluntario/dashboard`
    pub path: String,
    /// Session token to present as the `auth` cookie
    #[arg(long)]
    pub token: Option<String>,
}

pub fn cmd_check(args: &CheckArgs, config: Option<&PathBuf>, json: bool) -> anyhow::Result<()> {
    let settings = crate::settings(config)?;
    let codec = CredentialCodec::new(settings.auth.secret.expose(), settings.codec_options())?;

    let header = args
        .token
        .as_ref()
        .map(|t| format!("{}={t}", settings.cookie.name));
    let (navigation, caller, reason) = match evaluate(
        &codec,
        &args.path,
        header.iter().map(String::as_bytes),
        &settings.cookie.name,
    ) {
        Ok(eval) => (
            eval.navigation,
            eval.credential.map(|c| c.role()),
            eval.rejection.map(|e| e.to_string()),
        ),
        Err(e) => (fail_safe(&args.path), None, Some(e.to_string())),
    };

    let (outcome, target) = match navigation {
        Navigation::Allow => ("allow", None),
        Navigation::Redirect(target) => ("redirect", Some(target)),
    };
    let text = match (target, &caller) {
        (Some(target), _) => format!("{} -> redirect to {target}", args.path),
        (None, Some(role)) => format!("{} -> allow ({role})", args.path),
        (None, None) => format!("{} -> allow (anonymous)", args.path),
    };
    crate::pout(
        json,
        serde_json::json!({
            "path": args.path,
            "outcome": outcome,
            "target": target,
            "caller": caller.map(|r| r.as_str()),
            "rejection": reason,
        }),
        &text,
    )
}
