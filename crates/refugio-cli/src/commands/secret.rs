use clap::Subcommand;
use rand::RngCore;
use rand::rngs::OsRng;

#[derive(Debug, Subcommand)]
pub enum SecretCommands {
    /// Print a random HMAC signing secret (hex)
    Generate {
        #[arg(long, default_value_t = 32)]
        bytes: usize,
    },
}

pub fn cmd_secret(command: &SecretCommands, json: bool) -> anyhow::Result<()> {
    match command {
        SecretCommands::Generate { bytes } => {
            if *bytes < 32 {
                anyhow::bail!("refusing to generate a secret shorter than 32 bytes");
            }
            let mut buf = vec![0_u8; *bytes];
            OsRng.fill_bytes(&mut buf);
            let secret = hex::encode(&buf);
            crate::pout(json, serde_json::json!({ "secret": secret }), &secret)
        }
    }
}
