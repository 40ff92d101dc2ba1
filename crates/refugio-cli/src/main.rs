mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use refugio_connectors::EnvSecretStore;
use refugio_core::{Settings, default_config_dir, load_settings, write_default_config_file};

use crate::commands::{check, secret, token};

#[derive(Debug, Parser)]
#[command(name = "refugio", about = "Adoption portal gateway")]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    /// Config file (default: ~/.config/refugio/refugio.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write the example config file
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Run the HTTP server
    Serve,
    /// Show where the gateway would send a request
    Check(check::CheckArgs),
    /// Mint or inspect session tokens
    Token {
        #[command(subcommand)]
        command: token::TokenCommands,
    },
    /// Signing secret helpers
    Secret {
        #[command(subcommand)]
        command: secret::SecretCommands,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

pub fn settings(path: Option<&PathBuf>) -> anyhow::Result<Settings> {
    Ok(load_settings(path.map(PathBuf::as_path), &EnvSecretStore)?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Init { force } => {
            let dir = cli
                .config
                .as_deref()
                .and_then(std::path::Path::parent)
                .map_or_else(default_config_dir, std::path::Path::to_path_buf);
            let path = write_default_config_file(&dir, force)?;
            pout(
                cli.json,
                serde_json::json!({"message":"init complete","config_file":path}),
                &format!("Wrote {}", path.display()),
            )?;
        }
        Commands::Serve => {
            let settings = settings(cli.config.as_ref())?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(refugio_server::serve(&settings))?;
        }
        Commands::Check(args) => check::cmd_check(&args, cli.config.as_ref(), cli.json)?,
        Commands::Token { command } => token::cmd_token(command, cli.config.as_ref(), cli.json)?,
        Commands::Secret { command } => secret::cmd_secret(&command, cli.json)?,
    }

    Ok(())
}

pub fn pout(json_mode: bool, value: serde_json::Value, text: &str) -> anyhow::Result<()> {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{text}");
    }
    Ok(())
}
