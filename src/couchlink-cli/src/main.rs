use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use couchlink_cli::commands::{self, Command};
use couchlink_rs::{Client, ClientConfig};

mod telemetry;

#[derive(Debug, Parser)]
#[command(name = "couchlink", version, about = "CouchDB command line client")]
struct Cli {
    /// JSON client config file
    #[arg(long, default_value = "couchlink.json")]
    config: String,

    /// Server URL, overriding the config file
    #[arg(long)]
    server: Option<String>,

    /// Directory for rotated log files
    #[arg(long, default_value = "./logs")]
    log_dir: PathBuf,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = telemetry::init_telemetry(&cli.log_dir, cli.verbose)?;

    // Load configuration
    let mut config = ClientConfig::load(&cli.config).unwrap_or_else(|_| {
        tracing::warn!("Failed to load {}, using defaults", cli.config);
        ClientConfig::default()
    });
    if let Some(server) = cli.server {
        config.server_url = server;
    }

    tracing::debug!(server_url = %config.server_url, command = ?cli.command, "couchlink starting");

    let client = Client::new(config)?;
    let output = commands::run(&client, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
