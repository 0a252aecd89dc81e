use anyhow::Result;
use clap::{Parser, Subcommand};
use etfdash::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the dashboard API server (default)
    Serve,
    /// Fetch and save today's categorized NAV snapshot, then exit
    FetchNavs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(Commands::FetchNavs) => etfdash::run_fetch_navs(cli.config_path.as_deref()).await,
        Some(Commands::Serve) | None => etfdash::run_server(cli.config_path.as_deref()).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = etfdash::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
server:
  port: 3001

providers:
  amfi:
    base_url: "https://www.amfiindia.com"
  nse:
    base_url: "https://www.nseindia.com"
  yahoo:
    base_url: "https://query1.finance.yahoo.com"
  mfapi:
    base_url: "https://api.mfapi.in"
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
