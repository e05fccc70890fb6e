//! Feedesk main entry point

mod demo;

use anyhow::{anyhow, Context};
use clap::Parser;
use feedesk_api::start_server;
use feedesk_config::Config;
use feedesk_core::FeeBook;
use feedesk_gateway::{GatewayRef, HttpGateway};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "feedesk")]
#[command(version = "0.1.0")]
#[command(about = "A lightweight web front end for spreadsheet-backed school fee records", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print the default configuration file and exit
    #[arg(long)]
    print_default_config: bool,

    /// Serve built-in sample data instead of the remote spreadsheet
    #[arg(long)]
    demo: bool,
}

/// Configuration for a normal run: the file must exist and validate
fn load_config(path: PathBuf) -> anyhow::Result<Config> {
    Config::load(path).map_err(|e| anyhow!("{}", e.to_details()))
}

/// Configuration for a demo run: the file is optional and the endpoint is not needed
fn load_demo_config(path: PathBuf) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Config::from_yaml(&content).map_err(|e| anyhow!("{}", e.to_details()))
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let config = if args.demo {
        load_demo_config(args.config.clone())?
    } else {
        load_config(args.config.clone())?
    };
    init_logging(&config.logging.level);
    log::info!("Config loaded from {}", args.config.display());

    let gateway: GatewayRef = if args.demo {
        log::warn!("Demo mode: changes are kept in memory and lost on exit");
        Arc::new(demo::gateway(&config))
    } else {
        let gateway = HttpGateway::new(
            &config.gateway.endpoint,
            Duration::from_secs(config.gateway.timeout_secs),
        )
        .context("Failed to create the spreadsheet gateway")?;
        log::info!("Using spreadsheet endpoint {}", gateway.endpoint().host_str().unwrap_or("?"));
        Arc::new(gateway)
    };

    let book = Arc::new(FeeBook::new(config.clone(), gateway));
    let stats = book.refresh_all().await;
    log::info!(
        "Loaded {} students, {} transactions, {} expenses, {} staff",
        stats.students,
        stats.transactions,
        stats.expenses,
        stats.staff
    );
    if stats.issues > 0 {
        log::warn!("{} amount cells could not be read; see the dashboard", stats.issues);
    }

    start_server(config, book)
        .await
        .context("Server stopped with an error")
}
