//! skyup
//!
//! Firmware and data updater for Skytraxx varios

use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use skyup_core::Language;

mod app;
mod config;
mod render;

use config::Config;

#[derive(Parser)]
#[command(name = "skyup")]
#[command(version, about = "Update Skytraxx varios over USB", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface language (en, de); defaults to the system locale
    #[arg(long)]
    lang: Option<String>,

    /// Use this mount point instead of searching for the vario
    #[arg(long)]
    mount: Option<PathBuf>,

    /// Development mode, skips self-update
    #[arg(long)]
    dev: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    init_tracing(&config.log.level, cli.json_logs);

    let locale = cli
        .lang
        .or_else(|| std::env::var("LANG").ok())
        .unwrap_or_default();
    let language = Language::from_locale(&locale);

    println!("SKYUP v{}", app::VERSION);

    app::run(
        config,
        app::Options {
            language,
            dev: cli.dev,
            mount_path: cli.mount,
        },
    )
    .await?;

    Ok(())
}
