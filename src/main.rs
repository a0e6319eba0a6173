mod agent;
mod app;
mod cache;
mod commands;
mod config;
mod http;
mod logging;
mod net;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "offcache")]
#[command(about = "Offline-caching request agent with versioned cache namespaces")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/offcache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Origin that relative URLs and static assets resolve against
  #[arg(long)]
  origin: Option<String>,

  /// Cache version tag to treat as current
  #[arg(long)]
  version_tag: Option<String>,

  /// Cache database file
  #[arg(long)]
  database: Option<PathBuf>,

  /// Write logs to a daily-rolling file in this directory instead of stderr
  #[arg(long)]
  log_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init(args.log_dir.as_deref())?;

  // Load configuration; command line wins over file and environment
  let overrides = config::Overrides {
    origin: args.origin,
    version: args.version_tag,
    database: args.database,
  };
  let config = config::Config::load(args.config.as_deref(), overrides)?;

  let app = app::App::new(config)?;
  app.run(args.command).await?;

  Ok(())
}
