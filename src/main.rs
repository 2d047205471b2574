mod app;
mod cache;
mod commands;
mod config;
mod debounce;
mod event;
mod filters;
mod form;
mod logging;
mod mutations;
mod policy;
mod popular;
mod query;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "takaful")]
#[command(about = "A terminal UI for browsing and managing Takaful insurance policies")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/takaful/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Policy service base URL, overriding api.url from the config
  #[arg(short, long)]
  api_url: Option<String>,

  /// Screen to open on start
  #[arg(short, long, value_enum, default_value_t)]
  view: app::RootView,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init()?;

  let config = config::Config::load_with_api_url(args.config.as_deref(), args.api_url)?;

  let mut app = app::App::new(config, args.view)?;
  app.run().await?;

  Ok(())
}
