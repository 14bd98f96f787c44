mod api;
mod app;
mod auth;
mod commands;
mod config;
mod event;
mod logging;
mod lookup;
mod storage;
mod tasks;
#[cfg(test)]
mod testing;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use storage::{KeyValueStore, MemoryStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "fieldsync")]
#[command(about = "Field-service task list for the terminal, usable offline")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/fieldsync/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Include tasks from this many past days
  #[arg(short, long)]
  past_days: Option<u32>,

  /// Keep everything in memory; nothing is read from or written to disk
  #[arg(long)]
  no_cache: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init()?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override scope if specified on command line
  let config = if let Some(past_days) = args.past_days {
    config::Config {
      default_past_days: past_days,
      ..config
    }
  } else {
    config
  };

  let store: Arc<dyn KeyValueStore> = if args.no_cache {
    Arc::new(MemoryStore::new())
  } else {
    match SqliteStore::open() {
      Ok(store) => Arc::new(store),
      Err(e) => {
        warn!(error = %e, "cache database unavailable, continuing in memory");
        Arc::new(MemoryStore::new())
      }
    }
  };
  info!(base_url = %config.api.base_url, no_cache = args.no_cache, "starting");

  // Initialize and run the app
  let events = event::EventHandler::new();
  let mut app = app::App::new(config, store, &events)?;
  app.run(events).await?;

  Ok(())
}
