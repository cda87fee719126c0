mod app;
mod bugzilla;
mod cache;
mod config;
mod event;
mod gate;
mod query;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "team-gates")]
#[command(about = "Release gate dashboard for team bug backlogs")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./team-gates.yaml or $XDG_CONFIG_HOME/team-gates/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Open this team's gates directly
  #[arg(short, long)]
  team: Option<String>,
}

/// Log to a file under the data directory; the terminal belongs to the dashboard.
///
/// Verbosity comes from TEAM_GATES_LOG (EnvFilter syntax), `info` by default.
fn init_logging() -> Result<WorkerGuard> {
  let log_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("team-gates");

  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let appender = tracing_appender::rolling::never(&log_dir, "team-gates.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env("TEAM_GATES_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_logging()?;

  let config = config::Config::load(args.config.as_deref())?;
  tracing::info!(
    teams = config.teams.len(),
    releases = ?config.releases,
    "configuration loaded"
  );

  let mut app = app::App::new(config, args.team)?;
  app.run().await?;

  Ok(())
}
