mod app;
mod cli;
mod config;
mod db;
mod logging;
mod offline;
mod progress;
mod vocab;

use clap::Parser;
use color_eyre::Result;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.data_dir()?, &config.log_level, args.verbose)?;

  // Validation only reads a local file; skip opening storage and the cache
  if let Command::Validate { file, min, max } = &args.command {
    return app::validate_file(file, *min, *max);
  }

  let mut app = app::App::new(config, args.ephemeral, args.retries).await?;
  app.run(args.command).await?;

  Ok(())
}
