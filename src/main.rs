use std::path::PathBuf;

use anyhow::{Context, Result};
use raincheck_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path(std::env::args().skip(1))?;

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    raincheck_core::init_logging(&config.logging).context("Failed to initialize logging")?;
    config.ensure_valid()?;

    tracing::info!("raincheck {} starting", env!("CARGO_PKG_VERSION"));
    raincheck_bot::run(config).await
}

/// `--config <path>` (or `--config=<path>`), defaulting to `config/config.toml`
fn config_path(mut args: impl Iterator<Item = String>) -> Result<PathBuf> {
    let mut path = Config::default_path();

    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            let value = args.next().context("--config requires a path")?;
            path = PathBuf::from(value);
        } else if let Some(value) = arg.strip_prefix("--config=") {
            path = PathBuf::from(value);
        } else {
            anyhow::bail!("Unknown argument: {}", arg);
        }
    }

    Ok(path)
}
