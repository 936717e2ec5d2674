pub mod config;
pub mod error;

pub use crate::config::{
    ChatConfig, Config, DispatchConfig, LoggingConfig, ProviderConfig, ThrottleConfig,
    ValidationResult,
};
pub use error::ConfigError;

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging.
///
/// `RUST_LOG` takes precedence over the configured filter. When a log file is
/// configured, every line is written to stdout and appended to that file.
pub fn init_logging(logging: &LoggingConfig) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::io::stdout.and(Mutex::new(file)))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    tracing::info!("raincheck logging initialized");
    Ok(())
}
