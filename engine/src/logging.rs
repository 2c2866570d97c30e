//! Subscriber setup for binaries. Library code only emits `tracing` events.

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

#[derive(Debug, Error)]
pub enum InitError {
    #[error("invalid log filter")]
    Filter(#[from] ParseError),
    #[error("a global subscriber is already installed")]
    Install(#[from] TryInitError),
}

/// Installs a fmt subscriber filtered by `RUST_LOG`, falling back to `default_filter`.
pub fn init(default_filter: &str) -> Result<(), InitError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .finish()
        .try_init()?;
    Ok(())
}
