use std::io;
use std::time::Duration;
use thiserror::Error;

/// Invalid sweep or scenario configuration. Fatal before any scenario runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("node count must be at least 1")]
    NoNodes,
    #[error("simulation time must be a positive number of seconds, got {0}")]
    InvalidSimTime(f64),
    #[error("packet size must be at least 1 byte")]
    EmptyPacket,
    #[error("packet interval must be a positive number of seconds, got {0}")]
    InvalidInterval(f64),
    #[error("transmit power must be a finite dBm value, got {0}")]
    InvalidTxPower(f64),
    #[error("`{0}` must contain at least one value")]
    EmptyAxis(&'static str),
    #[error("scenario timeout must be a positive number of seconds, got {0}")]
    InvalidTimeout(f64),
}

/// Failure of the network engine for a single scenario.
///
/// The sweep driver records the grid point as failed and moves on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("scenario parameters rejected: {0}")]
    InvalidParameters(#[from] ConfigError),
    #[error("address pool {subnet} exhausted: {requested} hosts requested, {available} available")]
    AddressExhausted {
        subnet: String,
        requested: u32,
        available: u32,
    },
    #[error("scenario exceeded its wall-clock budget of {0:?}")]
    DeadlineExceeded(Duration),
    #[error("scenario environment used after teardown")]
    TornDown,
    #[error("engine failure: {0}")]
    Backend(String),
}

/// Errors that abort a whole sweep.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
}
