use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] gatecheck_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Missing configuration: --{0}. Pass it once; the value is cached for later runs.")]
    MissingConfig(&'static str),
    #[error("Backend is unreachable; connect to the network and retry")]
    Offline,
    #[error("Invalid check-in reference: {0}")]
    InvalidCheckinRef(String),
}
