//! Errors for the vessel console
use thiserror::Error;

use crate::state::BusyStatus;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Serialization error")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error")]
    Configuration(#[from] config::ConfigError),

    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Invalid URL")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Another operation is in progress: {0:?}")]
    Busy(BusyStatus),

    #[error("Created response carried no usable Location header")]
    MissingLocation,

    #[error("Vessel has no identity")]
    MissingIdentity,
}
