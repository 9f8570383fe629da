//! CLI error types and conversions

use crate::catalog::CatalogError;
use crate::client::ApiError;
use crate::config::ConfigError;
use crate::output::OutputError;
use crate::state::StateError;
use crate::streams::StreamError;
use crate::sync::SyncError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Catalog error
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// API error
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// State error
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Output error
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// Stream error
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    /// Sync error
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
