//! CLI error types.

use weft_config::ConfigError;
use weft_dom::TransformError;
use weft_url::UrlError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Url(#[from] UrlError),

    #[error("{0}")]
    Transform(#[from] TransformError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}
