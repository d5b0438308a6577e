//! Error types for repositories.

use std::path::PathBuf;

use weft_url::UrlError;

/// Error raised by a page or asset repository.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SiteError {
    /// Reading or writing an asset file failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A repository URL could not be built.
    #[error(transparent)]
    Url(#[from] UrlError),
}
