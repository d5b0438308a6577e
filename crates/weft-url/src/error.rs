//! Error types for URL resolution.

/// Error raised while constructing or resolving a [`Url`](crate::Url).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum UrlError {
    /// A relative reference was given with no active context frame.
    #[error("no active context to resolve `{0}` against")]
    NoContext(String),

    /// The `@/` site prefix was used with no site root available.
    #[error("no site root available to expand `{0}`")]
    NoSite(String),

    /// The scheme is neither `http` nor `https`.
    #[error("unsupported URL scheme `{0}`")]
    UnsupportedScheme(String),

    /// The authority carries a port that is not a valid number.
    #[error("invalid port in `{0}`")]
    InvalidPort(String),
}
