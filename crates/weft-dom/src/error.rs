//! Error types for the transform engine.

use std::error::Error as StdError;

use weft_url::UrlError;

/// Markup the parser could not turn into a tree.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("elements nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// Failure reported by a listener.
///
/// Listener errors are never swallowed: they abort the transform that
/// dispatched the event.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ListenerError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ListenerError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error returned by [`Transformer::transform`](crate::Transformer::transform).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransformError {
    /// A listener failed; no output is produced.
    #[error("listener for `{key}` failed")]
    Listener {
        key: String,
        #[source]
        source: ListenerError,
    },

    /// A context declaration in the markup holds an unusable URL.
    #[error("invalid context URL `{url}`")]
    Context {
        url: String,
        #[source]
        source: UrlError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_error_chain() {
        let io = std::io::Error::other("disk gone");
        let err = TransformError::Listener {
            key: "element:a".to_owned(),
            source: ListenerError::new("lookup failed").with_source(io),
        };
        assert_eq!(err.to_string(), "listener for `element:a` failed");

        let listener = err.source().unwrap();
        assert_eq!(listener.to_string(), "lookup failed");
        assert_eq!(listener.source().unwrap().to_string(), "disk gone");
    }

    #[test]
    fn test_parse_error_message() {
        let err = ParseError::TooDeep { limit: 512 };
        assert_eq!(err.to_string(), "elements nested deeper than 512 levels");
    }

    #[test]
    fn test_context_error_message() {
        let err = TransformError::Context {
            url: "ftp://x".to_owned(),
            source: UrlError::UnsupportedScheme("ftp".to_owned()),
        };
        assert_eq!(err.to_string(), "invalid context URL `ftp://x`");
    }
}
