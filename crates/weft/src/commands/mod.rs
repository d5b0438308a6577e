//! CLI command implementations.

pub(crate) mod transform;
pub(crate) mod url;

pub(crate) use transform::TransformArgs;
pub(crate) use url::UrlArgs;
