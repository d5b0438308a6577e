//! URL value type and resolution context stack for Weft.
//!
//! This crate provides:
//! - [`Url`]: a parsed, normalized URL whose site-relative facts (in-site test,
//!   site path, namespace) are computed against a [`ContextStack`]
//! - [`ContextStack`]: the nested stack of resolution scopes that supplies the
//!   base for relative references and the site root for in-site checks
//!
//! The context stack is an explicit handle rather than process-wide state.
//! It is single-threaded by construction; each thread that transforms
//! documents owns its own stack.
//!
//! # Example
//!
//! ```
//! use weft_url::{ContextStack, Url};
//!
//! let site = Url::parse("https://example.com/", &ContextStack::new()).unwrap();
//! let contexts = ContextStack::new().with_site(site);
//!
//! let page = Url::parse("https://example.com/guide/intro.html", &contexts).unwrap();
//! let _guard = contexts.enter(page);
//!
//! let link = Url::parse("../faq/?b=2&a=1", &contexts).unwrap();
//! assert_eq!(link.to_string(), "https://example.com/faq/?a=1&b=2");
//! assert!(link.in_site(&contexts));
//! assert_eq!(link.site_path(&contexts).as_deref(), Some("faq/"));
//! ```

mod context;
mod encode;
mod error;
mod path;
mod url;

pub use context::{ContextGuard, ContextStack, Frame};
pub use encode::{decode_base64, encode_base64};
pub use error::UrlError;
pub use url::{Scheme, Url};
