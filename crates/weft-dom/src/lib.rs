//! Markup transformation engine for Weft.
//!
//! A [`Transformer`] parses HTML with html5ever into an arena [`Document`], walks
//! it depth-first and hands every element, text and comment node to the
//! listeners registered on an [`EventBus`]. Listeners edit nodes in place,
//! delete them, or replace them with new markup that is walked in turn.
//! The tree is then serialized back to markup, either the whole document
//! or just the body content.
//!
//! Relative links are resolved against a [`weft_url::ContextStack`] that the
//! markup itself can scope with `data-url-context` attributes and
//! `@beginContext`/`@endContext` comments. [`install_links`] registers the
//! built-in listeners that rewrite links to canonical page and asset URLs.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use weft_dom::{EventBus, LinkTarget, Mode, Transformer, install_links};
//! use weft_site::{MemoryAssets, MemoryPages, Page};
//! use weft_url::{ContextStack, Url};
//!
//! let site = Url::parse("https://example.com/", &ContextStack::new()).unwrap();
//! let contexts = ContextStack::new().with_site(site);
//! let _page = contexts.enter(Url::parse("@/guide/", &contexts).unwrap());
//!
//! let pages = MemoryPages::new()
//!     .with_page(Page::new("FAQ", Url::parse("@/faq/", &contexts).unwrap()));
//! let mut bus = EventBus::new();
//! install_links(&mut bus, Arc::new(pages), Arc::new(MemoryAssets::default()), &LinkTarget::defaults());
//!
//! let html = Transformer::new(bus)
//!     .transform(&contexts, r#"<a href="../faq">FAQ</a>"#, Mode::Fragment)
//!     .unwrap();
//! assert!(html.starts_with(r#"<a href="https://example.com/faq/""#));
//! ```

mod bus;
mod error;
mod event;
mod links;
mod parser;
mod serializer;
mod transform;
mod tree;

pub use bus::{EventBus, HookPoint, Listener, TextHook};
pub use error::{ListenerError, ParseError, TransformError};
pub use event::{DomEvent, EventKey, Mode, Source, Target, Variant};
pub use links::{LinkCanonicalizer, LinkMetadata, LinkTarget, install_links};
pub use parser::{MAX_NESTING_DEPTH, is_raw_text, is_void, parse, parse_fragment};
pub use serializer::{apply_fixups, body_html, inner_html, outer_html, to_html};
pub use transform::{TransformConfig, Transformer};
pub use tree::{Document, Element, NodeData, NodeId};
