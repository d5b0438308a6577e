//! Link canonicalization listeners.
//!
//! [`install_links`] registers a [`LinkCanonicalizer`] for each
//! [`LinkTarget`] and, for anchor-like targets, the [`LinkMetadata`]
//! listeners that decorate resolved links.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use weft_site::{AssetRepository, PageRepository};
use weft_url::Url;

use crate::bus::{EventBus, Listener};
use crate::error::ListenerError;
use crate::event::{DomEvent, EventKey, Source};

const DATA_URI_PREFIX: &str = "data:";
const MAILTO_PREFIX: &str = "mailto:";

/// An element attribute holding a link to canonicalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    /// Element tag (lowercase).
    pub tag: String,
    /// Attribute holding the URL.
    pub attribute: String,
    /// Resolve against the page repository.
    pub pages: bool,
    /// Resolve against the asset repository.
    pub assets: bool,
    /// Annotate with `data-host`/`data-insite`, obfuscate `mailto:` links
    /// and add page/asset metadata.
    pub annotate_host: bool,
}

impl LinkTarget {
    /// Asset-only target for `tag[attribute]`.
    #[must_use]
    pub fn new(tag: &str, attribute: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attribute: attribute.to_ascii_lowercase(),
            pages: false,
            assets: true,
            annotate_host: false,
        }
    }

    #[must_use]
    pub fn with_pages(mut self, pages: bool) -> Self {
        self.pages = pages;
        self
    }

    #[must_use]
    pub fn with_assets(mut self, assets: bool) -> Self {
        self.assets = assets;
        self
    }

    #[must_use]
    pub fn with_annotate_host(mut self, annotate: bool) -> Self {
        self.annotate_host = annotate;
        self
    }

    /// `a[href]` for pages and assets, plus `img[src]`, `source[src]` and
    /// `link[href]` for assets.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("a", "href").with_pages(true).with_annotate_host(true),
            Self::new("img", "src"),
            Self::new("source", "src"),
            Self::new("link", "href"),
        ]
    }
}

/// Rewrites one link attribute to the canonical URL of what it points at.
pub struct LinkCanonicalizer {
    target: LinkTarget,
    pages: Arc<dyn PageRepository>,
    assets: Arc<dyn AssetRepository>,
}

impl LinkCanonicalizer {
    #[must_use]
    pub fn new(
        target: LinkTarget,
        pages: Arc<dyn PageRepository>,
        assets: Arc<dyn AssetRepository>,
    ) -> Self {
        Self {
            target,
            pages,
            assets,
        }
    }

    #[must_use]
    pub fn target(&self) -> &LinkTarget {
        &self.target
    }

    fn resolve(&self, event: &mut DomEvent<'_>, url: &Url) -> Result<(), ListenerError> {
        let contexts = event.contexts();
        let tag = event.tag().to_owned();
        let attribute = &self.target.attribute;

        if self.target.pages
            && let Some(page) = self.pages.get(url, contexts)
        {
            let canonical = page.url().clone().with_fragment(url.fragment());
            event.set_attr(attribute, canonical.to_string());
            event.set_attr("data-link-type", "page");
            if let Some(namespace) = page.url().site_namespace(contexts) {
                event.set_attr("data-namespace", namespace);
            }
            if page.status() != 200 {
                event.set_attr("data-page-status", page.status().to_string());
            }
            tracing::trace!(url = %url.log_string(), page = %canonical, "Resolved page link");
            event.set_source(Source::Page(page));
            return event.dispatch(&EventKey::page(&tag));
        }

        if self.target.assets
            && let Some(asset) = self.assets.get(url, contexts)
        {
            event.set_attr("data-link-type", "asset");
            if let Some(namespace) = asset.url().site_namespace(contexts) {
                event.set_attr("data-namespace", namespace);
            }
            let public_url = asset.public_url().to_owned();
            tracing::trace!(url = %url.log_string(), asset = %public_url, "Resolved asset link");
            event.set_source(Source::Asset(asset));
            event.dispatch(&EventKey::asset(&tag))?;

            if event.source().is_some_and(Source::is_image) {
                event.set_attr("data-link-type", "image");
                event.dispatch(&EventKey::image(&tag))?;
            }
            event.set_attr(attribute, public_url);
            return Ok(());
        }

        tracing::trace!(url = %url.log_string(), "Link target not found");
        Ok(())
    }
}

impl Listener for LinkCanonicalizer {
    fn handle(&self, event: &mut DomEvent<'_>) -> Result<(), ListenerError> {
        let Some(value) = event.attr(&self.target.attribute) else {
            return Ok(());
        };
        let value = value.trim().to_owned();
        if value.is_empty() || value.starts_with(DATA_URI_PREFIX) {
            return Ok(());
        }

        if self.target.annotate_host && value.starts_with(MAILTO_PREFIX) {
            let markup = STANDARD.encode(event.outer_html());
            event.set_replacement(format!(
                r#"<script>document.write(atob("{markup}"));</script><noscript>[js required]</noscript>"#
            ));
            return Ok(());
        }

        let url = match Url::parse(&value, event.contexts()) {
            Ok(url) => url,
            Err(e) => {
                tracing::trace!(link = %value, error = %e, "Skipping unresolvable link");
                return Ok(());
            }
        };

        if self.target.annotate_host {
            let contexts = event.contexts();
            event.set_attr("data-host", url.effective_host(contexts));
            let in_site = if url.in_site(contexts) { "true" } else { "false" };
            event.set_attr("data-insite", in_site);
        }

        self.resolve(event, &url)
    }
}

/// Adds title and file details to anchors after their link resolved.
///
/// Registered for the page and asset events of annotated targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkMetadata;

impl Listener for LinkMetadata {
    fn handle(&self, event: &mut DomEvent<'_>) -> Result<(), ListenerError> {
        let has_title = event.attr("title").is_some_and(|title| !title.is_empty());

        match event.source().cloned() {
            Some(Source::Page(page)) => {
                if !has_title {
                    event.set_attr("title", page.title());
                }
            }
            Some(Source::Asset(asset)) => {
                if !has_title {
                    event.set_attr("title", asset.title());
                }
                event.set_attr("data-extension", asset.extension());
                event.set_attr("data-size", asset.size().to_string());
                event.set_attr("type", asset.mime());
            }
            None => {}
        }
        Ok(())
    }
}

/// Register link canonicalization for each target.
pub fn install_links(
    bus: &mut EventBus,
    pages: Arc<dyn PageRepository>,
    assets: Arc<dyn AssetRepository>,
    targets: &[LinkTarget],
) {
    for target in targets {
        let tag = target.tag.clone();
        let canonicalizer =
            LinkCanonicalizer::new(target.clone(), Arc::clone(&pages), Arc::clone(&assets));
        bus.add_listener(EventKey::element(&tag), Arc::new(canonicalizer));

        if target.annotate_host {
            bus.add_listener(EventKey::page(&tag), Arc::new(LinkMetadata))
                .add_listener(EventKey::asset(&tag), Arc::new(LinkMetadata));
        }
        tracing::debug!(tag = %tag, attribute = %target.attribute, "Installed link target");
    }
}
