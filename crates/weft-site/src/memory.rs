//! In-memory repositories.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use weft_url::{ContextStack, Url};

use crate::asset::{Asset, AssetRepository, generated_name, public_url, site_url};
use crate::error::SiteError;
use crate::page::{Page, PageRepository};

/// Pages registered up front, matched by path.
///
/// A link matches a page when it lies in the site and its path, after the
/// trailing-slash policy is applied, equals the page's path. Query and
/// fragment are ignored.
///
/// # Example
///
/// ```
/// use weft_site::{MemoryPages, Page, PageRepository};
/// use weft_url::{ContextStack, Url};
///
/// let site = Url::parse("https://example.com/", &ContextStack::new()).unwrap();
/// let contexts = ContextStack::new().with_site(site);
/// let about = Url::parse("/about/", &contexts).unwrap();
/// let pages = MemoryPages::new().with_page(Page::new("About", about));
///
/// let link = Url::parse("/about?ref=nav", &contexts).unwrap();
/// assert_eq!(pages.get(&link, &contexts).unwrap().title(), "About");
/// ```
#[derive(Debug, Default)]
pub struct MemoryPages {
    pages: HashMap<String, Arc<Page>>,
}

impl MemoryPages {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page. A later page with the same path replaces the earlier.
    #[must_use]
    pub fn with_page(mut self, page: Page) -> Self {
        self.insert(page);
        self
    }

    pub fn insert(&mut self, page: Page) {
        let mut key = page.url().clone();
        key.fix_slashes();
        self.pages.insert(key.path().to_owned(), Arc::new(page));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl PageRepository for MemoryPages {
    fn get(&self, url: &Url, contexts: &ContextStack) -> Option<Arc<Page>> {
        if !url.in_site(contexts) {
            return None;
        }
        let mut key = url.clone();
        key.fix_slashes();
        self.pages.get(key.path()).map(Arc::clone)
    }
}

/// Assets held in memory, keyed by site path.
///
/// Public URLs are the configured prefix followed by the site path.
/// Generated content is added to the same map, so it can be looked up
/// afterwards like any other asset.
#[derive(Debug)]
pub struct MemoryAssets {
    prefix: String,
    assets: RwLock<HashMap<String, Arc<Asset>>>,
}

impl Default for MemoryAssets {
    fn default() -> Self {
        Self::new("/")
    }
}

impl MemoryAssets {
    /// Create an empty repository publishing under `prefix`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            assets: RwLock::new(HashMap::new()),
        }
    }

    /// Add an asset at a site path (no leading slash, e.g. `img/logo.png`).
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::Url`] if the site path cannot form a URL.
    pub fn insert(
        &self,
        site_path: &str,
        content: Vec<u8>,
        contexts: &ContextStack,
    ) -> Result<Arc<Asset>, SiteError> {
        let site_path = site_path.trim_start_matches('/');
        let url = site_url(site_path, contexts)?;
        let asset = Asset::new(url, public_url(&self.prefix, site_path), content);
        Ok(self.store(site_path, asset))
    }

    /// Add a fully built asset at a site path.
    pub fn insert_asset(&self, site_path: &str, asset: Asset) -> Arc<Asset> {
        self.store(site_path.trim_start_matches('/'), asset)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store(&self, site_path: &str, asset: Asset) -> Arc<Asset> {
        let asset = Arc::new(asset);
        self.assets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(site_path.to_owned(), Arc::clone(&asset));
        asset
    }
}

impl AssetRepository for MemoryAssets {
    fn get(&self, url: &Url, contexts: &ContextStack) -> Option<Arc<Asset>> {
        let site_path = url.site_full_path(contexts)?;
        self.assets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&site_path)
            .map(Arc::clone)
    }

    fn from_generated_content(
        &self,
        content: Vec<u8>,
        url: Option<&Url>,
        extension: Option<&str>,
        contexts: &ContextStack,
    ) -> Result<Arc<Asset>, SiteError> {
        let site_path = generated_name(&content, url, extension);
        if let Some(existing) = self
            .assets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&site_path)
        {
            return Ok(Arc::clone(existing));
        }
        tracing::debug!(path = %site_path, size = content.len(), "Storing generated asset");
        self.insert(&site_path, content, contexts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use static_assertions::assert_impl_all;

    assert_impl_all!(MemoryPages: Send, Sync);
    assert_impl_all!(MemoryAssets: Send, Sync);

    fn contexts() -> ContextStack {
        let site = Url::parse("https://example.com/docs/", &ContextStack::new()).unwrap();
        ContextStack::new().with_site(site)
    }

    fn page(path: &str, contexts: &ContextStack) -> Page {
        Page::new(path, Url::parse(path, contexts).unwrap())
    }

    #[test]
    fn test_pages_match_with_trailing_slash_policy() {
        let contexts = contexts();
        let pages = MemoryPages::new().with_page(page("/docs/guide/", &contexts));

        let link = Url::parse("/docs/guide", &contexts).unwrap();
        let found = pages.get(&link, &contexts).unwrap();
        assert_eq!(found.url().path(), "/docs/guide/");
    }

    #[test]
    fn test_pages_ignore_query_and_fragment() {
        let contexts = contexts();
        let pages = MemoryPages::new().with_page(page("/docs/a.html", &contexts));
        let link = Url::parse("/docs/a.html?x=1#top", &contexts).unwrap();
        assert!(pages.get(&link, &contexts).is_some());
    }

    #[test]
    fn test_pages_outside_site_not_found() {
        let contexts = contexts();
        let pages = MemoryPages::new().with_page(page("/docs/guide/", &contexts));
        let link = Url::parse("https://other.com/docs/guide/", &contexts).unwrap();
        assert!(pages.get(&link, &contexts).is_none());
    }

    #[test]
    fn test_page_status_defaults_to_ok() {
        let contexts = contexts();
        assert_eq!(page("/docs/", &contexts).status(), 200);
        assert_eq!(page("/docs/", &contexts).with_status(404).status(), 404);
    }

    #[test]
    fn test_assets_by_site_path() {
        let contexts = contexts();
        let assets = MemoryAssets::new("https://cdn.example.com/");
        assets.insert("img/logo.png", vec![1, 2, 3], &contexts).unwrap();

        let link = Url::parse("/docs/img/logo.png", &contexts).unwrap();
        let found = assets.get(&link, &contexts).unwrap();
        assert_eq!(found.public_url(), "https://cdn.example.com/img/logo.png");
        assert_eq!(found.url().path(), "/docs/img/logo.png");
        assert_eq!(found.size(), 3);
        assert!(found.as_image().is_some());
    }

    #[test]
    fn test_assets_are_keyed_by_namespace() {
        let contexts = contexts();
        let assets = MemoryAssets::new("/static/");
        assets.insert("~v1/logo.png", vec![1], &contexts).unwrap();

        let versioned = Url::parse("/docs/~v1/logo.png", &contexts).unwrap();
        let found = assets.get(&versioned, &contexts).unwrap();
        assert_eq!(found.public_url(), "/static/~v1/logo.png");

        let plain = Url::parse("/docs/logo.png", &contexts).unwrap();
        assert!(assets.get(&plain, &contexts).is_none());
    }

    #[test]
    fn test_assets_outside_site_not_found() {
        let contexts = contexts();
        let assets = MemoryAssets::default();
        assets.insert("a.pdf", Vec::new(), &contexts).unwrap();
        let link = Url::parse("/elsewhere/a.pdf", &contexts).unwrap();
        assert!(assets.get(&link, &contexts).is_none());
    }

    #[test]
    fn test_generated_content_is_stored_and_deduplicated() {
        let contexts = contexts();
        let assets = MemoryAssets::new("/static");

        let first = assets
            .from_generated_content(b"<svg/>".to_vec(), None, Some("svg"), &contexts)
            .unwrap();
        let second = assets
            .from_generated_content(b"<svg/>".to_vec(), None, Some("svg"), &contexts)
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(assets.len(), 1);

        assert!(first.public_url().starts_with("/static/_generated/"));
        assert_eq!(first.mime(), "image/svg+xml");
        let found = assets.get(first.url(), &contexts).unwrap();
        assert!(Arc::ptr_eq(&first, &found));
    }

    #[test]
    fn test_generated_content_without_site() {
        let contexts = ContextStack::new();
        let assets = MemoryAssets::default();
        let asset = assets
            .from_generated_content(b"data".to_vec(), None, None, &contexts)
            .unwrap();
        assert!(asset.url().path().starts_with("/_generated/"));
        assert_eq!(asset.extension(), "bin");
    }
}
