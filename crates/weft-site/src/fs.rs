//! Filesystem-backed assets.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use weft_url::{ContextStack, Url};

use crate::asset::{Asset, AssetRepository, generated_name, public_url, site_url};
use crate::error::SiteError;

/// Serves files under a directory by their site path.
///
/// `https://example.com/docs/img/a.png` with site root
/// `https://example.com/docs/` maps to `<dir>/img/a.png`. A namespace
/// segment is part of the path: `/docs/~v1/a.png` maps to `<dir>/~v1/a.png`. Generated content
/// is written to `<dir>/_generated/`.
#[derive(Debug, Clone)]
pub struct FsAssets {
    dir: PathBuf,
    prefix: String,
}

impl FsAssets {
    /// Create a repository over `dir`, publishing under `prefix`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load(&self, site_path: &str, url: Url) -> Option<Asset> {
        let path = self.dir.join(site_path);
        match std::fs::read(&path) {
            Ok(content) => Some(Asset::new(url, public_url(&self.prefix, site_path), content)),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read asset");
                None
            }
        }
    }
}

impl AssetRepository for FsAssets {
    fn get(&self, url: &Url, contexts: &ContextStack) -> Option<Arc<Asset>> {
        let site_path = url.site_full_path(contexts)?;
        if site_path.is_empty() || site_path.ends_with('/') {
            return None;
        }
        let mut asset_url = url.clone().with_fragment("");
        asset_url.set_query(BTreeMap::new());
        self.load(&site_path, asset_url).map(Arc::new)
    }

    fn from_generated_content(
        &self,
        content: Vec<u8>,
        url: Option<&Url>,
        extension: Option<&str>,
        contexts: &ContextStack,
    ) -> Result<Arc<Asset>, SiteError> {
        let site_path = generated_name(&content, url, extension);
        let path = self.dir.join(&site_path);

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|source| SiteError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            std::fs::write(&path, &content).map_err(|source| SiteError::Io {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(path = %path.display(), size = content.len(), "Wrote generated asset");
        }

        let asset_url = site_url(&site_path, contexts)?;
        Ok(Arc::new(Asset::new(
            asset_url,
            public_url(&self.prefix, &site_path),
            content,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn contexts() -> ContextStack {
        let site = Url::parse("https://example.com/docs/", &ContextStack::new()).unwrap();
        ContextStack::new().with_site(site)
    }

    #[test]
    fn test_get_reads_file_by_site_path() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("img")).unwrap();
        std::fs::write(temp.path().join("img/photo.jpg"), b"jpegdata").unwrap();

        let assets = FsAssets::new(temp.path(), "/assets/");
        let contexts = contexts();
        let link = Url::parse("https://example.com/docs/img/photo.jpg?v=2", &contexts).unwrap();

        let asset = assets.get(&link, &contexts).unwrap();
        assert_eq!(asset.public_url(), "/assets/img/photo.jpg");
        assert_eq!(asset.mime(), "image/jpeg");
        assert_eq!(asset.size(), 8);
        assert_eq!(asset.content(), b"jpegdata");
        assert!(asset.as_image().is_some());
        assert!(asset.url().query().is_empty());
    }

    #[test]
    fn test_get_keeps_namespace_segment() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("~v1")).unwrap();
        std::fs::write(temp.path().join("~v1/logo.png"), b"old").unwrap();
        std::fs::write(temp.path().join("logo.png"), b"current").unwrap();

        let assets = FsAssets::new(temp.path(), "/assets/");
        let contexts = contexts();

        let versioned = Url::parse("/docs/~v1/logo.png", &contexts).unwrap();
        let asset = assets.get(&versioned, &contexts).unwrap();
        assert_eq!(asset.public_url(), "/assets/~v1/logo.png");
        assert_eq!(asset.content(), b"old");

        let current = Url::parse("/docs/logo.png", &contexts).unwrap();
        let asset = assets.get(&current, &contexts).unwrap();
        assert_eq!(asset.public_url(), "/assets/logo.png");
        assert_eq!(asset.content(), b"current");
    }

    #[test]
    fn test_get_missing_file() {
        let temp = TempDir::new().unwrap();
        let assets = FsAssets::new(temp.path(), "/");
        let contexts = contexts();
        let link = Url::parse("/docs/missing.css", &contexts).unwrap();
        assert!(assets.get(&link, &contexts).is_none());
    }

    #[test]
    fn test_get_directory_is_not_an_asset() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("sub")).unwrap();
        let assets = FsAssets::new(temp.path(), "/");
        let contexts = contexts();
        let link = Url::parse("/docs/sub/", &contexts).unwrap();
        assert!(assets.get(&link, &contexts).is_none());
    }

    #[test]
    fn test_get_outside_site() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.txt"), b"a").unwrap();
        let assets = FsAssets::new(temp.path(), "/");
        let contexts = contexts();
        let link = Url::parse("https://other.com/docs/a.txt", &contexts).unwrap();
        assert!(assets.get(&link, &contexts).is_none());
    }

    #[test]
    fn test_generated_content_written_to_disk() {
        let temp = TempDir::new().unwrap();
        let assets = FsAssets::new(temp.path(), "/assets");
        let contexts = contexts();

        let asset = assets
            .from_generated_content(b"body{}".to_vec(), None, Some("css"), &contexts)
            .unwrap();
        let relative = asset.public_url().strip_prefix("/assets/").unwrap();
        assert!(relative.starts_with("_generated/"));
        assert_eq!(std::fs::read(temp.path().join(relative)).unwrap(), b"body{}");
        assert_eq!(asset.mime(), "text/css");

        let found = assets.get(asset.url(), &contexts).unwrap();
        assert_eq!(found.content(), b"body{}");
    }
}
