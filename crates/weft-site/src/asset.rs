//! Asset values and lookup.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use weft_url::{ContextStack, Url};

use crate::error::SiteError;

/// Directory (relative to the site root) that holds generated content.
pub(crate) const GENERATED_DIR: &str = "_generated";

/// Hex characters of the content hash used in generated file names.
const GENERATED_HASH_LEN: usize = 16;

/// Extension for generated content when none is given or derivable.
const FALLBACK_EXTENSION: &str = "bin";

/// Image-specific facts about an asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageInfo {
    /// Image subtype from the MIME type (`png`, `svg+xml`, ...).
    pub format: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ImageInfo {
    /// Image info for a MIME type, `None` unless it is `image/*`.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        mime.strip_prefix("image/").map(|format| Self {
            format: format.to_owned(),
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// A file links can point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    title: String,
    url: Url,
    public_url: String,
    extension: String,
    mime: String,
    content: Vec<u8>,
    image: Option<ImageInfo>,
}

impl Asset {
    /// Build an asset, deriving extension, MIME type and image capability
    /// from the URL.
    #[must_use]
    pub fn new(url: Url, public_url: impl Into<String>, content: Vec<u8>) -> Self {
        let mime = mime_guess::from_path(url.path_file())
            .first_or_octet_stream()
            .to_string();
        Self {
            title: url.path_file().to_owned(),
            extension: url.extension().unwrap_or_default(),
            image: ImageInfo::from_mime(&mime),
            mime,
            url,
            public_url: public_url.into(),
            content,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Override the image info, or clear it with `None`.
    #[must_use]
    pub fn with_image(mut self, image: Option<ImageInfo>) -> Self {
        self.image = image;
        self
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Site URL the asset is addressed by.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// URL the asset is delivered from. Links to the asset are rewritten to it.
    #[must_use]
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    /// Lowercase extension without the dot, empty when the name has none.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Content length in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Image capability, present for `image/*` assets.
    #[must_use]
    pub fn as_image(&self) -> Option<&ImageInfo> {
        self.image.as_ref()
    }
}

/// Source of assets for link resolution.
pub trait AssetRepository: Send + Sync {
    /// Find the asset a URL refers to under the active contexts.
    fn get(&self, url: &Url, contexts: &ContextStack) -> Option<Arc<Asset>>;

    /// Store generated content and return it as an asset.
    ///
    /// The file name is derived from the content hash, so identical content
    /// always maps to the same asset. The extension is `extension` when
    /// given, else the extension of `url`, else `bin`.
    fn from_generated_content(
        &self,
        content: Vec<u8>,
        url: Option<&Url>,
        extension: Option<&str>,
        contexts: &ContextStack,
    ) -> Result<Arc<Asset>, SiteError>;
}

/// Site path of generated content: `_generated/<sha256-prefix>.<ext>`.
#[must_use]
pub fn generated_name(content: &[u8], url: Option<&Url>, extension: Option<&str>) -> String {
    let digest = hex::encode(Sha256::digest(content));
    let extension = extension
        .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .or_else(|| url.and_then(Url::extension))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_owned());
    format!("{GENERATED_DIR}/{}.{extension}", &digest[..GENERATED_HASH_LEN])
}

/// Site URL for a path relative to the site root (or to `/` without a site).
pub(crate) fn site_url(site_path: &str, contexts: &ContextStack) -> Result<Url, SiteError> {
    let input = if contexts.site().is_some() {
        format!("@/{site_path}")
    } else {
        format!("/{site_path}")
    };
    Ok(Url::parse(&input, contexts)?)
}

/// Join a public prefix and a site path with exactly one slash between.
pub(crate) fn public_url(prefix: &str, site_path: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), site_path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn url(input: &str) -> Url {
        Url::parse(input, &ContextStack::new()).unwrap()
    }

    #[test]
    fn test_asset_derives_type_from_name() {
        let asset = Asset::new(url("https://e.com/files/Report.PDF"), "/assets/files/Report.PDF", vec![0; 42]);
        assert_eq!(asset.title(), "Report.PDF");
        assert_eq!(asset.extension(), "pdf");
        assert_eq!(asset.mime(), "application/pdf");
        assert_eq!(asset.size(), 42);
        assert!(asset.as_image().is_none());
    }

    #[test]
    fn test_image_asset_has_image_info() {
        let asset = Asset::new(url("https://e.com/logo.png"), "/logo.png", Vec::new());
        assert_eq!(asset.mime(), "image/png");
        assert_eq!(asset.as_image().map(|i| i.format.as_str()), Some("png"));
    }

    #[test]
    fn test_unknown_extension_is_octet_stream() {
        let asset = Asset::new(url("https://e.com/blob"), "/blob", Vec::new());
        assert_eq!(asset.mime(), "application/octet-stream");
        assert_eq!(asset.extension(), "");
    }

    #[test]
    fn test_generated_name_is_content_addressed() {
        let a = generated_name(b"hello", None, Some("txt"));
        let b = generated_name(b"hello", None, Some(".TXT"));
        assert_eq!(a, "_generated/2cf24dba5fb0a30e.txt");
        assert_eq!(a, b);
        assert_ne!(a, generated_name(b"world", None, Some("txt")));
    }

    #[test]
    fn test_generated_name_extension_fallbacks() {
        let from_url = generated_name(b"x", Some(&url("https://e.com/chart.svg")), None);
        assert!(from_url.ends_with(".svg"), "{from_url}");
        let fallback = generated_name(b"x", None, None);
        assert!(fallback.ends_with(".bin"), "{fallback}");
    }

    #[test]
    fn test_public_url_joins_with_single_slash() {
        assert_eq!(public_url("/assets/", "/img/a.png"), "/assets/img/a.png");
        assert_eq!(public_url("https://cdn.e.com", "a.png"), "https://cdn.e.com/a.png");
    }
}
