//! Pages and assets that links resolve to.
//!
//! The transform engine only needs to ask two questions of a link target:
//! is it a page, and is it an asset? [`PageRepository`] and
//! [`AssetRepository`] answer them. Lookups take the active
//! [`ContextStack`](weft_url::ContextStack) because membership in the site
//! depends on the current site root.
//!
//! Provided repositories:
//! - [`MemoryPages`]: pages registered up front (from `[[pages]]` config or tests)
//! - [`MemoryAssets`]: assets held in memory, including generated content
//! - [`FsAssets`]: files under a directory, addressed by site path

mod asset;
mod error;
mod fs;
mod memory;
mod page;

pub use asset::{Asset, AssetRepository, ImageInfo, generated_name};
pub use error::SiteError;
pub use fs::FsAssets;
pub use memory::{MemoryAssets, MemoryPages};
pub use page::{Page, PageRepository};
