//! Configuration management for Weft.
//!
//! Parses `weft.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! `site.url` supports environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! ## Example
//!
//! ```toml
//! [site]
//! url = "https://${DOCS_HOST:-localhost}/docs/"
//!
//! [engine]
//! max_replacement_depth = 5
//!
//! [[links]]
//! tag = "a"
//! attribute = "href"
//! pages = true
//! annotate_host = true
//!
//! [assets]
//! dir = "static"
//! public_prefix = "/static/"
//!
//! [[pages]]
//! path = "guide/"
//! title = "Guide"
//! ```

mod expand;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use weft_dom::{LinkTarget, TransformConfig};
use weft_site::{FsAssets, MemoryPages, Page};
use weft_url::{ContextStack, Url, UrlError};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the site root URL.
    pub site_url: Option<String>,
    /// Override the server port.
    pub server_port: Option<u16>,
    /// Override the assets directory.
    pub assets_dir: Option<PathBuf>,
    /// Override the replacement depth limit.
    pub max_replacement_depth: Option<usize>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "weft.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site root and server settings.
    pub site: SiteConfig,
    /// Transform engine settings.
    pub engine: EngineConfig,
    /// Link targets; the built-in set applies when the section is absent.
    links: Option<Vec<LinkConfig>>,
    /// Assets configuration (paths are relative strings from TOML).
    assets: AssetsConfigRaw,
    /// Pages known to the site.
    pub pages: Vec<PageConfig>,

    /// Resolved assets configuration (set after loading).
    #[serde(skip)]
    pub assets_resolved: AssetsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Site configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site root URL. Links under it are in-site.
    pub url: Option<String>,
    /// Port assumed for URLs that carry no scheme.
    pub server_port: Option<u16>,
}

/// Transform engine configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many times replacement markup may itself be replaced.
    pub max_replacement_depth: usize,
    /// Attribute that disables events for a subtree when set to `off`.
    pub events_attribute: String,
    /// Attribute declaring the resolution context of a subtree.
    pub context_attribute: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let defaults = TransformConfig::default();
        Self {
            max_replacement_depth: defaults.max_replacement_depth,
            events_attribute: defaults.events_attribute,
            context_attribute: defaults.context_attribute,
        }
    }
}

/// One `[[links]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    /// Element tag.
    pub tag: String,
    /// Attribute holding the URL.
    pub attribute: String,
    /// Resolve against pages.
    #[serde(default)]
    pub pages: bool,
    /// Resolve against assets.
    #[serde(default = "default_true")]
    pub assets: bool,
    /// Add host metadata and obfuscate `mailto:` links.
    #[serde(default)]
    pub annotate_host: bool,
}

impl From<&LinkConfig> for LinkTarget {
    fn from(link: &LinkConfig) -> Self {
        LinkTarget::new(&link.tag, &link.attribute)
            .with_pages(link.pages)
            .with_assets(link.assets)
            .with_annotate_host(link.annotate_host)
    }
}

/// Raw assets configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct AssetsConfigRaw {
    dir: Option<String>,
    public_prefix: Option<String>,
}

/// Resolved assets configuration with absolute paths.
#[derive(Debug, Default)]
pub struct AssetsConfig {
    /// Directory assets are served from.
    pub dir: PathBuf,
    /// Prefix of public asset URLs.
    pub public_prefix: String,
}

/// One `[[pages]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PageConfig {
    /// Site path of the page, e.g. `guide/install/`.
    pub path: String,
    /// Page title.
    pub title: String,
    /// HTTP status the page is served with.
    #[serde(default = "default_status")]
    pub status: u16,
}

fn default_true() -> bool {
    true
}

fn default_status() -> u16 {
    200
}

const DEFAULT_ASSETS_DIR: &str = "assets";
const DEFAULT_PUBLIC_PREFIX: &str = "/assets/";

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`site.url`").
        field: String,
        /// Error message (e.g., "${`DOCS_HOST`} not set").
        message: String,
    },
    /// A configured URL could not be parsed.
    #[error("Invalid URL: {0}")]
    Url(#[from] UrlError),
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `weft.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading, then the result is
    /// validated again.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, or if parsing,
    /// expansion or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_from(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(url) = &settings.site_url {
            self.site.url = Some(url.clone());
        }
        if let Some(port) = settings.server_port {
            self.site.server_port = Some(port);
        }
        if let Some(dir) = &settings.assets_dir {
            self.assets_resolved.dir.clone_from(dir);
        }
        if let Some(depth) = settings.max_replacement_depth {
            self.engine.max_replacement_depth = depth;
        }
    }

    /// Search for a config file in `start` and its parents.
    fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "Discovered config file");
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            site: SiteConfig::default(),
            engine: EngineConfig::default(),
            links: None,
            assets: AssetsConfigRaw::default(),
            pages: Vec::new(),
            assets_resolved: AssetsConfig {
                dir: base.join(DEFAULT_ASSETS_DIR),
                public_prefix: DEFAULT_PUBLIC_PREFIX.to_owned(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_site()?;
        self.validate_engine()?;
        self.validate_links()?;
        self.validate_pages()?;
        Ok(())
    }

    fn validate_site(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.site.url {
            require_non_empty(url, "site.url")?;
            require_http_url(url, "site.url")?;
        }
        if self.site.server_port == Some(0) {
            return Err(ConfigError::Validation(
                "site.server_port cannot be 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_engine(&self) -> Result<(), ConfigError> {
        if self.engine.max_replacement_depth == 0 {
            return Err(ConfigError::Validation(
                "engine.max_replacement_depth must be greater than 0".to_owned(),
            ));
        }
        require_non_empty(&self.engine.events_attribute, "engine.events_attribute")?;
        require_non_empty(&self.engine.context_attribute, "engine.context_attribute")?;
        Ok(())
    }

    fn validate_links(&self) -> Result<(), ConfigError> {
        for link in self.links.iter().flatten() {
            require_non_empty(&link.tag, "links.tag")?;
            require_non_empty(&link.attribute, "links.attribute")?;
            if !link.pages && !link.assets {
                return Err(ConfigError::Validation(format!(
                    "links entry {}[{}] resolves neither pages nor assets",
                    link.tag, link.attribute
                )));
            }
        }
        Ok(())
    }

    fn validate_pages(&self) -> Result<(), ConfigError> {
        for page in &self.pages {
            require_non_empty(&page.title, "pages.title")?;
            if !(100..=599).contains(&page.status) {
                return Err(ConfigError::Validation(format!(
                    "pages.status {} for {} is not an HTTP status",
                    page.status, page.path
                )));
            }
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(url) = &self.site.url {
            self.site.url = Some(expand::expand_env(url, "site.url")?);
        }
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.assets_resolved = AssetsConfig {
            dir: config_dir.join(self.assets.dir.as_deref().unwrap_or(DEFAULT_ASSETS_DIR)),
            public_prefix: self
                .assets
                .public_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_PUBLIC_PREFIX.to_owned()),
        };
    }

    /// Build a context stack with the configured site root and port.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Url` if `site.url` does not parse.
    pub fn contexts(&self) -> Result<ContextStack, ConfigError> {
        let mut contexts = ContextStack::new();
        if let Some(url) = &self.site.url {
            let mut site = Url::parse(url, &contexts)?;
            site.fix_slashes();
            contexts = contexts.with_site(site);
        }
        if let Some(port) = self.site.server_port {
            contexts = contexts.with_server_port(port);
        }
        Ok(contexts)
    }

    /// Engine settings for a [`weft_dom::Transformer`].
    #[must_use]
    pub fn transform_config(&self) -> TransformConfig {
        TransformConfig::default()
            .with_max_replacement_depth(self.engine.max_replacement_depth)
            .with_events_attribute(self.engine.events_attribute.clone())
            .with_context_attribute(self.engine.context_attribute.clone())
    }

    /// Configured link targets, or the built-in set when none are configured.
    #[must_use]
    pub fn link_targets(&self) -> Vec<LinkTarget> {
        match &self.links {
            Some(links) => links.iter().map(LinkTarget::from).collect(),
            None => LinkTarget::defaults(),
        }
    }

    /// Page repository holding the `[[pages]]` entries.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Url` if a page path cannot form a URL.
    pub fn memory_pages(&self, contexts: &ContextStack) -> Result<MemoryPages, ConfigError> {
        let prefix = if contexts.site().is_some() { "@/" } else { "/" };
        let mut pages = MemoryPages::new();
        for entry in &self.pages {
            let url = Url::parse(
                &format!("{prefix}{}", entry.path.trim_start_matches('/')),
                contexts,
            )?;
            pages.insert(Page::new(entry.title.clone(), url).with_status(entry.status));
        }
        Ok(pages)
    }

    /// Asset repository serving the configured assets directory.
    #[must_use]
    pub fn fs_assets(&self) -> FsAssets {
        FsAssets::new(
            self.assets_resolved.dir.clone(),
            self.assets_resolved.public_prefix.clone(),
        )
    }
}
