//! The [`Url`] value type.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::context::ContextStack;
use crate::encode::{decode, decode_query, encode_component, encode_path};
use crate::error::UrlError;
use crate::path;

/// Prefix expanded to the site root URL.
const SITE_PREFIX: &str = "@/";
/// Prefix expanded to the directory of the current context URL.
const CONTEXT_PREFIX: &str = "@ctx/";
/// Namespace segments look like `~name/`.
const NS_PREFIX: char = '~';

/// Leading `scheme:` of an absolute reference.
static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):").expect("invalid scheme regex"));

/// Trailing file extension of the last path segment.
static EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.([a-z0-9]+)$").expect("invalid extension regex"));

/// URL scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Protocol-relative (`//host/path`) or host-less.
    #[default]
    Unspecified,
    /// `http`
    Http,
    /// `https`
    Https,
}

impl Scheme {
    /// Scheme name as written before `://`, empty when unspecified.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "",
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Implicit port for this scheme.
    #[must_use]
    pub fn default_port(self) -> Option<u16> {
        match self {
            Self::Unspecified => None,
            Self::Http => Some(80),
            Self::Https => Some(443),
        }
    }
}

/// A parsed and normalized URL.
///
/// Paths are stored percent-decoded and always absolute. The query is kept
/// sorted by key. Facts that depend on the site root ([`in_site`](Self::in_site),
/// [`site_path`](Self::site_path), [`site_namespace`](Self::site_namespace))
/// are computed against a [`ContextStack`] and never cached, so the same
/// value can answer differently under different contexts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Url {
    scheme: Scheme,
    host: String,
    port: Option<u16>,
    path: String,
    query: BTreeMap<String, String>,
    fragment: String,
}

impl Url {
    /// Parse a URL string, resolving it against the active context.
    ///
    /// Accepted forms:
    /// - `@/path` - relative to the site root
    /// - `@ctx/path` - relative to the directory of the current context URL
    /// - `?query` / `#fragment` - the current context URL with that part replaced
    /// - absolute (`https://host/path`), protocol-relative (`//host/path`),
    ///   root-relative (`/path`) or relative (`path`) references
    ///
    /// A reference without a host takes scheme, host and port from the site
    /// root, when one is set.
    ///
    /// # Errors
    ///
    /// - [`UrlError::NoContext`] for relative input with no active context frame
    /// - [`UrlError::NoSite`] for `@/` input with no site root
    /// - [`UrlError::UnsupportedScheme`] for schemes other than http(s)
    /// - [`UrlError::InvalidPort`] for a non-numeric port
    pub fn parse(input: &str, contexts: &ContextStack) -> Result<Self, UrlError> {
        let expanded = expand_prefixes(input.trim(), contexts)?;

        let (rest, fragment) = expanded
            .split_once('#')
            .unwrap_or((expanded.as_str(), ""));
        let (rest, query) = rest.split_once('?').unwrap_or((rest, ""));

        let (scheme, rest) = match SCHEME.captures(rest) {
            Some(caps) => {
                let name = caps[1].to_ascii_lowercase();
                let scheme = match name.as_str() {
                    "http" => Scheme::Http,
                    "https" => Scheme::Https,
                    _ => return Err(UrlError::UnsupportedScheme(name)),
                };
                (scheme, &rest[caps[0].len()..])
            }
            None => (Scheme::Unspecified, rest),
        };

        let (authority, raw_path) = match rest.strip_prefix("//") {
            Some(after) => {
                let end = after.find(['/', '\\']).unwrap_or(after.len());
                (Some(&after[..end]), &after[end..])
            }
            None => (None, rest),
        };

        let mut url = Self {
            scheme,
            host: String::new(),
            port: None,
            path: String::new(),
            query: parse_query(query),
            fragment: decode(fragment),
        };

        if let Some(authority) = authority {
            let (host, port) = split_authority(authority, input)?;
            url.host = host;
            url.port = port;
        }

        if url.host.is_empty() {
            if let Some(site) = contexts.site() {
                url.scheme = site.scheme;
                url.host = site.host;
                url.port = site.port;
            } else {
                url.scheme = Scheme::Unspecified;
                url.port = None;
            }
        }
        url.port = url.port.filter(|p| Some(*p) != url.scheme.default_port());

        url.path = path::normalize(&decode(raw_path), contexts)?;
        Ok(url)
    }

    /// Scheme of this URL.
    #[must_use]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Host as stored (lowercase, may be empty).
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, `None` when it is the scheme's implicit default or unset.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Normalized, decoded path. Always starts with `/`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters in canonical (key-sorted) order.
    #[must_use]
    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    /// Decoded fragment, empty when absent.
    #[must_use]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Host, falling back to the site root's host when unset.
    #[must_use]
    pub fn effective_host(&self, contexts: &ContextStack) -> String {
        if self.host.is_empty() {
            contexts.site().map(|site| site.host).unwrap_or_default()
        } else {
            self.host.clone()
        }
    }

    /// Port this URL would connect to.
    ///
    /// Order: explicit port, the scheme's default, the configured server
    /// port, the site root's port (protocol-relative URLs follow the site),
    /// and finally 80.
    #[must_use]
    pub fn effective_port(&self, contexts: &ContextStack) -> u16 {
        self.port
            .or_else(|| self.scheme.default_port())
            .or_else(|| contexts.server_port())
            .or_else(|| {
                contexts
                    .site()
                    .filter(|site| site.scheme != Scheme::Unspecified)
                    .map(|site| site.effective_port(contexts))
            })
            .unwrap_or(80)
    }

    /// Final path segment (empty for directory paths).
    #[must_use]
    pub fn path_file(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// Path up to and including the last `/`.
    #[must_use]
    pub fn path_directory(&self) -> &str {
        let file = self.path_file();
        &self.path[..self.path.len() - file.len()]
    }

    /// Lowercase extension of the final path segment, if any.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        EXTENSION
            .captures(self.path_file())
            .map(|caps| caps[1].to_ascii_lowercase())
    }

    /// Replace the extension, only when the path already has one.
    ///
    /// An empty `extension` removes it. Returns whether the path changed.
    pub fn set_extension(&mut self, extension: &str) -> bool {
        let Some(found) = EXTENSION.find(self.path_file()) else {
            return false;
        };
        let cut = self.path.len() - found.as_str().len();
        self.path.truncate(cut);
        if !extension.is_empty() {
            self.path.push('.');
            self.path.push_str(extension);
        }
        true
    }

    /// Whether this URL lies within the active site root.
    ///
    /// Host, port and path prefix must all match. Always false when no site
    /// root is set.
    #[must_use]
    pub fn in_site(&self, contexts: &ContextStack) -> bool {
        let Some(site) = contexts.site() else {
            return false;
        };
        site.effective_host(contexts) == self.effective_host(contexts)
            && site.effective_port(contexts) == self.effective_port(contexts)
            && self.path.starts_with(&site.path)
    }

    /// Path with the site root's path stripped, including any namespace.
    ///
    /// Has no leading slash. `None` when the URL is not in the site.
    #[must_use]
    pub fn site_full_path(&self, contexts: &ContextStack) -> Option<String> {
        if !self.in_site(contexts) {
            return None;
        }
        let site = contexts.site()?;
        Some(self.path[site.path.len()..].to_owned())
    }

    /// Namespace named by a leading `~name/` segment of the site path.
    #[must_use]
    pub fn site_namespace(&self, contexts: &ContextStack) -> Option<String> {
        let full = self.site_full_path(contexts)?;
        namespace_of(&full).map(str::to_owned)
    }

    /// Site path with any leading namespace segment removed.
    #[must_use]
    pub fn site_path(&self, contexts: &ContextStack) -> Option<String> {
        let full = self.site_full_path(contexts)?;
        match namespace_of(&full) {
            Some(ns) => Some(full[ns.len() + 2..].to_owned()),
            None => Some(full),
        }
    }

    /// Replace only the namespace segment of the site path.
    ///
    /// An empty namespace removes the segment. Returns false (and leaves the
    /// URL unchanged) when the URL is not in the site.
    pub fn set_site_namespace(&mut self, namespace: &str, contexts: &ContextStack) -> bool {
        let (Some(full), Some(site_path)) =
            (self.site_full_path(contexts), self.site_path(contexts))
        else {
            return false;
        };
        let prefix = self.path[..self.path.len() - full.len()].to_owned();
        self.path = if namespace.is_empty() {
            format!("{prefix}{site_path}")
        } else {
            format!("{prefix}{NS_PREFIX}{namespace}/{site_path}")
        };
        true
    }

    /// Apply the trailing-slash policy: directory-like paths end in `/`.
    ///
    /// Paths ending in `/` or `.html`, and the favicon, are left alone.
    pub fn fix_slashes(&mut self) {
        if self.path_file() != "favicon.ico"
            && !self.path.ends_with('/')
            && !self.path.ends_with(".html")
        {
            self.path.push('/');
        }
    }

    /// Remove empty `~/` namespace segments left behind by path edits.
    pub(crate) fn strip_empty_namespaces(&mut self) {
        if self.path.split('/').any(|s| s == "~") {
            let kept: Vec<&str> = self.path.split('/').filter(|s| *s != "~").collect();
            self.path = kept.join("/");
        }
    }

    /// Set the scheme. An explicit port equal to the new default is dropped.
    pub fn set_scheme(&mut self, scheme: Scheme) {
        self.scheme = scheme;
        self.port = self.port.filter(|p| Some(*p) != scheme.default_port());
    }

    /// Set the host (stored lowercase).
    pub fn set_host(&mut self, host: &str) {
        self.host = host.to_ascii_lowercase();
    }

    /// Set the port. The scheme's implicit default is stored as unset.
    pub fn set_port(&mut self, port: Option<u16>) {
        self.port = port.filter(|p| Some(*p) != self.scheme.default_port());
    }

    /// Set and normalize the path, resolving relative input in context.
    ///
    /// # Errors
    ///
    /// Returns [`UrlError::NoContext`] for relative input with no context.
    pub fn set_path(&mut self, path: &str, contexts: &ContextStack) -> Result<(), UrlError> {
        self.path = path::normalize(path, contexts)?;
        Ok(())
    }

    /// Replace the query parameters.
    pub fn set_query(&mut self, query: BTreeMap<String, String>) {
        self.query = query;
    }

    /// Set the fragment (without the leading `#`).
    pub fn set_fragment(&mut self, fragment: &str) {
        fragment.clone_into(&mut self.fragment);
    }

    /// Copy of this URL with a different query.
    #[must_use]
    pub fn with_query(mut self, query: BTreeMap<String, String>) -> Self {
        self.set_query(query);
        self
    }

    /// Copy of this URL with a different fragment.
    #[must_use]
    pub fn with_fragment(mut self, fragment: &str) -> Self {
        self.set_fragment(fragment);
        self
    }

    /// Canonical query string without the leading `?`.
    #[must_use]
    pub fn query_string(&self) -> String {
        self.query
            .iter()
            .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// String used in log fields.
    #[must_use]
    pub fn log_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.host.is_empty() {
            match self.scheme {
                Scheme::Unspecified => f.write_str("//")?,
                scheme => write!(f, "{}://", scheme.as_str())?,
            }
            f.write_str(&self.host)?;
            if let Some(port) = self.port {
                write!(f, ":{port}")?;
            }
        }
        f.write_str(&encode_path(&self.path))?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query_string())?;
        }
        if !self.fragment.is_empty() {
            write!(f, "#{}", encode_component(&self.fragment))?;
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Url {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Expand `@/`, `@ctx/`, and bare `?`/`#` input against the context stack.
fn expand_prefixes(input: &str, contexts: &ContextStack) -> Result<String, UrlError> {
    if let Some(rest) = input.strip_prefix(SITE_PREFIX) {
        let site = contexts
            .site()
            .ok_or_else(|| UrlError::NoSite(input.to_owned()))?;
        let base = site.with_query(BTreeMap::new()).with_fragment("");
        return Ok(join_base(&base.to_string(), rest));
    }
    if let Some(rest) = input.strip_prefix(CONTEXT_PREFIX) {
        let context = contexts
            .context()
            .ok_or_else(|| UrlError::NoContext(input.to_owned()))?;
        let mut base = context.with_query(BTreeMap::new()).with_fragment("");
        base.path = base.path_directory().to_owned();
        return Ok(join_base(&base.to_string(), rest));
    }
    if input.starts_with('?') {
        let context = contexts
            .context()
            .ok_or_else(|| UrlError::NoContext(input.to_owned()))?;
        let base = context.with_query(BTreeMap::new()).with_fragment("");
        return Ok(format!("{base}{input}"));
    }
    if input.starts_with('#') {
        let context = contexts
            .context()
            .ok_or_else(|| UrlError::NoContext(input.to_owned()))?;
        let base = context.with_fragment("");
        return Ok(format!("{base}{input}"));
    }
    Ok(input.to_owned())
}

fn join_base(base: &str, rest: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{rest}")
    } else {
        format!("{base}/{rest}")
    }
}

/// Split `[userinfo@]host[:port]` into a lowercase host and optional port.
fn split_authority(authority: &str, input: &str) -> Result<(String, Option<u16>), UrlError> {
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);

    let (host, port) = if host_port.starts_with('[') {
        // IPv6 literal: the port separator follows the closing bracket.
        match host_port.find(']') {
            Some(end) => {
                let port = host_port[end + 1..].strip_prefix(':').unwrap_or("");
                (&host_port[..=end], port)
            }
            None => (host_port, ""),
        }
    } else {
        host_port.rsplit_once(':').unwrap_or((host_port, ""))
    };

    let port = if port.is_empty() {
        None
    } else {
        Some(
            port.parse::<u16>()
                .map_err(|_| UrlError::InvalidPort(input.to_owned()))?,
        )
    };
    Ok((host.to_ascii_lowercase(), port))
}

/// Parse `a=1&b=2` into a sorted map. Later duplicates win.
fn parse_query(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_query(key);
            (!key.is_empty()).then(|| (key, decode_query(value)))
        })
        .collect()
}

/// Namespace name of a site path starting with `~name/`.
fn namespace_of(site_full_path: &str) -> Option<&str> {
    let rest = site_full_path.strip_prefix(NS_PREFIX)?;
    let (name, _) = rest.split_once('/')?;
    (!name.is_empty()).then_some(name)
}
