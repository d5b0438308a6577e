//! `weft url` command implementation.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use weft_config::{CliSettings, Config};
use weft_url::{ContextStack, Url};

use crate::error::CliError;

/// Arguments for the url command.
#[derive(Args)]
pub(crate) struct UrlArgs {
    /// URL to resolve (absolute, relative, `@/`-prefixed or `?`/`#` only).
    url: String,

    /// Context URL relative input resolves against.
    #[arg(long)]
    context: Option<String>,

    /// Site root URL (overrides config).
    #[arg(long, env = "WEFT_SITE_URL")]
    site: Option<String>,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,

    /// Path to configuration file (default: auto-discover weft.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl UrlArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            site_url: self.site.clone(),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let contexts = config.contexts()?;

        let report = UrlReport::resolve(&self.url, self.context.as_deref(), &contexts)?;
        let rendered = if self.json {
            serde_json::to_string_pretty(&report)?
        } else {
            report.to_text()
        };
        writeln!(io::stdout().lock(), "{rendered}")?;
        Ok(())
    }
}

/// Resolved URL and its site facts.
#[derive(Debug, Serialize)]
pub(crate) struct UrlReport {
    url: Url,
    scheme: &'static str,
    host: String,
    port: u16,
    path: String,
    query: BTreeMap<String, String>,
    fragment: String,
    in_site: bool,
    site_path: Option<String>,
    namespace: Option<String>,
    redirect: Option<Url>,
}

impl UrlReport {
    /// Parse `input` (inside `context` when given) and collect its facts.
    pub(crate) fn resolve(
        input: &str,
        context: Option<&str>,
        contexts: &ContextStack,
    ) -> Result<Self, CliError> {
        let url = match context {
            Some(context) => {
                let context = Url::parse(context, contexts)?;
                let _frame = contexts.enter(context);
                Url::parse(input, contexts)?
            }
            None => Url::parse(input, contexts)?,
        };

        Ok(Self {
            scheme: url.scheme().as_str(),
            host: url.effective_host(contexts),
            port: url.effective_port(contexts),
            path: url.path().to_owned(),
            query: url.query().clone(),
            fragment: url.fragment().to_owned(),
            in_site: url.in_site(contexts),
            site_path: url.site_path(contexts),
            namespace: url.site_namespace(contexts),
            redirect: contexts.normalize_current(&url),
            url,
        })
    }

    fn to_text(&self) -> String {
        let or_dash = |value: Option<&str>| value.unwrap_or("-").to_owned();
        let mut text = String::new();
        writeln!(text, "URL:        {}", self.url).unwrap();
        writeln!(text, "Scheme:     {}", self.scheme).unwrap();
        writeln!(text, "Host:       {}:{}", self.host, self.port).unwrap();
        writeln!(text, "Path:       {}", self.path).unwrap();
        writeln!(text, "In site:    {}", if self.in_site { "yes" } else { "no" }).unwrap();
        writeln!(text, "Site path:  {}", or_dash(self.site_path.as_deref())).unwrap();
        writeln!(text, "Namespace:  {}", or_dash(self.namespace.as_deref())).unwrap();
        let redirect = self.redirect.as_ref().map(ToString::to_string);
        write!(text, "Redirect:   {}", or_dash(redirect.as_deref())).unwrap();
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn site_contexts() -> ContextStack {
        let site = Url::parse("https://example.com/docs/", &ContextStack::new()).unwrap();
        ContextStack::new().with_site(site)
    }

    #[test]
    fn test_resolve_relative_in_context() {
        let contexts = site_contexts();
        let report =
            UrlReport::resolve("../~v2/faq?b=2&a=1", Some("@/guide/"), &contexts).unwrap();

        assert_eq!(report.url.to_string(), "https://example.com/docs/~v2/faq?a=1&b=2");
        assert!(report.in_site);
        assert_eq!(report.site_path.as_deref(), Some("faq"));
        assert_eq!(report.namespace.as_deref(), Some("v2"));
        assert_eq!(
            report.redirect.as_ref().map(ToString::to_string).as_deref(),
            Some("https://example.com/docs/~v2/faq/?a=1&b=2")
        );
        assert_eq!(contexts.depth(), 0);
    }

    #[test]
    fn test_resolve_external() {
        let contexts = site_contexts();
        let report = UrlReport::resolve("http://other.org:8080/x.html", None, &contexts).unwrap();
        assert!(!report.in_site);
        assert_eq!(report.port, 8080);
        assert!(report.site_path.is_none());
        assert!(report.redirect.is_none());
    }

    #[test]
    fn test_relative_without_context_fails() {
        let result = UrlReport::resolve("page", None, &site_contexts());
        assert!(matches!(result, Err(CliError::Url(_))));
    }

    #[test]
    fn test_text_report() {
        let contexts = site_contexts();
        let report = UrlReport::resolve("@/guide/", None, &contexts).unwrap();
        assert_eq!(
            report.to_text(),
            "URL:        https://example.com/docs/guide/\n\
             Scheme:     https\n\
             Host:       example.com:443\n\
             Path:       /docs/guide/\n\
             In site:    yes\n\
             Site path:  guide/\n\
             Namespace:  -\n\
             Redirect:   -"
        );
    }

    #[test]
    fn test_json_report() {
        let contexts = site_contexts();
        let report = UrlReport::resolve("@/a#top", None, &contexts).unwrap();
        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["url"], "https://example.com/docs/a#top");
        assert_eq!(json["fragment"], "top");
        assert_eq!(json["in_site"], true);
        assert_eq!(json["redirect"], "https://example.com/docs/a/");
    }
}
