//! `weft transform` command implementation.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use weft_config::{CliSettings, Config};
use weft_dom::{EventBus, Mode, Transformer, install_links};
use weft_url::Url;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the transform command.
#[derive(Args)]
pub(crate) struct TransformArgs {
    /// HTML file to transform (`-` reads standard input).
    file: PathBuf,

    /// Output only the body content instead of the whole document.
    #[arg(long)]
    fragment: bool,

    /// Context URL relative links resolve against (default: the site root).
    #[arg(long)]
    context: Option<String>,

    /// Site root URL (overrides config).
    #[arg(long, env = "WEFT_SITE_URL")]
    site: Option<String>,

    /// Assets directory (overrides config).
    #[arg(long)]
    assets_dir: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover weft.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl TransformArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            site_url: self.site.clone(),
            assets_dir: self.assets_dir.clone(),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            output.note(&format!("Config: {}", path.display()));
        }

        let markup = self.read_input()?;
        let mode = if self.fragment {
            Mode::Fragment
        } else {
            Mode::Document
        };

        if self.context.is_none() && config.site.url.is_none() {
            output.warning("No site or context URL set; relative links are left as written");
        }

        let html = transform_markup(&config, self.context.as_deref(), &markup, mode)?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(html.as_bytes())?;
        if !html.ends_with('\n') {
            writeln!(stdout)?;
        }
        Ok(())
    }

    fn read_input(&self) -> Result<String, CliError> {
        if self.file.as_os_str() == "-" {
            let mut markup = String::new();
            io::stdin().read_to_string(&mut markup)?;
            return Ok(markup);
        }
        Ok(std::fs::read_to_string(&self.file)?)
    }
}

/// Transform `markup` with the link listeners and engine settings from
/// `config`.
///
/// The context defaults to the site root when one is configured.
pub(crate) fn transform_markup(
    config: &Config,
    context: Option<&str>,
    markup: &str,
    mode: Mode,
) -> Result<String, CliError> {
    let contexts = config.contexts()?;
    let pages = config.memory_pages(&contexts)?;
    let assets = config.fs_assets();

    let mut bus = EventBus::new();
    install_links(
        &mut bus,
        Arc::new(pages),
        Arc::new(assets),
        &config.link_targets(),
    );
    let transformer = Transformer::new(bus).with_config(config.transform_config());

    let context = match context {
        Some(url) => Some(Url::parse(url, &contexts)?),
        None => contexts.site(),
    };
    let _frame = context.map(|url| {
        tracing::info!(context = %url, "Transforming");
        contexts.enter(url)
    });

    Ok(transformer.transform(&contexts, markup, mode)?)
}
