//! `lineage config`: print the effective layout configuration.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use lineage_core::{LayoutConfig, load_layout_config};

use crate::output::{OutputMode, render_mode};

/// Arguments for `lineage config`.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// TOML file to load instead of the built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Load `path` if given, otherwise the defaults.
///
/// An explicitly named file must exist.
///
/// # Errors
///
/// Returns an error if the file is missing, unreadable, malformed or holds
/// out-of-range values.
pub fn resolve_config(path: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            load_layout_config(path)
        }
        None => Ok(LayoutConfig::default()),
    }
}

/// Execute `lineage config`.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or serialized.
pub fn run_config(args: &ConfigArgs, output: OutputMode) -> anyhow::Result<()> {
    let config = resolve_config(args.config.as_deref())?;
    let toml_text = toml::to_string_pretty(&config).context("serialize layout config")?;

    render_mode(
        output,
        &config,
        |_, w| w.write_all(toml_text.as_bytes()),
        |_, w| {
            writeln!(w, "# effective layout configuration")?;
            w.write_all(toml_text.as_bytes())
        },
    )
}
