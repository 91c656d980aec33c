//! Output layer shared by every command.
//!
//! Each handler receives an [`OutputMode`] and renders its payload through
//! [`render_mode`]: framed sections for humans, tab-separated rows for
//! pipes, or stable pretty-printed JSON.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--format` flag
//! 2. `LINEAGE_FORMAT` env var → `"pretty"` | `"text"` | `"json"`
//! 3. Default: [`OutputMode::Pretty`] if stdout is a TTY; [`OutputMode::Text`] if piped.

use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use serde::Serialize;

/// Width of the separator under pretty section headings.
pub const PRETTY_RULE_WIDTH: usize = 72;

/// Write a horizontal separator.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Render a left-aligned key/value line.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<14} {}", format!("{key}:"), value.as_ref())
}

/// The output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Sections and aligned columns for people.
    Pretty,
    /// Tab-separated rows for pipes and scripts.
    Text,
    /// Machine-readable JSON.
    Json,
}

fn resolve_output_mode_inner(
    format_flag: Option<OutputMode>,
    format_env: Option<&str>,
    is_tty: bool,
) -> OutputMode {
    if let Some(mode) = format_flag {
        return mode;
    }

    if let Some(val) = format_env {
        match val.to_lowercase().as_str() {
            "json" => return OutputMode::Json,
            "text" => return OutputMode::Text,
            "pretty" => return OutputMode::Pretty,
            _ => {} // unknown value: fall through to TTY detection
        }
    }

    if is_tty {
        OutputMode::Pretty
    } else {
        OutputMode::Text
    }
}

/// Resolve the output mode from the flag, environment and TTY.
pub fn resolve_output_mode(format_flag: Option<OutputMode>) -> OutputMode {
    let env_val = std::env::var("LINEAGE_FORMAT").ok();
    let is_tty = io::stdout().is_terminal();
    resolve_output_mode_inner(format_flag, env_val.as_deref(), is_tty)
}

/// Render `value` to `out` with explicit text and pretty renderers.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn render_to<T: Serialize>(
    out: &mut dyn Write,
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, out)?,
        OutputMode::Pretty => pretty_fn(value, out)?,
    }
    Ok(())
}

/// [`render_to`] on a locked stdout.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    render_to(&mut out, mode, value, text_fn, pretty_fn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_flag_wins_over_env() {
        let mode = resolve_output_mode_inner(Some(OutputMode::Text), Some("json"), true);
        assert_eq!(mode, OutputMode::Text);
    }

    #[test]
    fn env_is_case_insensitive() {
        assert_eq!(resolve_output_mode_inner(None, Some("JSON"), true), OutputMode::Json);
        assert_eq!(resolve_output_mode_inner(None, Some("Pretty"), false), OutputMode::Pretty);
    }

    #[test]
    fn unknown_env_falls_through_to_tty() {
        assert_eq!(resolve_output_mode_inner(None, Some("yaml"), true), OutputMode::Pretty);
        assert_eq!(resolve_output_mode_inner(None, Some("yaml"), false), OutputMode::Text);
    }

    #[test]
    fn render_to_json_is_pretty_printed() {
        let mut buf = Vec::new();
        render_to(
            &mut buf,
            OutputMode::Json,
            &serde_json::json!({"lane": 2}),
            |_, _| Ok(()),
            |_, _| Ok(()),
        )
        .expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert_eq!(text, "{\n  \"lane\": 2\n}\n");
    }

    #[test]
    fn render_to_dispatches_text_and_pretty() {
        let mut buf = Vec::new();
        render_to(&mut buf, OutputMode::Text, &1, |v, w| writeln!(w, "t{v}"), |v, w| writeln!(w, "p{v}"))
            .expect("render");
        render_to(&mut buf, OutputMode::Pretty, &2, |v, w| writeln!(w, "t{v}"), |v, w| writeln!(w, "p{v}"))
            .expect("render");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "t1\np2\n");
    }
}
