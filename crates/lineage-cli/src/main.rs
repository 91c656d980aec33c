#![forbid(unsafe_code)]

mod cmd;
mod output;

use std::env;

use clap::{Parser, Subcommand};
use output::{OutputMode, resolve_output_mode};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "lineage: lane layout for organization lineage diagrams",
    long_about = None
)]
struct Cli {
    /// Enable debug logging for the lineage crates.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format. Defaults to pretty on a terminal, text when piped.
    #[arg(long, value_enum, global = true)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Seed and optimize lanes",
        long_about = "Build chains and families from a lineage document, seed lanes for chains \
                      without one, run the pass schedule and print every chain with its lane.",
        after_help = "EXAMPLES:\n    # Lay out a document with the default schedule\n    lineage layout lineage.json\n\n    # Use a custom config and seed, with per-pass scores\n    lineage layout lineage.json --config layout.toml --seed 7 --trace-passes --format json"
    )]
    Layout(cmd::layout::LayoutArgs),

    #[command(
        about = "Print the chain decomposition",
        after_help = "EXAMPLES:\n    # List chains as tab-separated rows\n    lineage chains lineage.json --format text"
    )]
    Chains(cmd::chains::ChainsArgs),

    #[command(
        about = "Print families of connected chains",
        after_help = "EXAMPLES:\n    # Show families\n    lineage families lineage.json"
    )]
    Families(cmd::families::FamiliesArgs),

    #[command(
        about = "Print the effective layout configuration",
        after_help = "EXAMPLES:\n    # Dump the defaults as TOML, ready to edit\n    lineage config > layout.toml\n\n    # Check a config file\n    lineage config --config layout.toml"
    )]
    Config(cmd::config::ConfigArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("LINEAGE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "lineage_core=debug,lineage_layout=debug,lineage=debug,info"
        } else {
            "warn"
        })
    });

    let format = env::var("LINEAGE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays parseable.
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = resolve_output_mode(cli.format);

    match cli.command {
        Commands::Layout(ref args) => cmd::layout::run_layout(args, output),
        Commands::Chains(ref args) => cmd::chains::run_chains(args, output),
        Commands::Families(ref args) => cmd::families::run_families(args, output),
        Commands::Config(ref args) => cmd::config::run_config(args, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_flag_parses_before_subcommand() {
        let cli = Cli::parse_from(["lineage", "--format", "json", "config"]);
        assert_eq!(cli.format, Some(OutputMode::Json));
        assert!(matches!(cli.command, Commands::Config(_)));
    }

    #[test]
    fn format_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["lineage", "chains", "in.json", "--format", "text"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
    }

    #[test]
    fn layout_flags_parse() {
        let cli = Cli::parse_from([
            "lineage",
            "layout",
            "in.json",
            "--seed",
            "7",
            "--trace-passes",
            "--current-year",
            "2020",
        ]);
        let Commands::Layout(args) = cli.command else {
            panic!("expected layout");
        };
        assert_eq!(args.seed, Some(7));
        assert!(args.trace_passes);
        assert_eq!(args.input.current_year, Some(2020));
        assert!(args.config.is_none());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
