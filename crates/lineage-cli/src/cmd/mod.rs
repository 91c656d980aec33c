pub mod chains;
pub mod config;
pub mod families;
pub mod layout;

use std::path::PathBuf;

use clap::Args;
use lineage_core::{LineageGraph, LineageInput, load_input};
use tracing::info;

/// Input document shared by every graph-reading command.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Lineage document (JSON with `entities`, `events`, optional `lanes`).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Year that closes still-active entities. Defaults to the system clock.
    #[arg(long, value_name = "YEAR")]
    pub current_year: Option<i32>,
}

/// Read the document and build its graph.
///
/// # Errors
///
/// Returns an error if the document cannot be read or parsed.
pub fn open_graph(args: &InputArgs, current_year: i32) -> anyhow::Result<(LineageInput, LineageGraph)> {
    let input = load_input(&args.input)?;
    let graph = LineageGraph::from_input(&input, current_year);
    info!(
        path = %args.input.display(),
        chains = graph.chain_count(),
        families = graph.families.len(),
        "lineage document loaded"
    );
    Ok((input, graph))
}
