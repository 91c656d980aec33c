//! `lineage chains`: print the chain decomposition.

use std::io::Write;

use clap::Args;
use lineage_core::Chain;
use lineage_core::model::system_current_year;
use serde::Serialize;

use crate::cmd::{InputArgs, open_graph};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `lineage chains`.
#[derive(Args, Debug)]
pub struct ChainsArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainView {
    pub id: String,
    pub members: Vec<String>,
    pub start: i32,
    pub end: i32,
}

impl From<&Chain> for ChainView {
    fn from(chain: &Chain) -> Self {
        Self {
            id: chain.id.clone(),
            members: chain.members.clone(),
            start: chain.start,
            end: chain.end,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainsReport {
    pub content_hash: String,
    pub current_year: i32,
    pub chains: Vec<ChainView>,
}

/// Execute `lineage chains`.
///
/// # Errors
///
/// Returns an error if the input cannot be loaded or output fails.
pub fn run_chains(args: &ChainsArgs, output: OutputMode) -> anyhow::Result<()> {
    let current_year = args
        .input
        .current_year
        .unwrap_or_else(system_current_year);
    let (_, graph) = open_graph(&args.input, current_year)?;

    let report = ChainsReport {
        content_hash: graph.content_hash.clone(),
        current_year,
        chains: graph.chains.iter().map(ChainView::from).collect(),
    };
    render_mode(output, &report, render_text, render_pretty)
}

fn render_text(report: &ChainsReport, w: &mut dyn Write) -> std::io::Result<()> {
    for chain in &report.chains {
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            chain.id,
            chain.start,
            chain.end,
            chain.members.join(",")
        )?;
    }
    Ok(())
}

fn render_pretty(report: &ChainsReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Chains")?;
    pretty_kv(w, "Count", report.chains.len().to_string())?;
    pretty_kv(w, "Current year", report.current_year.to_string())?;
    writeln!(w)?;
    for chain in &report.chains {
        writeln!(
            w,
            "{:<20} {}-{}  {}",
            chain.id,
            chain.start,
            chain.end,
            chain.members.join(" → ")
        )?;
    }
    Ok(())
}
