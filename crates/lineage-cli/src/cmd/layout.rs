//! `lineage layout`: seed and optimize lanes for a lineage document.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use lineage_core::{Chain, LayoutConfig};
use lineage_layout::{LayoutReport, PassScore, RunHooks, optimize_with, seed_graph};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info};

use crate::cmd::config::resolve_config;
use crate::cmd::{InputArgs, open_graph};
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};

/// Arguments for `lineage layout`.
#[derive(Args, Debug)]
pub struct LayoutArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Layout configuration (TOML). Defaults apply when omitted.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the annealing seed.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Include a score snapshot for every pass.
    #[arg(long)]
    pub trace_passes: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneView {
    pub id: String,
    pub lane: i32,
    pub start: i32,
    pub end: i32,
    pub members: Vec<String>,
}

impl From<&Chain> for LaneView {
    fn from(chain: &Chain) -> Self {
        Self {
            id: chain.id.clone(),
            lane: chain.lane,
            start: chain.start,
            end: chain.end,
            members: chain.members.clone(),
        }
    }
}

/// Payload for `lineage layout`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOutput {
    pub content_hash: String,
    pub current_year: i32,
    pub random_seed: u64,
    /// Chains that had no lane in the document and were seeded.
    pub seeded: usize,
    pub report: LayoutReport,
    pub chains: Vec<LaneView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passes: Option<Vec<PassScore>>,
}

/// Execute `lineage layout`.
///
/// # Errors
///
/// Returns an error if the config or input cannot be loaded, or output fails.
pub fn run_layout(args: &LayoutArgs, output: OutputMode) -> anyhow::Result<()> {
    let config = effective_config(args)?;
    let current_year = config.resolved_current_year();
    let (input, mut graph) = open_graph(&args.input, current_year)?;

    let unplaced = graph.apply_lanes(&input.lanes);
    let seeded = seed_graph(&mut graph, &unplaced);
    debug!(seeded, supplied = input.lanes.len(), "initial lanes ready");

    let mut passes = Vec::new();
    let mut observer = |score: &PassScore| passes.push(score.clone());
    let hooks = RunHooks {
        observer: args.trace_passes.then_some(&mut observer as &mut dyn FnMut(&PassScore)),
        cancel: None,
    };
    let mut rng = StdRng::seed_from_u64(config.random_seed);
    let report = optimize_with(&mut graph, &config, &mut rng, hooks);
    info!(
        initial = report.initial_cost,
        final_cost = report.final_cost,
        moves = report.moves_applied,
        "layout complete"
    );

    let mut chains: Vec<LaneView> = graph.chains.iter().map(LaneView::from).collect();
    chains.sort_by(|a, b| a.lane.cmp(&b.lane).then(a.start.cmp(&b.start)));

    let payload = LayoutOutput {
        content_hash: graph.content_hash.clone(),
        current_year,
        random_seed: config.random_seed,
        seeded,
        report,
        chains,
        passes: args.trace_passes.then_some(passes),
    };
    render_mode(output, &payload, render_text, render_pretty)
}

fn effective_config(args: &LayoutArgs) -> anyhow::Result<LayoutConfig> {
    let mut config = resolve_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.random_seed = seed;
    }
    if let Some(year) = args.input.current_year {
        config.current_year = Some(year);
    }
    Ok(config)
}

fn render_text(payload: &LayoutOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for chain in &payload.chains {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            chain.lane,
            chain.id,
            chain.start,
            chain.end,
            chain.members.join(",")
        )?;
    }
    Ok(())
}

fn render_pretty(payload: &LayoutOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let report = &payload.report;
    pretty_section(w, "Layout")?;
    pretty_kv(w, "Chains", payload.chains.len().to_string())?;
    pretty_kv(w, "Seeded", payload.seeded.to_string())?;
    pretty_kv(
        w,
        "Cost",
        format!("{:.1} → {:.1}", report.initial_cost, report.final_cost),
    )?;
    pretty_kv(
        w,
        "Passes",
        format!("{} ({} moves)", report.passes_run, report.moves_applied),
    )?;
    writeln!(w)?;
    writeln!(w, "{:>5}  {:<20} {:<11} members", "lane", "chain", "span")?;
    pretty_rule(w)?;
    for chain in &payload.chains {
        let span = format!("{}-{}", chain.start, chain.end);
        writeln!(
            w,
            "{:>5}  {:<20} {:<11} {}",
            chain.lane,
            chain.id,
            span,
            chain.members.join(" → ")
        )?;
    }

    if let Some(passes) = &payload.passes {
        writeln!(w)?;
        pretty_section(w, "Passes")?;
        for pass in passes {
            writeln!(
                w,
                "{:>4}  {:<14} {:<9} it {:<3} cost {:>10.1}  lanes {:>3}  moves {}",
                pass.pass_index,
                pass.phase,
                pass.strategy.as_str(),
                pass.iteration,
                pass.total_cost,
                pass.occupied_lane_count,
                pass.moves_applied
            )?;
        }
    }
    Ok(())
}
