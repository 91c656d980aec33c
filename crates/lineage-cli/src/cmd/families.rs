//! `lineage families`: print the connected families of chains.

use clap::Args;
use lineage_core::model::system_current_year;
use serde::Serialize;

use crate::cmd::{InputArgs, open_graph};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `lineage families`.
#[derive(Args, Debug)]
pub struct FamiliesArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyView {
    pub index: usize,
    pub min_start: i32,
    pub link_count: usize,
    /// Chain ids in family order.
    pub chains: Vec<String>,
}

/// Execute `lineage families`.
///
/// # Errors
///
/// Returns an error if the input cannot be loaded or output fails.
pub fn run_families(args: &FamiliesArgs, output: OutputMode) -> anyhow::Result<()> {
    let current_year = args
        .input
        .current_year
        .unwrap_or_else(system_current_year);
    let (_, graph) = open_graph(&args.input, current_year)?;

    let families: Vec<FamilyView> = graph
        .families
        .iter()
        .enumerate()
        .map(|(index, family)| FamilyView {
            index,
            min_start: family.min_start,
            link_count: family.link_count,
            chains: family
                .chains
                .iter()
                .map(|&idx| graph.chain(idx).id.clone())
                .collect(),
        })
        .collect();

    render_mode(
        output,
        &families,
        |families, w| {
            for f in families {
                writeln!(w, "{}\t{}\t{}\t{}", f.index, f.min_start, f.link_count, f.chains.join(","))?;
            }
            Ok(())
        },
        |families, w| {
            pretty_section(w, "Families")?;
            pretty_kv(w, "Count", families.len().to_string())?;
            for f in families {
                writeln!(w)?;
                writeln!(
                    w,
                    "#{} from {} ({} chains, {} links)",
                    f.index,
                    f.min_start,
                    f.chains.len(),
                    f.link_count
                )?;
                for id in &f.chains {
                    writeln!(w, "  {id}")?;
                }
            }
            Ok(())
        },
    )
}
