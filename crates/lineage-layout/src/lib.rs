#![forbid(unsafe_code)]
//! lineage-layout library.
//!
//! Lane assignment for lineage diagrams. Given the chains, relations and
//! families of a [`LineageGraph`], the optimizer refines each chain's lane so
//! unrelated chains never touch, relatives sit close together, connectors
//! avoid cutting through other chains, and merges and splits stay legible.
//!
//! # Pipeline
//!
//! 1. [`seed::seed_lanes`] gives a first-fit lane to chains that have none.
//! 2. [`schedule::run_schedule`] runs the configured phases: greedy passes
//!    ([`greedy`]) and hybrid group passes ([`groupwise`], [`anneal`]).
//! 3. Lanes are written back into the graph's chains.
//!
//! # Conventions
//!
//! - **Errors**: the optimizer is infallible; configuration is validated by
//!   [`LayoutConfig::validate`] before it gets here.
//! - **Logging**: `tracing` macros; the schedule run is instrumented.

pub mod anneal;
pub mod board;
pub mod collision;
pub mod cost;
pub mod greedy;
pub mod groupwise;
pub mod schedule;
pub mod seed;
pub mod segments;
pub mod state;

use lineage_core::{ChainIdx, LayoutConfig, LineageGraph};
use rand::SeedableRng;
use rand::rngs::StdRng;

pub use board::{LaneBoard, Slot};
pub use cost::{CostModel, CostTerms};
pub use schedule::{LayoutReport, PassScore, RunHooks, run_schedule};
pub use seed::seed_lanes;
pub use segments::{Segment, generate_segments};
pub use state::LayoutState;

/// Optimize every lane of `graph` with the configured schedule, using an RNG
/// seeded from `config.random_seed`.
pub fn optimize(graph: &mut LineageGraph, config: &LayoutConfig) -> LayoutReport {
    optimize_with(graph, config, &mut StdRng::seed_from_u64(config.random_seed), RunHooks::default())
}

/// Like [`optimize`] with an explicit RNG and run hooks.
pub fn optimize_with<R: rand::Rng>(
    graph: &mut LineageGraph,
    config: &LayoutConfig,
    rng: &mut R,
    hooks: RunHooks<'_>,
) -> LayoutReport {
    let LineageGraph {
        chains,
        families,
        relations,
        ..
    } = graph;
    let mut state = LayoutState::new(chains, relations, config);
    run_schedule(&mut state, families, &config.schedule, rng, hooks)
}

/// Seed lanes for `unplaced` chains of `graph`. Returns how many were placed.
pub fn seed_graph(graph: &mut LineageGraph, unplaced: &[ChainIdx]) -> usize {
    seed_lanes(&mut graph.chains, &graph.relations, &graph.families, unplaced)
}
