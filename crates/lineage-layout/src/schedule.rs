//! Pass orchestration.
//!
//! # Overview
//!
//! A schedule is an ordered list of [`Phase`]s. Each phase runs its
//! strategies for a number of iterations over every family that meets the
//! phase's size and link thresholds; families below them skip the phase.
//!
//! Per phase, per iteration, per strategy, the orchestrator:
//!
//! 1. regenerates blocker segments;
//! 2. dispatches greedy strategies to [`crate::greedy`] and the hybrid
//!    strategy to [`crate::groupwise`], family by family in family order;
//! 3. hands a [`PassScore`] snapshot to the observer, if any;
//! 4. after a hybrid pass that moved chains, settles with greedy rounds.
//!
//! ## Convergence
//!
//! Every pass is a pure function of the board: greedy passes are
//! deterministic and hybrid passes seed each group's annealing from the
//! run seed and the group's lanes. Once a whole iteration keeps no move,
//! every later iteration would repeat it exactly, so the phase ends early.
//!
//! A hybrid pass that moves chains can leave single-chain improvements
//! behind. It is followed by greedy rounds (parents, children, hubs) over
//! every family until a round keeps nothing, and a hybrid phase that is
//! still improving when its iterations run out keeps going for a bounded
//! number of extra iterations. A run that ends quiet is a fixed point:
//! optimizing its output again with the same seed moves nothing.
//!
//! ## Cancellation
//!
//! A caller-supplied flag is checked before every iteration. A cancelled
//! run stops between passes, so the board is always consistent.

use std::sync::atomic::{AtomicBool, Ordering};

use lineage_core::{Family, Phase, Strategy};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::greedy::{GreedyOrder, run_pass};
use crate::groupwise::run_hybrid;
use crate::state::LayoutState;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Layout score after one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassScore {
    pub pass_index: usize,
    pub phase: String,
    pub strategy: Strategy,
    pub iteration: usize,
    pub total_cost: f64,
    pub occupied_lane_count: usize,
    /// Moves kept during this pass.
    pub moves_applied: usize,
}

/// Summary of one schedule run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutReport {
    pub initial_cost: f64,
    pub final_cost: f64,
    pub passes_run: usize,
    pub moves_applied: usize,
    pub cancelled: bool,
}

/// Optional callbacks for a schedule run.
#[derive(Default)]
pub struct RunHooks<'h> {
    /// Receives a snapshot after every pass.
    pub observer: Option<&'h mut dyn FnMut(&PassScore)>,
    /// Stops the run before the next iteration once set.
    pub cancel: Option<&'h AtomicBool>,
}

impl RunHooks<'_> {
    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Greedy strategies that settle the board after a hybrid pass moves.
const SETTLE_STRATEGIES: [Strategy; 3] = [Strategy::Parents, Strategy::Children, Strategy::Hubs];

/// Cap on greedy rounds in one settle.
const MAX_SETTLE_ROUNDS: usize = 64;

/// Iterations a hybrid phase may run past its budget while still improving.
const MAX_EXTRA_HYBRID_ITERATIONS: usize = 32;

/// Run `schedule` over `families`, refining lanes in `state`.
#[instrument(skip_all, fields(phases = schedule.len(), families = families.len()))]
pub fn run_schedule<R: Rng>(
    state: &mut LayoutState<'_>,
    families: &[Family],
    schedule: &[Phase],
    rng: &mut R,
    hooks: RunHooks<'_>,
) -> LayoutReport {
    state.regenerate_segments();
    let initial_cost = state.total_cost();
    let moves_before = state.moves_applied();
    let anneal_seed = rng.gen_range(0..u64::MAX);
    let all: Vec<&Family> = families.iter().collect();
    let mut passes = PassLog {
        hooks,
        passes_run: 0,
    };
    let mut cancelled = false;

    'phases: for phase in schedule {
        let eligible: Vec<&Family> = families
            .iter()
            .filter(|f| phase.admits(f.len(), f.link_count))
            .collect();
        if eligible.is_empty() {
            debug!(phase = %phase.name, "no eligible families; skipping phase");
            continue;
        }
        let has_hybrid = phase.strategies.contains(&Strategy::Hybrid);
        let budget = match phase.iterations {
            0 => 0,
            n if has_hybrid => n + MAX_EXTRA_HYBRID_ITERATIONS,
            n => n,
        };

        for iteration in 0..budget {
            if passes.hooks.cancelled() {
                cancelled = true;
                break 'phases;
            }
            if iteration == phase.iterations {
                debug!(phase = %phase.name, "hybrid phase still improving; extending");
            }

            let mut kept_this_iteration = 0;
            for &strategy in &phase.strategies {
                let moves = run_strategy(state, &eligible, strategy, anneal_seed);
                passes.record(state, &phase.name, strategy, iteration, moves);
                kept_this_iteration += moves;
                if strategy == Strategy::Hybrid && moves > 0 {
                    kept_this_iteration += settle(state, &all, &mut passes, &phase.name, iteration);
                }
            }

            if kept_this_iteration == 0 {
                debug!(phase = %phase.name, iteration, "phase converged");
                break;
            }
        }
    }

    let report = LayoutReport {
        initial_cost,
        final_cost: state.total_cost(),
        passes_run: passes.passes_run,
        moves_applied: state.moves_applied() - moves_before,
        cancelled,
    };
    info!(
        initial_cost = report.initial_cost,
        final_cost = report.final_cost,
        passes = report.passes_run,
        moves = report.moves_applied,
        cancelled = report.cancelled,
        "layout schedule finished"
    );
    report
}

/// One pass of `strategy` over `families`. Returns the moves kept.
fn run_strategy(
    state: &mut LayoutState<'_>,
    families: &[&Family],
    strategy: Strategy,
    anneal_seed: u64,
) -> usize {
    state.regenerate_segments();
    let before = state.moves_applied();
    for family in families {
        match GreedyOrder::from_strategy(strategy) {
            Some(order) => {
                run_pass(state, family, order);
            }
            None => {
                run_hybrid(state, family, anneal_seed);
            }
        }
    }
    state.moves_applied() - before
}

/// Run greedy rounds over every family until a round keeps no move.
fn settle(
    state: &mut LayoutState<'_>,
    families: &[&Family],
    passes: &mut PassLog<'_>,
    phase: &str,
    iteration: usize,
) -> usize {
    let mut kept = 0;
    for round in 0..MAX_SETTLE_ROUNDS {
        let mut kept_this_round = 0;
        for strategy in SETTLE_STRATEGIES {
            let moves = run_strategy(state, families, strategy, 0);
            passes.record(state, phase, strategy, iteration, moves);
            kept_this_round += moves;
        }
        kept += kept_this_round;
        if kept_this_round == 0 {
            debug!(phase, iteration, rounds = round + 1, kept, "settled after hybrid pass");
            break;
        }
    }
    kept
}

/// Pass counter that forwards snapshots to the observer.
struct PassLog<'h> {
    hooks: RunHooks<'h>,
    passes_run: usize,
}

impl PassLog<'_> {
    fn record(
        &mut self,
        state: &LayoutState<'_>,
        phase: &str,
        strategy: Strategy,
        iteration: usize,
        moves: usize,
    ) {
        if let Some(observer) = self.hooks.observer.as_mut() {
            observer(&PassScore {
                pass_index: self.passes_run,
                phase: phase.to_string(),
                strategy,
                iteration,
                total_cost: state.total_cost(),
                occupied_lane_count: state.board().occupied_lane_count(),
                moves_applied: moves,
            });
        }
        self.passes_run += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_core::{Chain, Event, EventKind, LayoutConfig, Relations, build_families};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn chain(id: &str, start: i32, end: i32, lane: i32) -> Chain {
        Chain {
            id: id.to_string(),
            members: vec![id.to_string()],
            start,
            end,
            lane,
        }
    }

    fn fixture() -> (Vec<Chain>, Vec<Event>) {
        let chains = vec![
            chain("p", 1990, 1999, 0),
            chain("c", 2000, 2005, 4),
            chain("solo", 1950, 1960, 2),
        ];
        let events = vec![Event::new("p", "c", 2000, EventKind::Merge)];
        (chains, events)
    }

    #[test]
    fn gated_phases_skip_small_families() {
        let (mut chains, events) = fixture();
        let rel = Relations::from_chains(&chains, &events);
        let families = build_families(&chains, &events);
        let config = LayoutConfig::default();
        let mut state = LayoutState::new(&mut chains, &rel, &config);

        let schedule = vec![Phase::new("big-only", &[Strategy::Parents], 5).gated(5, 0)];
        let mut rng = StdRng::seed_from_u64(0);
        let report = run_schedule(&mut state, &families, &schedule, &mut rng, RunHooks::default());
        assert_eq!(report.passes_run, 0);
        assert_eq!(state.lane_of(lineage_core::ChainIdx(1)), 4);
    }

    #[test]
    fn observer_sees_every_pass_and_run_converges() {
        let (mut chains, events) = fixture();
        let rel = Relations::from_chains(&chains, &events);
        let families = build_families(&chains, &events);
        let config = LayoutConfig::default();
        let mut state = LayoutState::new(&mut chains, &rel, &config);

        let mut scores = Vec::new();
        let mut observer = |s: &PassScore| scores.push(s.clone());
        let schedule = vec![Phase::new("sort", &[Strategy::Parents, Strategy::Children], 10)];
        let mut rng = StdRng::seed_from_u64(0);
        let report = run_schedule(
            &mut state,
            &families,
            &schedule,
            &mut rng,
            RunHooks {
                observer: Some(&mut observer),
                cancel: None,
            },
        );

        assert!(report.final_cost < report.initial_cost);
        assert!(!report.cancelled);
        // First iteration moves the child; the second keeps nothing and stops.
        assert_eq!(report.passes_run, 4);
        assert_eq!(scores.len(), 4);
        assert_eq!(scores[0].pass_index, 0);
        assert_eq!(scores[3].iteration, 1);
        assert!(scores.iter().skip(2).all(|s| s.moves_applied == 0));
        assert!((scores[3].total_cost - report.final_cost).abs() < 1e-9);
    }

    #[test]
    fn pass_scores_serialize_in_camel_case() {
        let score = PassScore {
            pass_index: 3,
            phase: "hubs".to_string(),
            strategy: Strategy::Hubs,
            iteration: 1,
            total_cost: 12.5,
            occupied_lane_count: 4,
            moves_applied: 2,
        };
        let json = serde_json::to_value(&score).expect("serialize");
        assert_eq!(json["passIndex"], 3);
        assert_eq!(json["strategy"], "hubs");
        assert_eq!(json["occupiedLaneCount"], 4);
        assert_eq!(json["movesApplied"], 2);
    }

    #[test]
    fn hybrid_run_is_a_fixed_point() {
        let mut chains = vec![
            chain("root", 1980, 1989, 5),
            chain("a", 1990, 1999, 0),
            chain("b", 1990, 1999, 9),
            chain("a1", 2000, 2009, 7),
            chain("b1", 2000, 2009, 2),
            chain("b2", 2000, 2009, 4),
        ];
        let events = vec![
            Event::new("root", "a", 1990, EventKind::Split),
            Event::new("root", "b", 1990, EventKind::Split),
            Event::new("a", "a1", 2000, EventKind::Merge),
            Event::new("b", "b1", 2000, EventKind::Merge),
            Event::new("b", "b2", 2000, EventKind::Merge),
        ];
        let rel = Relations::from_chains(&chains, &events);
        let families = build_families(&chains, &events);
        let config = LayoutConfig::default();
        let schedule = vec![
            Phase::new("sort", &[Strategy::Parents, Strategy::Children], 3),
            Phase::new("hybrid", &[Strategy::Hybrid], 2),
        ];

        let run = |chains: &mut [Chain]| {
            let mut state = LayoutState::new(chains, &rel, &config);
            let mut rng = StdRng::seed_from_u64(5);
            run_schedule(&mut state, &families, &schedule, &mut rng, RunHooks::default())
        };
        let first = run(chains.as_mut_slice());
        assert!(first.final_cost < first.initial_cost);
        let lanes: Vec<i32> = chains.iter().map(|c| c.lane).collect();

        let second = run(chains.as_mut_slice());
        assert_eq!(second.moves_applied, 0);
        assert_eq!(chains.iter().map(|c| c.lane).collect::<Vec<_>>(), lanes);
        assert!((second.final_cost - first.final_cost).abs() < 1e-9);
    }

    #[test]
    fn cancelled_run_stops_before_first_iteration() {
        let (mut chains, events) = fixture();
        let rel = Relations::from_chains(&chains, &events);
        let families = build_families(&chains, &events);
        let config = LayoutConfig::default();
        let mut state = LayoutState::new(&mut chains, &rel, &config);

        let flag = AtomicBool::new(true);
        let mut rng = StdRng::seed_from_u64(0);
        let report = run_schedule(
            &mut state,
            &families,
            &config.schedule,
            &mut rng,
            RunHooks {
                observer: None,
                cancel: Some(&flag),
            },
        );
        assert!(report.cancelled);
        assert_eq!(report.passes_run, 0);
        assert_eq!(report.moves_applied, 0);
        assert!(state.board().is_consistent());
    }
}
