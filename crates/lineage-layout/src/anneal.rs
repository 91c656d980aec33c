//! Simulated annealing over one group.
//!
//! Moves are single-chain relocations sampled uniformly from the group and
//! from the group's lane span widened by the configured window. Improving
//! moves are always accepted; worsening ones with probability
//! `exp(-delta / temperature)`. The temperature cools geometrically every
//! step, whether or not the step moved anything.
//!
//! The best configuration seen is tracked by cumulative delta and restored
//! at the end, so annealing never leaves the group worse than it found it.

use lineage_core::ChainIdx;
use rand::Rng;
use tracing::debug;

use crate::state::{IMPROVEMENT_EPSILON, LayoutState, Move};

/// Outcome of one annealing run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnealOutcome {
    /// Net cost change of the restored configuration (zero or negative).
    pub delta: f64,
    /// Steps whose move was accepted.
    pub accepted: usize,
}

impl AnnealOutcome {
    #[must_use]
    pub fn improved(&self) -> bool {
        self.delta < -IMPROVEMENT_EPSILON
    }
}

/// Anneal `group` in place.
pub fn anneal_group<R: Rng>(
    state: &mut LayoutState<'_>,
    group: &[ChainIdx],
    rng: &mut R,
) -> AnnealOutcome {
    let params = state.config().groupwise;
    let mut outcome = AnnealOutcome {
        delta: 0.0,
        accepted: 0,
    };
    if group.len() < 2 {
        return outcome;
    }

    let (low, high) = lane_window(state, group, params.anneal_window);
    let snapshot = |state: &LayoutState<'_>| -> Vec<Move> {
        group.iter().map(|&c| (c, state.lane_of(c))).collect()
    };

    let mut best = snapshot(state);
    let mut best_delta = 0.0;
    let mut running = 0.0;
    let mut temperature = params.initial_temperature;

    for _ in 0..params.anneal_iterations {
        let member = group[rng.gen_range(0..group.len())];
        let lane = rng.gen_range(low..=high);

        if lane != state.lane_of(member) && !state.collides(member, lane) {
            let delta = state.trial_delta(&[(member, lane)]);
            let accept = delta < 0.0 || rng.gen_range(0.0..1.0) < (-delta / temperature).exp();
            if accept {
                state.place(&[(member, lane)]);
                running += delta;
                outcome.accepted += 1;
                if running < best_delta - IMPROVEMENT_EPSILON {
                    best_delta = running;
                    best = snapshot(state);
                }
            }
        }

        temperature *= params.cooling_rate;
    }

    if best_delta < -IMPROVEMENT_EPSILON {
        state.commit(&best);
    } else {
        state.place(&best);
    }
    outcome.delta = best_delta;
    debug!(
        group = group.len(),
        accepted = outcome.accepted,
        delta = outcome.delta,
        "annealing finished"
    );
    outcome
}

/// The group's lane span widened by `window`, never below lane 0.
fn lane_window(state: &LayoutState<'_>, group: &[ChainIdx], window: u32) -> (i32, i32) {
    let lanes = group.iter().map(|&c| state.lane_of(c));
    let low = lanes.clone().min().unwrap_or(0);
    let high = lanes.max().unwrap_or(0);
    let window = i32::try_from(window).unwrap_or(i32::MAX);
    (low.saturating_sub(window).max(0), high.saturating_add(window))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
