//! Greedy single-chain optimizer.
//!
//! # Algorithm
//!
//! 1. Order the family's chains by the pass strategy: oldest first,
//!    youngest first, or best-connected first. Ties break by start year,
//!    then handle.
//! 2. For each chain, gather candidate lanes: the current lane, every lane
//!    within the search radius of it, and every lane within the target radius
//!    of each parent's and child's lane. Negative lanes and colliding lanes
//!    are dropped.
//! 3. Pick the strictly cheapest candidate. Ties keep the current lane, then
//!    prefer the lowest lane.
//! 4. Keep the move only if the global delta over the affected set is
//!    strictly negative.

use std::collections::BTreeSet;

use lineage_core::{ChainIdx, Family, Strategy};
use tracing::trace;

use crate::state::{IMPROVEMENT_EPSILON, LayoutState};

/// Visiting order of a greedy pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GreedyOrder {
    /// Ascending start year.
    Parents,
    /// Descending start year.
    Children,
    /// Descending parent plus child count.
    Hubs,
}

impl GreedyOrder {
    /// The greedy order behind `strategy`; `None` for hybrid passes.
    #[must_use]
    pub const fn from_strategy(strategy: Strategy) -> Option<Self> {
        match strategy {
            Strategy::Parents => Some(Self::Parents),
            Strategy::Children => Some(Self::Children),
            Strategy::Hubs => Some(Self::Hubs),
            Strategy::Hybrid => None,
        }
    }
}

/// Run one greedy pass over `family`. Returns the number of moves kept.
pub fn run_pass(state: &mut LayoutState<'_>, family: &Family, order: GreedyOrder) -> usize {
    let mut kept = 0;
    for idx in visit_order(state, family, order) {
        if improve_chain(state, idx) {
            kept += 1;
        }
    }
    kept
}

fn visit_order(state: &LayoutState<'_>, family: &Family, order: GreedyOrder) -> Vec<ChainIdx> {
    let mut chains = family.chains.clone();
    let start = |c: ChainIdx| state.chain(c).start;
    match order {
        GreedyOrder::Parents => chains.sort_by_key(|&c| (start(c), c)),
        GreedyOrder::Children => {
            chains.sort_by(|&a, &b| start(b).cmp(&start(a)).then_with(|| a.cmp(&b)));
        }
        GreedyOrder::Hubs => {
            let degree = |c: ChainIdx| state.relations().degree(c);
            chains.sort_by(|&a, &b| {
                degree(b)
                    .cmp(&degree(a))
                    .then_with(|| start(a).cmp(&start(b)))
                    .then_with(|| a.cmp(&b))
            });
        }
    }
    chains
}

/// Candidate lanes for `idx`, ascending, excluding the current lane.
fn candidate_lanes(state: &LayoutState<'_>, idx: ChainIdx) -> BTreeSet<i32> {
    let search = state.config().search;
    let current = state.lane_of(idx);
    let mut lanes = BTreeSet::new();

    let mut around = |center: i32, radius: u32| {
        let radius = i32::try_from(radius).unwrap_or(i32::MAX);
        for lane in center.saturating_sub(radius)..=center.saturating_add(radius) {
            lanes.insert(lane);
        }
    };
    around(current, search.search_radius);
    let relations = state.relations();
    for &r in relations.parents(idx).iter().chain(relations.children(idx)) {
        around(state.lane_of(r), search.target_radius);
    }

    lanes.retain(|&lane| lane >= 0 && lane != current);
    lanes
}

fn improve_chain(state: &mut LayoutState<'_>, idx: ChainIdx) -> bool {
    let current = state.lane_of(idx);
    let mut best = (current, state.cost_at(idx, current));

    for lane in candidate_lanes(state, idx) {
        if state.collides(idx, lane) {
            continue;
        }
        let cost = state.cost_at(idx, lane);
        if cost < best.1 - IMPROVEMENT_EPSILON {
            best = (lane, cost);
        }
    }

    if best.0 == current {
        return false;
    }
    let kept = state.apply_if_improving(&[(idx, best.0)]);
    if let Some(delta) = kept {
        trace!(chain = %state.chain(idx).id, from = current, to = best.0, delta, "greedy move");
    }
    kept.is_some()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
