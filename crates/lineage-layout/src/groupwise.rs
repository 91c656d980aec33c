//! Group-level optimization ("hybrid" passes).
//!
//! # Overview
//!
//! Greedy passes move one chain at a time and get stuck when a whole
//! cluster sits on the wrong side of a neighbour. Hybrid passes split each
//! family into small connected groups and try, in order:
//!
//! 1. a **rigid move** shifting every member by the same lane delta;
//! 2. a **pairwise swap** exchanging the lanes of two members;
//! 3. **simulated annealing** over the group's lane window.
//!
//! Each group runs the steps as a small state machine and stops at the first
//! step that improves it.
//!
//! ## Grouping
//!
//! Chains are seeded in ascending degree order, so fringe chains anchor
//! groups before hubs do. A group grows breadth-first over parent/child
//! links inside the family until it reaches the size cap.

use std::collections::{BTreeSet, HashSet, VecDeque};

use lineage_core::{Chain, ChainIdx, Family, Relations};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::anneal::anneal_group;
use crate::state::{IMPROVEMENT_EPSILON, LayoutState, Move};

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Partition `family` into connected groups of at most `max_size` chains.
#[must_use]
pub fn build_groups(
    family: &Family,
    relations: &Relations,
    chains: &[Chain],
    max_size: usize,
) -> Vec<Vec<ChainIdx>> {
    let max_size = max_size.max(1);
    let members: HashSet<ChainIdx> = family.chains.iter().copied().collect();

    let mut order = family.chains.clone();
    order.sort_by_key(|&c| (relations.degree(c), chains[c.index()].start, c));

    let mut assigned: BTreeSet<ChainIdx> = BTreeSet::new();
    let mut groups = Vec::new();

    for seed in order {
        if assigned.contains(&seed) {
            continue;
        }
        let mut group = Vec::new();
        let mut queue = VecDeque::from([seed]);
        assigned.insert(seed);

        while let Some(current) = queue.pop_front() {
            group.push(current);
            if group.len() + queue.len() >= max_size {
                continue;
            }
            for next in relations.neighbors(current) {
                if group.len() + queue.len() >= max_size {
                    break;
                }
                if members.contains(&next) && assigned.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        groups.push(group);
    }
    groups
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Next step for one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStep {
    TryRigid,
    TrySwap,
    TryAnneal,
    Done,
}

/// Run the hybrid pass over every group of `family`. Returns how many
/// groups improved.
///
/// Each group anneals with its own generator seeded from `seed` and the
/// group's current lanes, so a layout the pass cannot improve is left
/// alone however many times the pass repeats.
pub fn run_hybrid(state: &mut LayoutState<'_>, family: &Family, seed: u64) -> usize {
    let max_size = state.config().groupwise.max_group_size;
    let groups = build_groups(family, state.relations(), state.board().chains(), max_size);

    let mut improved = 0;
    for group in &groups {
        let mut rng = StdRng::seed_from_u64(group_seed(seed, state, group));
        if optimize_group(state, group, &mut rng) {
            improved += 1;
        }
    }
    debug!(groups = groups.len(), improved, "hybrid pass finished");
    improved
}

/// Mix `seed` with the members and lanes of `group`.
fn group_seed(seed: u64, state: &LayoutState<'_>, group: &[ChainIdx]) -> u64 {
    group.iter().fold(splitmix(seed), |acc, &c| {
        let index = u64::try_from(c.0).unwrap_or(u64::MAX);
        let lane = u64::from(state.lane_of(c).unsigned_abs());
        splitmix(acc ^ splitmix((index << 32) | lane))
    })
}

const fn splitmix(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Drive one group through rigid, swap and anneal until one improves it.
pub fn optimize_group<R: Rng>(state: &mut LayoutState<'_>, group: &[ChainIdx], rng: &mut R) -> bool {
    let mut step = GroupStep::TryRigid;
    let mut improved = false;
    while step != GroupStep::Done {
        step = match step {
            GroupStep::TryRigid => {
                if try_rigid(state, group) {
                    improved = true;
                    GroupStep::Done
                } else {
                    GroupStep::TrySwap
                }
            }
            GroupStep::TrySwap => {
                if try_swap(state, group) {
                    improved = true;
                    GroupStep::Done
                } else if group.len() > 1 {
                    GroupStep::TryAnneal
                } else {
                    GroupStep::Done
                }
            }
            GroupStep::TryAnneal => {
                improved = anneal_group(state, group, rng).improved();
                GroupStep::Done
            }
            GroupStep::Done => GroupStep::Done,
        };
    }
    improved
}

/// Best collision-free uniform shift with a strictly negative delta.
pub fn try_rigid(state: &mut LayoutState<'_>, group: &[ChainIdx]) -> bool {
    let reach = i32::try_from(state.config().groupwise.max_rigid_shift).unwrap_or(i32::MAX);
    let mut best: Option<(f64, Vec<Move>)> = None;

    for shift in (-reach..=reach).filter(|&s| s != 0) {
        let moves: Vec<Move> = group
            .iter()
            .map(|&c| (c, state.lane_of(c) + shift))
            .collect();
        if moves.iter().any(|&(c, lane)| lane < 0 || state.collides_ignoring(c, lane, group)) {
            continue;
        }
        let delta = state.trial_delta(&moves);
        if delta < -IMPROVEMENT_EPSILON && best.as_ref().is_none_or(|(d, _)| delta < *d) {
            best = Some((delta, moves));
        }
    }

    apply_best(state, best, "rigid move")
}

/// Best collision-free lane swap between two members with a strictly
/// negative delta.
pub fn try_swap(state: &mut LayoutState<'_>, group: &[ChainIdx]) -> bool {
    let mut best: Option<(f64, Vec<Move>)> = None;

    for (i, &a) in group.iter().enumerate() {
        for &b in &group[i + 1..] {
            let (lane_a, lane_b) = (state.lane_of(a), state.lane_of(b));
            if lane_a == lane_b {
                continue;
            }
            let pair = [a, b];
            if state.collides_ignoring(a, lane_b, &pair) || state.collides_ignoring(b, lane_a, &pair)
            {
                continue;
            }
            let moves = vec![(a, lane_b), (b, lane_a)];
            let delta = state.trial_delta(&moves);
            if delta < -IMPROVEMENT_EPSILON && best.as_ref().is_none_or(|(d, _)| delta < *d) {
                best = Some((delta, moves));
            }
        }
    }

    apply_best(state, best, "pairwise swap")
}

fn apply_best(state: &mut LayoutState<'_>, best: Option<(f64, Vec<Move>)>, what: &str) -> bool {
    let Some((delta, moves)) = best else {
        return false;
    };
    trace!(moves = moves.len(), delta, "{what}");
    state.commit(&moves);
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
