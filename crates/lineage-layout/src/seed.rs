//! First-fit initial lane assignment.
//!
//! The optimizer refines an existing layout. Chains without a supplied lane
//! get one here: families are visited in order and their chains by start
//! year. Each chain prefers the rounded mean lane of its already-placed
//! parents (lane 0 without any) and takes the first collision-free lane
//! probing outward: preferred, +1, -1, +2, -2, and so on, never below 0.

use std::collections::{BTreeMap, HashSet};

use lineage_core::{Chain, ChainIdx, Family, Relations};
use tracing::{debug, instrument};

use crate::collision::intervals_clash;

/// Assign lanes to every chain in `unplaced`. Returns how many were placed.
#[instrument(skip_all, fields(unplaced = unplaced.len()))]
pub fn seed_lanes(
    chains: &mut [Chain],
    relations: &Relations,
    families: &[Family],
    unplaced: &[ChainIdx],
) -> usize {
    let mut pending: HashSet<ChainIdx> = unplaced.iter().copied().collect();
    let mut lanes: BTreeMap<i32, Vec<ChainIdx>> = BTreeMap::new();
    for (i, chain) in chains.iter().enumerate() {
        let idx = ChainIdx(i);
        if !pending.contains(&idx) {
            lanes.entry(chain.lane).or_default().push(idx);
        }
    }

    let mut placed = 0;
    for family in families {
        for &idx in &family.chains {
            if !pending.remove(&idx) {
                continue;
            }
            let preferred = preferred_lane(chains, relations, &pending, idx);
            let lane = probe(preferred)
                .find(|&lane| fits(chains, relations, &lanes, idx, lane))
                .unwrap_or(preferred);
            chains[idx.index()].lane = lane;
            lanes.entry(lane).or_default().push(idx);
            placed += 1;
        }
    }

    // Chains outside every family still need a lane.
    let mut rest: Vec<ChainIdx> = pending.into_iter().collect();
    rest.sort_by_key(|&c| (chains[c.index()].start, c));
    for idx in rest {
        let lane = probe(0)
            .find(|&lane| fits(chains, relations, &lanes, idx, lane))
            .unwrap_or(0);
        chains[idx.index()].lane = lane;
        lanes.entry(lane).or_default().push(idx);
        placed += 1;
    }

    debug!(placed, "lane seeding complete");
    placed
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn preferred_lane(
    chains: &[Chain],
    relations: &Relations,
    pending: &HashSet<ChainIdx>,
    idx: ChainIdx,
) -> i32 {
    let lanes: Vec<i32> = relations
        .parents(idx)
        .iter()
        .filter(|&&p| !pending.contains(&p))
        .map(|p| chains[p.index()].lane)
        .collect();
    if lanes.is_empty() {
        return 0;
    }
    let mean = lanes.iter().copied().map(f64::from).sum::<f64>() / lanes.len() as f64;
    (mean.round() as i32).max(0)
}

/// `preferred, +1, -1, +2, -2, ...`, skipping negative lanes.
fn probe(preferred: i32) -> impl Iterator<Item = i32> {
    (0..=i32::MAX)
        .flat_map(move |k| [preferred.saturating_add(k), preferred.saturating_sub(k)])
        .skip(1)
        .filter(|&lane| lane >= 0)
}

fn fits(
    chains: &[Chain],
    relations: &Relations,
    lanes: &BTreeMap<i32, Vec<ChainIdx>>,
    idx: ChainIdx,
    lane: i32,
) -> bool {
    let me = &chains[idx.index()];
    lanes.get(&lane).is_none_or(|occupants| {
        occupants.iter().all(|&other| {
            let them = &chains[other.index()];
            !intervals_clash(
                relations.is_relative(idx, other),
                (me.start, me.end),
                (them.start, them.end),
            )
        })
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
