//! Lane occupancy index.
//!
//! # Overview
//!
//! [`LaneBoard`] owns mutable access to the chain arena together with a
//! `lane → slots` index. Every chain has exactly one [`Slot`], stored under
//! the chain's current lane. The only way to change a lane is
//! [`LaneBoard::relocate`], which moves the slot and updates the chain in one
//! step, so the index and the chains cannot drift apart.
//!
//! Slots inside a lane are kept sorted by `(start, chain)`.

use std::collections::BTreeMap;

use lineage_core::{Chain, ChainIdx};

/// One chain's occupied interval on a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start: i32,
    pub end: i32,
    pub chain: ChainIdx,
}

impl Slot {
    fn of(idx: ChainIdx, chain: &Chain) -> Self {
        Self {
            start: chain.start,
            end: chain.end,
            chain: idx,
        }
    }

    /// `true` if the closed interval contains `year`.
    #[must_use]
    pub const fn covers(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }
}

/// Chains plus their lane index; the single writer of lanes during a run.
#[derive(Debug)]
pub struct LaneBoard<'a> {
    chains: &'a mut [Chain],
    lanes: BTreeMap<i32, Vec<Slot>>,
}

impl<'a> LaneBoard<'a> {
    /// Index every chain under its current lane.
    pub fn new(chains: &'a mut [Chain]) -> Self {
        let mut lanes: BTreeMap<i32, Vec<Slot>> = BTreeMap::new();
        for (i, chain) in chains.iter().enumerate() {
            lanes
                .entry(chain.lane)
                .or_default()
                .push(Slot::of(ChainIdx(i), chain));
        }
        for slots in lanes.values_mut() {
            slots.sort_by_key(|s| (s.start, s.chain));
        }
        Self { chains, lanes }
    }

    #[must_use]
    pub fn chains(&self) -> &[Chain] {
        self.chains
    }

    #[must_use]
    pub fn chain(&self, idx: ChainIdx) -> &Chain {
        &self.chains[idx.index()]
    }

    #[must_use]
    pub fn lane_of(&self, idx: ChainIdx) -> i32 {
        self.chains[idx.index()].lane
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Slots on `lane`, sorted by start.
    #[must_use]
    pub fn slots(&self, lane: i32) -> &[Slot] {
        self.lanes.get(&lane).map_or(&[], Vec::as_slice)
    }

    /// Move `idx` to `lane`, keeping the index in step.
    pub fn relocate(&mut self, idx: ChainIdx, lane: i32) {
        let old = self.chains[idx.index()].lane;
        if old == lane {
            return;
        }

        if let Some(slots) = self.lanes.get_mut(&old) {
            slots.retain(|s| s.chain != idx);
            if slots.is_empty() {
                self.lanes.remove(&old);
            }
        }

        let chain = &mut self.chains[idx.index()];
        chain.lane = lane;
        let slot = Slot::of(idx, chain);
        let slots = self.lanes.entry(lane).or_default();
        let at = slots.partition_point(|s| (s.start, s.chain) < (slot.start, slot.chain));
        slots.insert(at, slot);
    }

    /// `true` if any chain other than `exclude` occupies `lane` at `year`.
    #[must_use]
    pub fn occupied_at(&self, lane: i32, year: i32, exclude: ChainIdx) -> bool {
        self.slots(lane)
            .iter()
            .any(|s| s.chain != exclude && s.covers(year))
    }

    /// Number of lanes holding at least one chain.
    #[must_use]
    pub fn occupied_lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Lowest and highest occupied lanes.
    #[must_use]
    pub fn lane_span(&self) -> Option<(i32, i32)> {
        let low = *self.lanes.keys().next()?;
        let high = *self.lanes.keys().next_back()?;
        Some((low, high))
    }

    /// `true` if every chain has exactly one slot, stored under its lane.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let mut seen = vec![0usize; self.chains.len()];
        for (&lane, slots) in &self.lanes {
            if slots.is_empty() {
                return false;
            }
            for slot in slots {
                let Some(chain) = self.chains.get(slot.chain.index()) else {
                    return false;
                };
                if chain.lane != lane || chain.start != slot.start || chain.end != slot.end {
                    return false;
                }
                seen[slot.chain.index()] += 1;
            }
            if slots.windows(2).any(|w| (w[0].start, w[0].chain) > (w[1].start, w[1].chain)) {
                return false;
            }
        }
        seen.iter().all(|&n| n == 1)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
