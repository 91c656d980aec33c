//! Parent/child adjacency between chains.
//!
//! Every event whose endpoints live in different chains makes the source's
//! chain a parent of the target's chain. The index is computed once per run
//! and is read-only afterwards; only lanes change during optimization.

use std::collections::{BTreeSet, HashMap};

use crate::chain::{Chain, ChainIdx};
use crate::model::Event;

/// Read-only parent/child adjacency keyed by [`ChainIdx`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relations {
    parents: Vec<Vec<ChainIdx>>,
    children: Vec<Vec<ChainIdx>>,
}

impl Relations {
    /// Build the adjacency from `events`, ignoring events with unknown
    /// endpoints and events inside a single chain.
    #[must_use]
    pub fn from_chains(chains: &[Chain], events: &[Event]) -> Self {
        let owner = owner_map(chains);
        let mut parents = vec![BTreeSet::new(); chains.len()];
        let mut children = vec![BTreeSet::new(); chains.len()];

        for event in events {
            let (Some(&p), Some(&c)) = (
                owner.get(event.source_id.as_str()),
                owner.get(event.target_id.as_str()),
            ) else {
                continue;
            };
            if p == c {
                continue;
            }
            parents[c.index()].insert(p);
            children[p.index()].insert(c);
        }

        Self {
            parents: parents.into_iter().map(|s| s.into_iter().collect()).collect(),
            children: children.into_iter().map(|s| s.into_iter().collect()).collect(),
        }
    }

    /// Number of chains covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Parent chains of `idx`, sorted by handle.
    #[must_use]
    pub fn parents(&self, idx: ChainIdx) -> &[ChainIdx] {
        self.parents.get(idx.index()).map_or(&[], Vec::as_slice)
    }

    /// Child chains of `idx`, sorted by handle.
    #[must_use]
    pub fn children(&self, idx: ChainIdx) -> &[ChainIdx] {
        self.children.get(idx.index()).map_or(&[], Vec::as_slice)
    }

    /// Parents plus children.
    #[must_use]
    pub fn degree(&self, idx: ChainIdx) -> usize {
        self.parents(idx).len() + self.children(idx).len()
    }

    /// `true` if `a` is a parent or a child of `b`.
    #[must_use]
    pub fn is_relative(&self, a: ChainIdx, b: ChainIdx) -> bool {
        self.parents(a).binary_search(&b).is_ok() || self.children(a).binary_search(&b).is_ok()
    }

    /// Parents and children of `idx`, deduplicated and sorted.
    #[must_use]
    pub fn neighbors(&self, idx: ChainIdx) -> Vec<ChainIdx> {
        let set: BTreeSet<ChainIdx> = self
            .parents(idx)
            .iter()
            .chain(self.children(idx))
            .copied()
            .collect();
        set.into_iter().collect()
    }

    /// Other parents of `idx`'s children.
    #[must_use]
    pub fn co_parents(&self, idx: ChainIdx) -> Vec<ChainIdx> {
        let set: BTreeSet<ChainIdx> = self
            .children(idx)
            .iter()
            .flat_map(|&c| self.parents(c).iter().copied())
            .filter(|&p| p != idx)
            .collect();
        set.into_iter().collect()
    }

    /// Other children of `idx`'s parents.
    #[must_use]
    pub fn co_children(&self, idx: ChainIdx) -> Vec<ChainIdx> {
        let set: BTreeSet<ChainIdx> = self
            .parents(idx)
            .iter()
            .flat_map(|&p| self.children(p).iter().copied())
            .filter(|&c| c != idx)
            .collect();
        set.into_iter().collect()
    }

    /// Count of distinct parent→child relations among `members`.
    #[must_use]
    pub fn link_count(&self, members: &[ChainIdx]) -> usize {
        members.iter().map(|&m| self.children(m).len()).sum()
    }
}

/// Map every member entity id to the chain that owns it.
#[must_use]
pub fn owner_map(chains: &[Chain]) -> HashMap<&str, ChainIdx> {
    chains
        .iter()
        .enumerate()
        .flat_map(|(i, chain)| {
            chain
                .members
                .iter()
                .map(move |m| (m.as_str(), ChainIdx(i)))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
