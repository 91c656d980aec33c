//! Family grouping: connected components of chains.
//!
//! # Overview
//!
//! Two chains belong to the same [`Family`] when some event links a member of
//! one to a member of the other, directly or transitively. Families are the
//! unit of schedule gating: sparse or tiny families skip the expensive hub
//! and hybrid phases.
//!
//! ## Ordering
//!
//! Families are sorted by earliest chain start, then by size (largest
//! first), then by smallest chain id. Optimization visits them in this
//! order, so older and bigger clusters claim lanes first.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Bfs;
use serde::Serialize;
use tracing::instrument;

use crate::chain::{Chain, ChainIdx};
use crate::model::Event;
use crate::relations::owner_map;

/// A connected component of chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Family {
    /// Member chains sorted by start year, then handle.
    pub chains: Vec<ChainIdx>,
    /// Earliest start year among members.
    pub min_start: i32,
    /// Distinct inter-chain relations inside the family.
    pub link_count: usize,
}

impl Family {
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// Group `chains` into families using the cross-chain `events`.
#[must_use]
#[instrument(skip(chains, events), fields(chains = chains.len()))]
pub fn build_families(chains: &[Chain], events: &[Event]) -> Vec<Family> {
    let owner = owner_map(chains);

    let mut graph = UnGraph::<ChainIdx, ()>::with_capacity(chains.len(), events.len());
    let nodes: Vec<NodeIndex> = (0..chains.len())
        .map(|i| graph.add_node(ChainIdx(i)))
        .collect();

    for event in events {
        let (Some(&a), Some(&b)) = (
            owner.get(event.source_id.as_str()),
            owner.get(event.target_id.as_str()),
        ) else {
            continue;
        };
        if a == b {
            continue;
        }
        let (na, nb) = (nodes[a.index()], nodes[b.index()]);
        if graph.find_edge(na, nb).is_none() {
            graph.add_edge(na, nb, ());
        }
    }

    let mut component: Vec<Option<usize>> = vec![None; chains.len()];
    let mut groups: Vec<Vec<ChainIdx>> = Vec::new();

    for &root in &nodes {
        if component[root.index()].is_some() {
            continue;
        }
        let label = groups.len();
        let mut members = Vec::new();
        let mut bfs = Bfs::new(&graph, root);
        while let Some(node) = bfs.next(&graph) {
            component[node.index()] = Some(label);
            members.push(graph[node]);
        }
        groups.push(members);
    }

    let mut links = vec![0usize; groups.len()];
    for (a, _) in graph.edge_indices().filter_map(|e| graph.edge_endpoints(e)) {
        if let Some(label) = component[a.index()] {
            links[label] += 1;
        }
    }

    let mut families: Vec<Family> = groups
        .into_iter()
        .zip(links)
        .map(|(mut members, link_count)| {
            members.sort_by_key(|&m| (chains[m.index()].start, m));
            Family {
                min_start: members
                    .iter()
                    .map(|m| chains[m.index()].start)
                    .min()
                    .unwrap_or(i32::MAX),
                chains: members,
                link_count,
            }
        })
        .collect();

    families.sort_by(|a, b| {
        a.min_start
            .cmp(&b.min_start)
            .then_with(|| b.len().cmp(&a.len()))
            .then_with(|| smallest_id(chains, a).cmp(smallest_id(chains, b)))
    });
    families
}

fn smallest_id<'a>(chains: &'a [Chain], family: &Family) -> &'a str {
    family
        .chains
        .iter()
        .map(|m| chains[m.index()].id.as_str())
        .min()
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventKind;

    fn chain(id: &str, start: i32) -> Chain {
        Chain {
            id: id.to_string(),
            members: vec![id.to_string()],
            start,
            end: start + 5,
            lane: 0,
        }
    }

    fn link(a: &str, b: &str) -> Event {
        Event::new(a, b, 2000, EventKind::Merge)
    }

    #[test]
    fn components_follow_events() {
        let chains = vec![chain("a", 2000), chain("b", 2001), chain("c", 1990), chain("d", 2002)];
        let events = vec![link("a", "b"), link("b", "d"), link("a", "nowhere")];
        let families = build_families(&chains, &events);

        assert_eq!(families.len(), 2);
        // "c" starts earliest, so its singleton family comes first.
        assert_eq!(families[0].chains, vec![ChainIdx(2)]);
        assert_eq!(families[1].chains, vec![ChainIdx(0), ChainIdx(1), ChainIdx(3)]);
        assert_eq!(families[1].min_start, 2000);
        assert_eq!(families[1].link_count, 2);
        assert_eq!(families[0].link_count, 0);
    }

    #[test]
    fn ties_prefer_larger_then_smaller_id() {
        let chains = vec![chain("z", 2000), chain("y", 2000), chain("x", 2000), chain("w", 2003)];
        let events = vec![link("y", "w")];
        let families = build_families(&chains, &events);

        let ids: Vec<Vec<&str>> = families
            .iter()
            .map(|f| f.chains.iter().map(|c| chains[c.index()].id.as_str()).collect())
            .collect();
        assert_eq!(ids, vec![vec!["y", "w"], vec!["x"], vec!["z"]]);
    }

    #[test]
    fn every_chain_lands_in_exactly_one_family() {
        let chains: Vec<Chain> = (0..6).map(|i| chain(&format!("c{i}"), 2000 + i)).collect();
        let events = vec![link("c0", "c1"), link("c2", "c3"), link("c3", "c4")];
        let families = build_families(&chains, &events);
        let mut all: Vec<ChainIdx> = families.iter().flat_map(|f| f.chains.clone()).collect();
        all.sort();
        assert_eq!(all, (0..6).map(ChainIdx).collect::<Vec<_>>());
    }
}
