//! Succession chain decomposition.
//!
//! # Overview
//!
//! A [`Chain`] is a maximal run of entities where each one hands off
//! directly to the next. Chains are the unit of layout: every chain gets one
//! lane, and its members are drawn end to end on it.
//!
//! ## Hand-off Rule
//!
//! For every `(parent, child)` pair linked by at least one event, the link is
//! **temporally primary** when any of its events is a `LEGAL_TRANSFER`, or
//! when the event year is within one year of the child's founding and the
//! parent did not outlive the event by more than a year.
//!
//! Each entity then picks at most one predecessor and one successor:
//!
//! - a lone candidate is picked when its link is temporally primary;
//! - with several candidates, exactly one temporally-primary
//!   `LEGAL_TRANSFER` link must exist, otherwise nothing is picked and the
//!   merge/split boundary breaks the chain.
//!
//! Two entities continue one chain only when both sides picked each other
//! and the parent ends (plus one rendering year) no later than the child's
//! founding. Dirty data never errors; it only produces more, shorter chains.

use std::collections::{BTreeMap, HashMap, hash_map::Entry};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::model::{Entity, Event};

/// Tolerance, in years, between an event year and the child's founding year.
const ALIGNMENT_TOLERANCE: i32 = 1;

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Stable handle of a chain inside the per-run chain arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainIdx(pub usize);

impl ChainIdx {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A linear succession of entities occupying one lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    /// Id of the first member entity.
    pub id: String,
    /// Member entity ids in succession order.
    pub members: Vec<String>,
    /// Founding year of the first member.
    pub start: i32,
    /// Latest effective end year across members.
    pub end: i32,
    /// Assigned lane; refined in place by the optimizer.
    pub lane: i32,
}

impl Chain {
    /// `true` if `year` falls within the chain's rendered span, which runs
    /// one year past `end`.
    #[must_use]
    pub const fn renders_at(&self, year: i32) -> bool {
        self.start <= year && year <= self.end + 1
    }
}

// ---------------------------------------------------------------------------
// Link analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct LinkInfo {
    legal: bool,
    primary: bool,
}

/// Predecessor/successor candidates per entity, keyed by entity position.
struct SuccessionIndex {
    preds: Vec<BTreeMap<usize, LinkInfo>>,
    succs: Vec<BTreeMap<usize, LinkInfo>>,
}

impl SuccessionIndex {
    fn build(
        entities: &[Entity],
        ends: &[i32],
        positions: &HashMap<&str, usize>,
        events: &[Event],
    ) -> Self {
        let mut preds: Vec<BTreeMap<usize, LinkInfo>> = vec![BTreeMap::new(); entities.len()];
        let mut succs: Vec<BTreeMap<usize, LinkInfo>> = vec![BTreeMap::new(); entities.len()];

        for event in events {
            let (Some(&p), Some(&c)) = (
                positions.get(event.source_id.as_str()),
                positions.get(event.target_id.as_str()),
            ) else {
                debug!(
                    source = %event.source_id,
                    target = %event.target_id,
                    "ignoring event with unknown endpoint"
                );
                continue;
            };
            if p == c {
                continue;
            }

            let legal = event.kind.is_legal_transfer();
            let primary = legal || is_aligned(event, &entities[p], ends[p], &entities[c]);

            for info in [preds[c].entry(p).or_default(), succs[p].entry(c).or_default()] {
                info.legal |= legal;
                info.primary |= primary;
            }
        }

        Self { preds, succs }
    }
}

/// Non-legal links count as hand-offs only when their timing lines up.
fn is_aligned(event: &Event, parent: &Entity, parent_end: i32, child: &Entity) -> bool {
    let aligned = (event.year - child.founding_year).abs() <= ALIGNMENT_TOLERANCE;
    let contradicted =
        event.year < parent.founding_year || parent_end > event.year + ALIGNMENT_TOLERANCE;
    aligned && !contradicted
}

/// Pick the unambiguous hand-off among `candidates`, if any.
fn choose(candidates: &BTreeMap<usize, LinkInfo>) -> Option<usize> {
    if candidates.len() == 1 {
        return candidates
            .iter()
            .next()
            .filter(|(_, info)| info.primary)
            .map(|(&idx, _)| idx);
    }

    let mut legal = candidates
        .iter()
        .filter(|(_, info)| info.primary && info.legal)
        .map(|(&idx, _)| idx);
    match (legal.next(), legal.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Chain construction
// ---------------------------------------------------------------------------

/// Decompose `entities` into succession chains.
///
/// Chains are returned in discovery order: entities are visited by founding
/// year then id, and each chain start walks forward through agreed hand-offs.
/// Entities that no walk reaches (succession cycles) become singleton chains.
/// Duplicate entity ids keep the first record. All lanes start at 0.
#[must_use]
#[instrument(skip(entities, events), fields(entities = entities.len(), events = events.len()))]
pub fn build_chains(entities: &[Entity], events: &[Event], current_year: i32) -> Vec<Chain> {
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(entities.len());
    for (pos, entity) in entities.iter().enumerate() {
        match positions.entry(entity.id.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(pos);
            }
            Entry::Occupied(_) => {
                debug!(id = %entity.id, "duplicate entity id; keeping first record");
            }
        }
    }

    let ends: Vec<i32> = entities
        .iter()
        .map(|e| e.effective_end_year(current_year))
        .collect();
    let index = SuccessionIndex::build(entities, &ends, &positions, events);

    let chosen_pred: Vec<Option<usize>> = index.preds.iter().map(choose).collect();
    let chosen_succ: Vec<Option<usize>> = index.succs.iter().map(choose).collect();

    let overlaps = |p: usize, c: usize| ends[p] + 1 > entities[c].founding_year;
    let continues = |p: usize, c: usize| {
        chosen_succ[p] == Some(c) && chosen_pred[c] == Some(p) && !overlaps(p, c)
    };

    let mut order: Vec<usize> = positions.values().copied().collect();
    order.sort_by(|&a, &b| {
        entities[a]
            .founding_year
            .cmp(&entities[b].founding_year)
            .then_with(|| entities[a].id.cmp(&entities[b].id))
    });

    let mut visited = vec![false; entities.len()];
    let mut chains = Vec::new();

    for &head in &order {
        if visited[head] {
            continue;
        }
        let starts_chain = chosen_pred[head].is_none_or(|p| !continues(p, head));
        if !starts_chain {
            continue;
        }

        let mut members = vec![head];
        visited[head] = true;
        let mut cur = head;
        while let Some(next) = chosen_succ[cur] {
            if visited[next] || !continues(cur, next) {
                break;
            }
            visited[next] = true;
            members.push(next);
            cur = next;
        }
        chains.push(make_chain(entities, &ends, &members));
    }

    for &pos in &order {
        if !visited[pos] {
            visited[pos] = true;
            debug!(id = %entities[pos].id, "unreached entity becomes a singleton chain");
            chains.push(make_chain(entities, &ends, &[pos]));
        }
    }

    debug!(chains = chains.len(), "chain decomposition complete");
    chains
}

fn make_chain(entities: &[Entity], ends: &[i32], members: &[usize]) -> Chain {
    let first = &entities[members[0]];
    Chain {
        id: first.id.clone(),
        members: members.iter().map(|&m| entities[m].id.clone()).collect(),
        start: first.founding_year,
        end: members.iter().map(|&m| ends[m]).max().unwrap_or(first.founding_year),
        lane: 0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
