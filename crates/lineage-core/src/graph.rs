//! Input documents and the per-run lineage graph.
//!
//! # Overview
//!
//! A [`LineageInput`] is the JSON document handed to the layout engine:
//! entity records, event records, and an optional initial lane per chain id.
//! [`LineageGraph::from_records`] runs chain decomposition, builds the
//! relation index and groups chains into families. The result is the
//! immutable skeleton that the optimizer refines lanes on.
//!
//! ## Cache Invalidation
//!
//! The graph carries a BLAKE3 hash of the entity and event records. Callers
//! that persist layouts can compare it against a stored value and skip the
//! recompute when the input did not change.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::chain::{Chain, ChainIdx, build_chains};
use crate::family::{Family, build_families};
use crate::model::{Entity, Event};
use crate::relations::Relations;

// ---------------------------------------------------------------------------
// LineageInput
// ---------------------------------------------------------------------------

/// A lineage document as read from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageInput {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub events: Vec<Event>,
    /// Initial lane per chain id. Chains missing here are seeded.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lanes: BTreeMap<String, i32>,
}

impl LineageInput {
    /// Parse a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid lineage document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parse lineage document")
    }

    /// BLAKE3 hash of the entity and event records.
    #[must_use]
    pub fn content_hash(&self) -> String {
        content_hash(&self.entities, &self.events)
    }
}

/// Read a [`LineageInput`] from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_input(path: &Path) -> Result<LineageInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    LineageInput::from_json_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

// ---------------------------------------------------------------------------
// LineageGraph
// ---------------------------------------------------------------------------

/// Chains, their relations and their families for one layout run.
#[derive(Debug, Clone)]
pub struct LineageGraph {
    /// Chain arena; [`ChainIdx`] handles index into it.
    pub chains: Vec<Chain>,
    /// Connected components in processing order.
    pub families: Vec<Family>,
    /// Parent/child adjacency between chains.
    pub relations: Relations,
    /// BLAKE3 hash of the input records.
    pub content_hash: String,
}

impl LineageGraph {
    /// Build chains, relations and families from raw records.
    #[must_use]
    #[instrument(skip(entities, events), fields(entities = entities.len(), events = events.len()))]
    pub fn from_records(entities: &[Entity], events: &[Event], current_year: i32) -> Self {
        let chains = build_chains(entities, events, current_year);
        let relations = Relations::from_chains(&chains, events);
        let families = build_families(&chains, events);
        debug!(
            chains = chains.len(),
            families = families.len(),
            "lineage graph built"
        );
        Self {
            chains,
            families,
            relations,
            content_hash: content_hash(entities, events),
        }
    }

    /// Build the graph for a parsed document.
    #[must_use]
    pub fn from_input(input: &LineageInput, current_year: i32) -> Self {
        Self::from_records(&input.entities, &input.events, current_year)
    }

    /// Number of chains.
    #[must_use]
    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    #[must_use]
    pub fn chain(&self, idx: ChainIdx) -> &Chain {
        &self.chains[idx.index()]
    }

    /// Look up a chain by its id (the id of its first member).
    #[must_use]
    pub fn find(&self, id: &str) -> Option<ChainIdx> {
        self.chains.iter().position(|c| c.id == id).map(ChainIdx)
    }

    /// Copy supplied lanes onto the chains they name.
    ///
    /// Returns the handles of chains that received no lane, in arena order.
    /// Lanes keyed by unknown chain ids are ignored.
    pub fn apply_lanes(&mut self, lanes: &BTreeMap<String, i32>) -> Vec<ChainIdx> {
        let mut unplaced = Vec::new();
        for (i, chain) in self.chains.iter_mut().enumerate() {
            match lanes.get(&chain.id) {
                Some(&lane) => chain.lane = lane,
                None => unplaced.push(ChainIdx(i)),
            }
        }
        unplaced
    }

    /// Current lane per chain id.
    #[must_use]
    pub fn lanes(&self) -> BTreeMap<String, i32> {
        self.chains
            .iter()
            .map(|c| (c.id.clone(), c.lane))
            .collect()
    }
}

/// Compute a BLAKE3 hash of the records, formatted as `blake3:<hex>`.
#[must_use]
pub fn content_hash(entities: &[Entity], events: &[Event]) -> String {
    let mut hasher = blake3::Hasher::new();
    for entity in entities {
        hasher.update(entity.id.as_bytes());
        hasher.update(b"\x00");
        hasher.update(&entity.founding_year.to_le_bytes());
        hasher.update(&entity.dissolution_year.unwrap_or(i32::MIN).to_le_bytes());
        for era in &entity.eras {
            hasher.update(&era.year.to_le_bytes());
        }
        hasher.update(b"\n");
    }
    hasher.update(b"\x01");
    for event in events {
        hasher.update(event.source_id.as_bytes());
        hasher.update(b"\x00");
        hasher.update(event.target_id.as_bytes());
        hasher.update(b"\x00");
        hasher.update(&event.year.to_le_bytes());
        hasher.update(event.kind.as_str().as_bytes());
        hasher.update(b"\n");
    }
    format!("blake3:{}", hasher.finalize().to_hex())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
