//! Vertical connector segments between non-adjacent relatives.
//!
//! A parent/child pair whose lanes differ by more than one draws a vertical
//! connector through the lanes in between, at the child's start year. Other
//! chains placed on those lanes around that year sit on top of the
//! connector; the cost model charges them through the blocker term.

use lineage_core::{Chain, ChainIdx, Relations};
use serde::Serialize;

/// A connector strictly spanning the lanes between `lane_low` and `lane_high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub lane_low: i32,
    pub lane_high: i32,
    pub time: i32,
    pub child: ChainIdx,
    pub parent: ChainIdx,
}

impl Segment {
    /// `true` if `lane` lies strictly between the segment's end lanes.
    #[must_use]
    pub const fn crosses(&self, lane: i32) -> bool {
        self.lane_low < lane && lane < self.lane_high
    }

    #[must_use]
    pub fn involves(&self, idx: ChainIdx) -> bool {
        self.child == idx || self.parent == idx
    }
}

/// Emit one segment per parent/child pair more than one lane apart.
#[must_use]
pub fn generate_segments(chains: &[Chain], relations: &Relations) -> Vec<Segment> {
    let mut segments = Vec::new();
    for (i, chain) in chains.iter().enumerate() {
        let child = ChainIdx(i);
        for &parent in relations.parents(child) {
            let parent_lane = chains[parent.index()].lane;
            if (chain.lane - parent_lane).abs() > 1 {
                segments.push(Segment {
                    lane_low: chain.lane.min(parent_lane),
                    lane_high: chain.lane.max(parent_lane),
                    time: chain.start,
                    child,
                    parent,
                });
            }
        }
    }
    segments
}
