//! Lane cost function.
//!
//! # Overview
//!
//! The cost of placing a chain on a candidate lane is the sum of four
//! weighted terms. Lower is better; a chain with no relatives and nothing in
//! its way costs exactly zero.
//!
//! | Term        | Charged for                                                       |
//! |-------------|-------------------------------------------------------------------|
//! | attraction  | squared distance to the mean parent lane and the mean child lane  |
//! | cut-through | each occupied lane a connector to a distant relative passes       |
//! | blocker     | sitting on another pair's connector while rendered at its year    |
//! | y-shape     | co-parents (or siblings) crowding within two lanes                |
//!
//! ## Instants
//!
//! Connectors are drawn at the child's start year, so cut-through checks
//! lane occupancy at the chain's own start for parent connectors and at each
//! child's start for child connectors.

use lineage_core::{ChainIdx, CostWeights, Relations};
use serde::Serialize;

use crate::board::LaneBoard;
use crate::segments::Segment;

/// Co-relatives within this many lanes trigger the y-shape penalty.
const Y_SHAPE_REACH: i32 = 2;

/// Weighted cost terms for one chain on one lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostTerms {
    pub attraction: f64,
    pub cut_through: f64,
    pub blocker: f64,
    pub y_shape: f64,
}

impl CostTerms {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.attraction + self.cut_through + self.blocker + self.y_shape
    }
}

/// Scores chains against the current board and segment set.
#[derive(Debug, Clone, Copy)]
pub struct CostModel<'r> {
    relations: &'r Relations,
    weights: CostWeights,
}

impl<'r> CostModel<'r> {
    #[must_use]
    pub const fn new(relations: &'r Relations, weights: CostWeights) -> Self {
        Self { relations, weights }
    }

    #[must_use]
    pub const fn weights(&self) -> &CostWeights {
        &self.weights
    }

    /// Cost of `idx` if it sat on `lane`, all other lanes unchanged.
    #[must_use]
    pub fn cost(&self, board: &LaneBoard<'_>, segments: &[Segment], idx: ChainIdx, lane: i32) -> f64 {
        self.terms(board, segments, idx, lane).total()
    }

    /// The four weighted terms behind [`CostModel::cost`].
    #[must_use]
    pub fn terms(
        &self,
        board: &LaneBoard<'_>,
        segments: &[Segment],
        idx: ChainIdx,
        lane: i32,
    ) -> CostTerms {
        CostTerms {
            attraction: self.attraction(board, idx, lane),
            cut_through: self.cut_through(board, idx, lane),
            blocker: self.blocker(board, segments, idx, lane),
            y_shape: self.y_shape(board, idx, lane),
        }
    }

    /// Sum of the current-lane costs of `chains`.
    #[must_use]
    pub fn sum(
        &self,
        board: &LaneBoard<'_>,
        segments: &[Segment],
        chains: impl IntoIterator<Item = ChainIdx>,
    ) -> f64 {
        chains
            .into_iter()
            .map(|idx| self.cost(board, segments, idx, board.lane_of(idx)))
            .sum()
    }

    /// Cost of the whole layout.
    #[must_use]
    pub fn total(&self, board: &LaneBoard<'_>, segments: &[Segment]) -> f64 {
        self.sum(board, segments, (0..board.len()).map(ChainIdx))
    }

    // -----------------------------------------------------------------------
    // Terms
    // -----------------------------------------------------------------------

    fn attraction(&self, board: &LaneBoard<'_>, idx: ChainIdx, lane: i32) -> f64 {
        let lane = f64::from(lane);
        let pull = |relatives: &[ChainIdx]| {
            mean_lane(board, relatives).map_or(0.0, |mean| (lane - mean).powi(2))
        };
        let parents = pull(self.relations.parents(idx));
        let children = pull(self.relations.children(idx));
        (parents + children) * self.weights.attraction
    }

    fn cut_through(&self, board: &LaneBoard<'_>, idx: ChainIdx, lane: i32) -> f64 {
        let start = board.chain(idx).start;
        let via_parents: f64 = self
            .relations
            .parents(idx)
            .iter()
            .map(|&p| crossings(board, idx, lane, board.lane_of(p), start))
            .sum();
        let via_children: f64 = self
            .relations
            .children(idx)
            .iter()
            .map(|&c| crossings(board, idx, lane, board.lane_of(c), board.chain(c).start))
            .sum();
        (via_parents + via_children) * self.weights.cut_through
    }

    fn blocker(&self, board: &LaneBoard<'_>, segments: &[Segment], idx: ChainIdx, lane: i32) -> f64 {
        let chain = board.chain(idx);
        let hits: f64 = segments
            .iter()
            .filter(|s| !s.involves(idx) && s.crosses(lane) && chain.renders_at(s.time))
            .map(|_| 1.0)
            .sum();
        hits * self.weights.blocker
    }

    fn y_shape(&self, board: &LaneBoard<'_>, idx: ChainIdx, lane: i32) -> f64 {
        let crowded = |others: &[ChainIdx]| {
            others
                .iter()
                .any(|&o| o != idx && (board.lane_of(o) - lane).abs() <= Y_SHAPE_REACH)
        };
        let merges = self
            .relations
            .children(idx)
            .iter()
            .filter(|&&c| crowded(self.relations.parents(c)))
            .count();
        let splits = self
            .relations
            .parents(idx)
            .iter()
            .filter(|&&p| crowded(self.relations.children(p)))
            .count();
        penalty_count(merges + splits) * self.weights.y_shape
    }
}

/// Occupied lanes strictly between `a` and `b` at `year`, ignoring `idx`.
fn crossings(board: &LaneBoard<'_>, idx: ChainIdx, a: i32, b: i32, year: i32) -> f64 {
    if (a - b).abs() <= 1 {
        return 0.0;
    }
    let (low, high) = (a.min(b), a.max(b));
    ((low + 1)..high)
        .filter(|&l| board.occupied_at(l, year, idx))
        .map(|_| 1.0)
        .sum()
}

#[allow(clippy::cast_precision_loss)]
fn mean_lane(board: &LaneBoard<'_>, chains: &[ChainIdx]) -> Option<f64> {
    if chains.is_empty() {
        return None;
    }
    let sum: f64 = chains.iter().map(|&c| f64::from(board.lane_of(c))).sum();
    Some(sum / chains.len() as f64)
}

#[allow(clippy::cast_precision_loss)]
const fn penalty_count(n: usize) -> f64 {
    n as f64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
