//! Mutable layout state shared by every optimizer.
//!
//! # Overview
//!
//! [`LayoutState`] bundles the [`LaneBoard`], the read-only relation index,
//! the cost model and the current blocker segments. Optimizers never touch
//! lanes directly: they ask for a [`LayoutState::trial_delta`] and then
//! [`LayoutState::commit`] the moves worth keeping.
//!
//! ## Global Delta
//!
//! Moving one chain changes more than its own cost: relatives are pulled
//! differently, connectors appear or vanish, and other chains start or stop
//! sitting on them. A trial applies the moves, regenerates segments, scores
//! the affected set, and reverts. Only chains in the affected set can change
//! cost, so the delta over that set equals the delta of the whole layout.

use std::collections::BTreeSet;

use lineage_core::{Chain, ChainIdx, LayoutConfig, Relations};

use crate::board::LaneBoard;
use crate::collision;
use crate::cost::CostModel;
use crate::segments::{Segment, generate_segments};

/// A delta must fall below `-IMPROVEMENT_EPSILON` to count as an improvement.
pub const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// One chain moving to one lane.
pub type Move = (ChainIdx, i32);

/// Board, relations, cost model and segments for one layout run.
#[derive(Debug)]
pub struct LayoutState<'a> {
    board: LaneBoard<'a>,
    relations: &'a Relations,
    config: &'a LayoutConfig,
    model: CostModel<'a>,
    segments: Vec<Segment>,
    moves_applied: usize,
}

impl<'a> LayoutState<'a> {
    pub fn new(chains: &'a mut [Chain], relations: &'a Relations, config: &'a LayoutConfig) -> Self {
        let board = LaneBoard::new(chains);
        let segments = generate_segments(board.chains(), relations);
        Self {
            board,
            relations,
            config,
            model: CostModel::new(relations, config.weights),
            segments,
            moves_applied: 0,
        }
    }

    #[must_use]
    pub const fn board(&self) -> &LaneBoard<'a> {
        &self.board
    }

    #[must_use]
    pub const fn relations(&self) -> &'a Relations {
        self.relations
    }

    #[must_use]
    pub const fn config(&self) -> &'a LayoutConfig {
        self.config
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Moves committed so far.
    #[must_use]
    pub const fn moves_applied(&self) -> usize {
        self.moves_applied
    }

    #[must_use]
    pub fn chain(&self, idx: ChainIdx) -> &Chain {
        self.board.chain(idx)
    }

    #[must_use]
    pub fn lane_of(&self, idx: ChainIdx) -> i32 {
        self.board.lane_of(idx)
    }

    /// Rebuild the blocker segments from the current lanes.
    pub fn regenerate_segments(&mut self) {
        self.segments = generate_segments(self.board.chains(), self.relations);
    }

    // -----------------------------------------------------------------------
    // Scoring
    // -----------------------------------------------------------------------

    /// Cost of `idx` on `lane` against the current layout.
    #[must_use]
    pub fn cost_at(&self, idx: ChainIdx, lane: i32) -> f64 {
        self.model.cost(&self.board, &self.segments, idx, lane)
    }

    /// Cost of the whole layout.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.model.total(&self.board, &self.segments)
    }

    /// `true` if `idx` cannot sit on `lane`.
    #[must_use]
    pub fn collides(&self, idx: ChainIdx, lane: i32) -> bool {
        let chain = self.board.chain(idx);
        collision::collides(&self.board, self.relations, lane, chain.start, chain.end, idx)
    }

    /// Like [`LayoutState::collides`], skipping chains that move alongside.
    #[must_use]
    pub fn collides_ignoring(&self, idx: ChainIdx, lane: i32, ignore: &[ChainIdx]) -> bool {
        let chain = self.board.chain(idx);
        collision::collides_ignoring(
            &self.board,
            self.relations,
            lane,
            chain.start,
            chain.end,
            idx,
            ignore,
        )
    }

    /// Chains whose cost can change when `moves` are applied.
    ///
    /// Includes the movers and their parents, children, co-parents and
    /// co-children; every chain rendered at the year of a connector a mover
    /// can own; and both ends of every connector strictly spanning a lane in
    /// the range the movers leave or enter.
    #[must_use]
    pub fn affected(&self, moves: &[Move]) -> Vec<ChainIdx> {
        let mut set = BTreeSet::new();
        let mut years = BTreeSet::new();
        let (mut low, mut high) = (i32::MAX, i32::MIN);

        for &(idx, lane) in moves {
            let current = self.board.lane_of(idx);
            low = low.min(current).min(lane);
            high = high.max(current).max(lane);

            set.insert(idx);
            set.extend(self.relations.parents(idx).iter().copied());
            set.extend(self.relations.children(idx).iter().copied());
            set.extend(self.relations.co_parents(idx));
            set.extend(self.relations.co_children(idx));

            years.insert(self.board.chain(idx).start);
            years.extend(
                self.relations
                    .children(idx)
                    .iter()
                    .map(|&c| self.board.chain(c).start),
            );
        }
        if moves.is_empty() {
            return Vec::new();
        }

        for (i, chain) in self.board.chains().iter().enumerate() {
            if years.iter().any(|&y| chain.renders_at(y)) {
                set.insert(ChainIdx(i));
            }
        }

        for i in 0..self.board.len() {
            let child = ChainIdx(i);
            let child_lane = self.board.lane_of(child);
            for &parent in self.relations.parents(child) {
                let parent_lane = self.board.lane_of(parent);
                let inner_low = child_lane.min(parent_lane) + 1;
                let inner_high = child_lane.max(parent_lane) - 1;
                if inner_low.max(low) <= inner_high.min(high) {
                    set.insert(child);
                    set.insert(parent);
                }
            }
        }

        set.into_iter().collect()
    }

    // -----------------------------------------------------------------------
    // Moves
    // -----------------------------------------------------------------------

    /// Net change in layout cost if `moves` were applied. Lanes and
    /// segments are left exactly as they were.
    #[must_use]
    pub fn trial_delta(&mut self, moves: &[Move]) -> f64 {
        let affected = self.affected(moves);
        let before = self.model.sum(&self.board, &self.segments, affected.iter().copied());

        let previous: Vec<Move> = moves
            .iter()
            .map(|&(idx, _)| (idx, self.board.lane_of(idx)))
            .collect();
        self.relocate_all(moves);
        let saved = std::mem::replace(
            &mut self.segments,
            generate_segments(self.board.chains(), self.relations),
        );

        let after = self.model.sum(&self.board, &self.segments, affected.iter().copied());

        self.relocate_all(&previous);
        self.segments = saved;
        after - before
    }

    /// Apply `moves`, refresh segments and count them as one applied move.
    pub fn commit(&mut self, moves: &[Move]) {
        self.place(moves);
        self.moves_applied += 1;
    }

    /// Apply `moves` and refresh segments without counting them.
    pub fn place(&mut self, moves: &[Move]) {
        self.relocate_all(moves);
        self.regenerate_segments();
    }

    /// Commit `moves` if they lower the layout cost. Returns the delta of a
    /// kept move.
    pub fn apply_if_improving(&mut self, moves: &[Move]) -> Option<f64> {
        let delta = self.trial_delta(moves);
        if delta < -IMPROVEMENT_EPSILON {
            self.commit(moves);
            Some(delta)
        } else {
            None
        }
    }

    fn relocate_all(&mut self, moves: &[Move]) {
        for &(idx, lane) in moves {
            self.board.relocate(idx, lane);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_core::{Event, EventKind};

    fn chain(id: &str, start: i32, end: i32, lane: i32) -> Chain {
        Chain {
            id: id.to_string(),
            members: vec![id.to_string()],
            start,
            end,
            lane,
        }
    }

    fn link(a: &str, b: &str) -> Event {
        Event::new(a, b, 2000, EventKind::Merge)
    }

    #[test]
    fn trial_delta_matches_full_recompute_and_reverts() {
        let mut chains = vec![
            chain("p", 1990, 1999, 0),
            chain("c", 2000, 2005, 4),
            chain("bystander", 1998, 2003, 2),
            chain("far", 1950, 1960, 9),
        ];
        let rel = Relations::from_chains(&chains, &[link("p", "c")]);
        let config = LayoutConfig::default();

        let mut moved = chains.clone();
        moved[1].lane = 1;
        let after = {
            let state = LayoutState::new(&mut moved, &rel, &config);
            state.total_cost()
        };

        let mut state = LayoutState::new(&mut chains, &rel, &config);
        let before = state.total_cost();
        let segments = state.segments().to_vec();
        let delta = state.trial_delta(&[(ChainIdx(1), 1)]);

        assert!((delta - (after - before)).abs() < 1e-9);
        assert!(delta < 0.0);
        assert_eq!(state.lane_of(ChainIdx(1)), 4, "lane restored");
        assert_eq!(state.segments(), segments.as_slice(), "segments restored");
        assert!(state.board().is_consistent());
        assert_eq!(state.moves_applied(), 0);
    }

    #[test]
    fn apply_if_improving_keeps_only_strict_improvements() {
        let mut chains = vec![chain("p", 1990, 1999, 0), chain("c", 2000, 2005, 3)];
        let rel = Relations::from_chains(&chains, &[link("p", "c")]);
        let config = LayoutConfig::default();
        let mut state = LayoutState::new(&mut chains, &rel, &config);

        assert!(state.apply_if_improving(&[(ChainIdx(1), 5)]).is_none());
        assert_eq!(state.lane_of(ChainIdx(1)), 3);

        let kept = state.apply_if_improving(&[(ChainIdx(1), 1)]);
        assert!(kept.is_some_and(|d| d < 0.0));
        assert_eq!(state.lane_of(ChainIdx(1)), 1);
        assert_eq!(state.moves_applied(), 1);
        assert!(state.segments().is_empty());
    }

    #[test]
    fn affected_covers_connector_spanning_the_move_range() {
        let mut chains = vec![
            chain("p", 1990, 1999, 0),
            chain("c", 2000, 2005, 6),
            chain("mover", 1900, 1910, 2),
        ];
        let rel = Relations::from_chains(&chains, &[link("p", "c")]);
        let config = LayoutConfig::default();
        let state = LayoutState::new(&mut chains, &rel, &config);

        let affected = state.affected(&[(ChainIdx(2), 3)]);
        assert_eq!(affected, vec![ChainIdx(0), ChainIdx(1), ChainIdx(2)]);

        let outside = state.affected(&[(ChainIdx(2), 8)]);
        assert!(outside.contains(&ChainIdx(1)), "range 2..=8 still crosses");
        assert!(state.affected(&[]).is_empty());
    }
}
