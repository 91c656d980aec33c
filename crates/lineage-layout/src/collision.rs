//! Family-aware collision detection.
//!
//! Relatives (parent or child chains) may touch end to start on one lane:
//! only a true overlap collides. Strangers need a visible gap of at least
//! one year, so touching or adjacent-year intervals collide.

use lineage_core::{ChainIdx, Relations};

use crate::board::{LaneBoard, Slot};

/// `true` if `mover`, spanning `[start, end]`, cannot sit on `lane`.
#[must_use]
pub fn collides(
    board: &LaneBoard<'_>,
    relations: &Relations,
    lane: i32,
    start: i32,
    end: i32,
    mover: ChainIdx,
) -> bool {
    collides_ignoring(board, relations, lane, start, end, mover, &[])
}

/// Like [`collides`], also skipping every chain in `ignore`.
///
/// Used for group moves and swaps, where the ignored chains move at the same
/// time as `mover`.
#[must_use]
pub fn collides_ignoring(
    board: &LaneBoard<'_>,
    relations: &Relations,
    lane: i32,
    start: i32,
    end: i32,
    mover: ChainIdx,
    ignore: &[ChainIdx],
) -> bool {
    board
        .slots(lane)
        .iter()
        .filter(|s| s.chain != mover && !ignore.contains(&s.chain))
        .any(|s| blocks(s, relations, start, end, mover))
}

fn blocks(slot: &Slot, relations: &Relations, start: i32, end: i32, mover: ChainIdx) -> bool {
    let related = relations.is_relative(mover, slot.chain);
    intervals_clash(related, (start, end), (slot.start, slot.end))
}

/// The lane-sharing rule for two closed year intervals.
///
/// Relatives clash only on a true overlap; strangers also clash when they
/// touch.
#[must_use]
pub const fn intervals_clash(related: bool, a: (i32, i32), b: (i32, i32)) -> bool {
    if related {
        a.0 < b.1 && b.0 < a.1
    } else {
        a.0 <= b.1 && b.0 <= a.1
    }
}
