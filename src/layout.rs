//! Assignment of newly registered hippos to screen sides.
//!
//! Sides are handed out round-robin over an eight-slot cycle weighted
//! 3:1:3:1 (top, right, bottom, left), which balances a wide display.

use crate::model::Side;

/// The weighted cycle, walked in order.
pub const SIDE_CYCLE: [Side; 8] = [
    Side::Top,
    Side::Top,
    Side::Top,
    Side::Right,
    Side::Bottom,
    Side::Bottom,
    Side::Bottom,
    Side::Left,
];

/// Stateful cursor over [`SIDE_CYCLE`].
///
/// The cursor is part of session state: a reset store starts again at slot 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutPolicy {
    cursor: usize,
}

impl LayoutPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a given cursor (taken modulo the cycle length).
    pub fn with_cursor(cursor: usize) -> Self {
        Self {
            cursor: cursor % SIDE_CYCLE.len(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The side the next registration will receive.
    pub fn peek(&self) -> Side {
        side_at(self.cursor)
    }

    /// Hand out the next side and advance the cursor.
    pub fn next_side(&mut self) -> Side {
        let side = self.peek();
        self.cursor = (self.cursor + 1) % SIDE_CYCLE.len();
        side
    }
}

fn side_at(slot: usize) -> Side {
    SIDE_CYCLE
        .get(slot % SIDE_CYCLE.len())
        .copied()
        .unwrap_or(Side::Top)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn follows_weighted_cycle_and_wraps() {
        let mut layout = LayoutPolicy::new();
        let sides: Vec<_> = (0..10).map(|_| layout.next_side()).collect();
        assert_eq!(&sides[..8], &SIDE_CYCLE);
        assert_eq!(sides[8], Side::Top);
        assert_eq!(sides[9], Side::Top);
        assert_eq!(layout.cursor(), 2);
    }

    #[test]
    fn cycle_ratio_is_three_one_three_one() {
        let count = |side| SIDE_CYCLE.iter().filter(|s| **s == side).count();
        assert_eq!(count(Side::Top), 3);
        assert_eq!(count(Side::Right), 1);
        assert_eq!(count(Side::Bottom), 3);
        assert_eq!(count(Side::Left), 1);
    }

    #[test]
    fn with_cursor_wraps_and_peek_does_not_advance() {
        let layout = LayoutPolicy::with_cursor(11);
        assert_eq!(layout.cursor(), 3);
        assert_eq!(layout.peek(), Side::Right);
        assert_eq!(layout.peek(), Side::Right);
    }
}
