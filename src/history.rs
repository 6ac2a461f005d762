//! Bounded undo history: a FIFO-evicting stack of full session snapshots.

use std::collections::VecDeque;

use crate::engine::Session;

/// Snapshots retained before the oldest is dropped.
pub const UNDO_CAPACITY: usize = 5;

/// Undo history for one game.
///
/// A snapshot is pushed before *every* move attempt, including attempts that
/// turn out blocked, and the whole session is restored on undo. The history
/// is cleared on a new game or a grid-size change, never by ordinary moves.
///
/// ```
/// use tile_2048::engine::Session;
/// use tile_2048::history::History;
///
/// let mut history = History::new();
/// let mut s = Session::new(4);
/// s.insert_tile(2, 0, 0);
///
/// history.snapshot(&s);
/// s.insert_tile(2, 1, 0);
/// let restored = history.restore().unwrap();
/// assert_eq!(restored.tiles().len(), 1);
/// assert!(history.restore().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct History {
    snapshots: VecDeque<Session>,
}

impl History {
    pub fn new() -> Self {
        History {
            snapshots: VecDeque::with_capacity(UNDO_CAPACITY),
        }
    }

    /// Push a structural clone of `session`, evicting the oldest snapshot
    /// once the capacity is exceeded.
    pub fn snapshot(&mut self, session: &Session) {
        self.snapshots.push_back(session.clone());
        if self.snapshots.len() > UNDO_CAPACITY {
            self.snapshots.pop_front();
        }
    }

    /// Pop the most recent snapshot, or `None` when nothing is left to undo
    /// (callers treat that as a no-op).
    pub fn restore(&mut self) -> Option<Session> {
        self.snapshots.pop_back()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Difficulty, Direction, MoveOutcome};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn marked_session(score: u64) -> Session {
        let mut s = Session::new(4);
        s.insert_tile(2, 0, 0);
        s.score = score;
        s
    }

    #[test]
    fn restore_round_trips_a_deep_copy() {
        let mut history = History::new();
        let mut s = marked_session(16);
        history.snapshot(&s);

        // Mutating the live session must not reach into the snapshot.
        s.insert_tile(4, 1, 1);
        s.score = 99;

        let restored = history.restore().unwrap();
        assert_eq!(restored.score(), 16);
        assert_eq!(restored.tiles().len(), 1);
    }

    #[test]
    fn restore_on_empty_history_is_none() {
        let mut history = History::new();
        assert!(history.restore().is_none());
    }

    #[test]
    fn capacity_evicts_oldest_first() {
        let mut history = History::new();
        for score in 0..8 {
            history.snapshot(&marked_session(score));
        }
        assert_eq!(history.len(), UNDO_CAPACITY);
        // Most recent first on the way out; scores 0..=2 were evicted.
        for expected in (3..8).rev() {
            assert_eq!(history.restore().unwrap().score(), expected);
        }
        assert!(history.is_empty());
    }

    #[test]
    fn clear_discards_everything() {
        let mut history = History::new();
        history.snapshot(&marked_session(1));
        history.snapshot(&marked_session(2));
        history.clear();
        assert!(history.restore().is_none());
    }

    #[test]
    fn blocked_move_still_consumes_a_history_slot() {
        // The snapshot is taken before the move is known to be blocked, so
        // a blocked attempt still costs a slot.
        let mut rng = StdRng::seed_from_u64(4);
        let mut history = History::new();
        let mut s = Session::new(4);
        s.insert_tile(2, 0, 0);

        history.snapshot(&s);
        let outcome = s.apply_move(Direction::Left, Difficulty::Normal, &mut rng);
        assert_eq!(outcome, MoveOutcome::Blocked);
        assert_eq!(history.len(), 1);

        // Undoing after a blocked move is harmless: identical state comes back.
        let restored = history.restore().unwrap();
        assert_eq!(restored, s);
    }

    #[test]
    fn undo_rolls_back_a_real_move() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut history = History::new();
        let mut s = Session::new(4);
        s.insert_tile(2, 0, 0);
        s.insert_tile(2, 1, 0);
        let before = s.clone();

        history.snapshot(&s);
        s.apply_move(Direction::Left, Difficulty::Normal, &mut rng);
        assert_ne!(s, before);

        let restored = history.restore().unwrap();
        assert_eq!(restored, before);
    }
}
