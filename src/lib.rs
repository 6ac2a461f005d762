//! tile-2048: a sliding-tile puzzle engine with identity-stable tiles.
//!
//! This crate provides:
//! - A `Session` type owning an N x N grid of numbered tiles, with the
//!   two-phase slide-and-merge move resolution, random spawning, and
//!   terminal detection (`engine` module)
//! - A bounded, FIFO-evicting undo stack of full snapshots (`history` module)
//! - The load/save contract for external persistence: serde forms, a
//!   key-value `Store` trait, config and best-score records
//!   (`serialization` module)
//!
//! Quick start:
//! ```
//! use tile_2048::engine::{Difficulty, Direction, MoveOutcome, Session};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // Deterministic session via a seeded RNG
//! let mut rng = StdRng::seed_from_u64(42);
//! let mut session = Session::fresh(4, Difficulty::Normal, &mut rng);
//! assert_eq!(session.tiles().len(), 2);
//!
//! match session.apply_move(Direction::Left, Difficulty::Normal, &mut rng) {
//!     MoveOutcome::Moved { gained, .. } => assert_eq!(session.score(), gained),
//!     MoveOutcome::Blocked => assert_eq!(session.score(), 0),
//! }
//! ```
//!
//! Undo flows through `History`, snapshotting before every move attempt:
//! ```
//! use tile_2048::engine::{Difficulty, Direction, Session};
//! use tile_2048::history::History;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let mut session = Session::fresh(4, Difficulty::Normal, &mut rng);
//! let mut history = History::new();
//!
//! history.snapshot(&session);
//! session.apply_move(Direction::Right, Difficulty::Normal, &mut rng);
//! if let Some(previous) = history.restore() {
//!     session = previous;
//! }
//! assert_eq!(session.score(), 0);
//! ```
//!
//! Tile `id`s are the renderer's animation keys: an id that survives a move
//! is the same tile sliding, and an id that disappears was merged away.

pub mod engine;
pub mod history;
pub mod serialization;
