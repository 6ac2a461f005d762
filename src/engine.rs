use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tile value that flips a session to [`Status::Won`].
pub const WIN_TILE: u32 = 2048;

/// A direction to slide/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// All four directions, in input-mapper order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// Unit vector this direction moves tiles along.
    #[inline]
    fn vector(self) -> (isize, isize) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }
}

/// Spawn difficulty: `Hard` never produces a 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    /// Probability that a spawned tile is a 2 (the rest are 4s).
    #[inline]
    fn two_chance(self) -> f64 {
        match self {
            Difficulty::Normal => 0.9,
            Difficulty::Hard => 1.0,
        }
    }
}

/// Terminal classification of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Playing,
    Won,
    Lost,
}

/// A single numbered tile with a stable identity.
///
/// `id` is the animation key for renderers: the same id across a move is the
/// same visual element sliding; an id that disappears was consumed by a merge.
/// The three boolean flags are per-move/per-frame scratch state and are never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub id: u32,
    pub value: u32,
    pub x: usize,
    pub y: usize,
    /// Merge guard: set when this tile absorbed a merge this move.
    #[serde(skip)]
    pub(crate) merged: bool,
    /// Arena tombstone: consumed by a merge, awaiting compaction.
    #[serde(skip)]
    pub(crate) retired: bool,
    /// One-shot renderer cue (just spawned or just absorbed a merge).
    #[serde(skip)]
    pub(crate) pop: bool,
}

/// Outcome of [`Session::resolve`]: did anything change, and what was gained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub moved: bool,
    pub gained: u64,
}

/// Outcome of a full [`Session::apply_move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The board changed: score was credited, a tile spawned (unless the
    /// board somehow had no room), and the session was reclassified.
    Moved {
        gained: u64,
        status: Status,
        spawned: bool,
    },
    /// Nothing slid and nothing merged; no state was touched.
    Blocked,
}

/// The complete persistable game state: grid size, tiles, score, id counter.
///
/// All engine operations take and mutate an explicit `Session`; there is no
/// hidden global state. Undo snapshots are plain [`Clone`]s of this value.
///
/// The serialized form uses the field names `N`, `tiles`, `score`, `nextId`.
///
/// ```
/// use tile_2048::engine::{Direction, Session};
///
/// let mut s = Session::new(4);
/// s.insert_tile(2, 0, 0);
/// s.insert_tile(2, 1, 0);
/// let res = s.resolve(Direction::Left);
/// assert!(res.moved);
/// assert_eq!(res.gained, 4);
/// assert_eq!(s.tiles().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "N")]
    pub(crate) size: usize,
    pub(crate) tiles: Vec<Tile>,
    pub(crate) score: u64,
    #[serde(rename = "nextId")]
    pub(crate) next_id: u32,
}

impl Session {
    /// Create an empty session on an `size` x `size` grid.
    ///
    /// # Panics
    /// Panics if `size` is outside `2..=16`.
    pub fn new(size: usize) -> Self {
        assert!((2..=16).contains(&size), "grid size {size} out of range");
        Session {
            size,
            tiles: Vec::new(),
            score: 0,
            next_id: 1,
        }
    }

    /// Start a new game: empty board plus the two opening spawns.
    pub fn fresh<R: Rng + ?Sized>(size: usize, difficulty: Difficulty, rng: &mut R) -> Self {
        let mut session = Session::new(size);
        session.spawn(difficulty, rng);
        session.spawn(difficulty, rng);
        session
    }

    /// Grid size N.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Current score.
    #[inline]
    pub fn score(&self) -> u64 {
        self.score
    }

    /// Live tiles, in arena order.
    #[inline]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Highest tile value on the board (0 when empty).
    pub fn highest_tile(&self) -> u32 {
        self.tiles.iter().map(|t| t.value).max().unwrap_or(0)
    }

    /// Bounds check for possibly-off-grid coordinates.
    #[inline]
    pub fn within(&self, x: isize, y: isize) -> bool {
        let n = self.size as isize;
        x >= 0 && x < n && y >= 0 && y < n
    }

    /// The tile occupying `(x, y)`, if any.
    pub fn tile_at(&self, x: usize, y: usize) -> Option<&Tile> {
        self.index_at(x, y).map(|i| &self.tiles[i])
    }

    /// Empty cells in row-major order (y outer, x inner).
    ///
    /// Occupancy is derived from the tile list on every call; it is never
    /// stored redundantly.
    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        let n = self.size;
        let mut occupied = vec![false; n * n];
        for t in self.tiles.iter().filter(|t| !t.retired) {
            occupied[t.y * n + t.x] = true;
        }
        let mut out = Vec::new();
        for y in 0..n {
            for x in 0..n {
                if !occupied[y * n + x] {
                    out.push((x, y));
                }
            }
        }
        out
    }

    /// Place a tile with a fresh id at `(x, y)`. Intended for setting up
    /// positions; ordinary play only creates tiles through [`Session::spawn`].
    ///
    /// # Panics
    /// Panics if the cell is out of bounds or occupied, or if `value` is not
    /// a power of two >= 2.
    pub fn insert_tile(&mut self, value: u32, x: usize, y: usize) -> u32 {
        assert!(x < self.size && y < self.size, "cell ({x},{y}) out of bounds");
        assert!(self.tile_at(x, y).is_none(), "cell ({x},{y}) already occupied");
        assert!(value >= 2 && value.is_power_of_two(), "bad tile value {value}");
        let id = self.next_id;
        self.next_id += 1;
        self.tiles.push(Tile {
            id,
            value,
            x,
            y,
            merged: false,
            retired: false,
            pop: false,
        });
        id
    }

    /// Spawn one tile in a uniformly random empty cell.
    ///
    /// Value is 2 with probability 0.9 (`Normal`) or 1.0 (`Hard`), else 4.
    /// Returns false on a full board. Unreachable right after a successful
    /// move (a move that changes the board vacates at least one cell) but
    /// handled rather than assumed.
    pub fn spawn<R: Rng + ?Sized>(&mut self, difficulty: Difficulty, rng: &mut R) -> bool {
        let empties = self.empty_cells();
        if empties.is_empty() {
            return false;
        }
        let (x, y) = empties[rng.gen_range(0..empties.len())];
        let value = if rng.gen_bool(difficulty.two_chance()) { 2 } else { 4 };
        let id = self.next_id;
        self.next_id += 1;
        self.tiles.push(Tile {
            id,
            value,
            x,
            y,
            merged: false,
            retired: false,
            pop: true,
        });
        log::debug!("spawned {value} at ({x},{y}) id={id}");
        true
    }

    /// Ids of tiles carrying the one-shot "just appeared" cue, clearing it.
    ///
    /// Renderers call this once per draw; spawned tiles and merge targets
    /// carry the cue.
    pub fn drain_pops(&mut self) -> Vec<u32> {
        let mut ids = Vec::new();
        for t in &mut self.tiles {
            if t.pop {
                ids.push(t.id);
                t.pop = false;
            }
        }
        ids
    }

    /// Slide and merge in `dir` without spawning or scoring.
    ///
    /// Phase 1 moves every tile to its farthest reachable cell, scanning from
    /// the edge the direction points toward (that exact order decides which
    /// tile wins a contested merge; any other order is wrong). Phase 2 merges
    /// each tile into an equal-valued neighbor ahead of it at most once,
    /// doubling the target in place and retiring the source id. Retired
    /// entries are compacted out after the traversal, then a second slide
    /// pass closes the gaps the merges opened.
    pub fn resolve(&mut self, dir: Direction) -> Resolution {
        let (vx, vy) = dir.vector();
        let (xs, ys) = self.traversal(vx, vy);
        for t in &mut self.tiles {
            t.merged = false;
        }

        // Phase 1: slide.
        let mut moved = self.slide_pass(&xs, &ys, vx, vy);

        // Phase 2: merge.
        let mut gained: u64 = 0;
        for &y in &ys {
            for &x in &xs {
                let Some(src) = self.index_at(x, y) else { continue };
                let Some(dst) = self.index_at_signed(x as isize + vx, y as isize + vy) else {
                    continue;
                };
                let mergeable = {
                    let (s, d) = (&self.tiles[src], &self.tiles[dst]);
                    !s.merged && !d.merged && s.value == d.value
                };
                if mergeable {
                    let value = self.tiles[dst].value * 2;
                    self.tiles[dst].value = value;
                    self.tiles[dst].merged = true;
                    self.tiles[dst].pop = true;
                    self.tiles[src].retired = true;
                    gained += u64::from(value);
                    moved = true;
                }
            }
        }

        if gained > 0 {
            self.tiles.retain(|t| !t.retired);
            // Close the cells vacated by retired tiles.
            self.slide_pass(&xs, &ys, vx, vy);
        }
        for t in &mut self.tiles {
            t.merged = false;
        }
        Resolution { moved, gained }
    }

    /// Apply one full move: resolve, credit score, spawn, reclassify.
    ///
    /// A blocked move mutates nothing and returns [`MoveOutcome::Blocked`];
    /// callers snapshot the session to undo history *before* calling this
    /// (the snapshot is taken whether or not the move turns out blocked).
    /// Best-score tracking stays with the caller, keyed by grid size.
    pub fn apply_move<R: Rng + ?Sized>(
        &mut self,
        dir: Direction,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> MoveOutcome {
        let res = self.resolve(dir);
        if !res.moved {
            log::debug!("move {dir:?} blocked");
            return MoveOutcome::Blocked;
        }
        self.score += res.gained;
        let spawned = self.spawn(difficulty, rng);
        let status = self.classify();
        log::debug!("move {dir:?} gained {} score {}", res.gained, self.score);
        MoveOutcome::Moved {
            gained: res.gained,
            status,
            spawned,
        }
    }

    /// True if any move could still change the board: an empty cell exists,
    /// or some tile has an equal right or down neighbor (sufficient by
    /// symmetry).
    pub fn has_moves(&self) -> bool {
        if self.tiles.len() < self.size * self.size {
            return true;
        }
        for t in &self.tiles {
            if let Some(r) = self.tile_at_signed(t.x as isize + 1, t.y as isize) {
                if r.value == t.value {
                    return true;
                }
            }
            if let Some(d) = self.tile_at_signed(t.x as isize, t.y as isize + 1) {
                if d.value == t.value {
                    return true;
                }
            }
        }
        false
    }

    /// Terminal classification. Reaching [`Status::Won`] does not halt play,
    /// and [`Status::Lost`] destroys nothing (the session stays undoable).
    pub fn classify(&self) -> Status {
        if self.tiles.iter().any(|t| t.value == WIN_TILE) {
            Status::Won
        } else if !self.has_moves() {
            Status::Lost
        } else {
            Status::Playing
        }
    }

    /// Coordinate sequences for one traversal: scanning starts from the edge
    /// the vector points toward, so the axis is reversed on its positive
    /// direction.
    fn traversal(&self, vx: isize, vy: isize) -> (Vec<usize>, Vec<usize>) {
        let mut xs: Vec<usize> = (0..self.size).collect();
        let mut ys: Vec<usize> = (0..self.size).collect();
        if vx == 1 {
            xs.reverse();
        }
        if vy == 1 {
            ys.reverse();
        }
        (xs, ys)
    }

    /// Move every tile to its farthest reachable cell along `(vx, vy)`.
    fn slide_pass(&mut self, xs: &[usize], ys: &[usize], vx: isize, vy: isize) -> bool {
        let mut any = false;
        for &y in ys {
            for &x in xs {
                let Some(idx) = self.index_at(x, y) else { continue };
                let (fx, fy) = self.farthest_from(x, y, vx, vy);
                if (fx, fy) != (x, y) {
                    self.tiles[idx].x = fx;
                    self.tiles[idx].y = fy;
                    any = true;
                }
            }
        }
        any
    }

    /// Walk from `(x, y)` by the vector until the next cell is off-grid or
    /// occupied.
    fn farthest_from(&self, x: usize, y: usize, vx: isize, vy: isize) -> (usize, usize) {
        let (mut nx, mut ny) = (x as isize, y as isize);
        loop {
            let (px, py) = (nx + vx, ny + vy);
            if !self.within(px, py) || self.index_at_signed(px, py).is_some() {
                break;
            }
            nx = px;
            ny = py;
        }
        (nx as usize, ny as usize)
    }

    fn index_at(&self, x: usize, y: usize) -> Option<usize> {
        self.tiles
            .iter()
            .position(|t| !t.retired && t.x == x && t.y == y)
    }

    fn index_at_signed(&self, x: isize, y: isize) -> Option<usize> {
        if !self.within(x, y) {
            return None;
        }
        self.index_at(x as usize, y as usize)
    }

    fn tile_at_signed(&self, x: isize, y: isize) -> Option<&Tile> {
        self.index_at_signed(x, y).map(|i| &self.tiles[i])
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.size;
        let sep = "-".repeat(8 * n);
        writeln!(f)?;
        for y in 0..n {
            for x in 0..n {
                match self.tile_at(x, y) {
                    Some(t) => write!(f, "{:^7}", t.value)?,
                    None => write!(f, "{:^7}", ".")?,
                }
                if x + 1 < n {
                    write!(f, "|")?;
                }
            }
            writeln!(f)?;
            if y + 1 < n {
                writeln!(f, "{sep}")?;
            }
        }
        Ok(())
    }
}
