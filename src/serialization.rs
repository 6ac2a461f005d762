//! Persistence surfaces: the load/save contract between the engine and an
//! external key-value store.
//!
//! The engine never talks to storage directly; collaborators hand it a
//! [`Store`] (the shape of a browser `localStorage`: string keys to string
//! values). Sessions are saved as JSON under [`STATE_KEY`] with the field
//! names `N`, `tiles`, `score`, `nextId`, configuration under
//! [`CFG_KEY`], and the best score as a per-grid-size integer under
//! `best-2048-{N}`. Corrupt data is an error for sessions (callers fall back
//! to a fresh game) and a logged default for configuration; nothing here
//! panics.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::{Difficulty, Session};

/// Store key holding the serialized session.
pub const STATE_KEY: &str = "state-2048";
/// Store key holding the serialized configuration.
pub const CFG_KEY: &str = "cfg-2048";

/// Store key holding the best score for grid size `n`.
pub fn best_key(n: usize) -> String {
    format!("best-2048-{n}")
}

#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid session: {0}")]
    Invalid(&'static str),
}

/// Minimal key-value storage contract supplied by the host.
pub trait Store {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

/// In-memory store, for tests and hosts without durable storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    map: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.map.insert(key.to_owned(), value);
    }

    fn remove(&mut self, key: &str) {
        self.map.remove(key);
    }
}

/// File-backed store: the whole key map as one JSON document.
///
/// Mutations stay in memory until [`FileStore::persist`] is called, so a
/// failing disk never interrupts play.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    map: HashMap<String, String>,
}

impl FileStore {
    /// Open `path`, loading any existing key map. A missing file starts
    /// empty; an unreadable or non-JSON file is an error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistError> {
        let path = path.as_ref().to_path_buf();
        let map = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(FileStore { path, map })
    }

    /// Start empty at `path`, ignoring whatever the file currently holds.
    pub fn create<P: AsRef<Path>>(path: P) -> Self {
        FileStore {
            path: path.as_ref().to_path_buf(),
            map: HashMap::new(),
        }
    }

    /// Flush the key map back to disk.
    pub fn persist(&self) -> Result<(), PersistError> {
        let text = serde_json::to_string_pretty(&self.map)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.map.insert(key.to_owned(), value);
    }

    fn remove(&mut self, key: &str) {
        self.map.remove(key);
    }
}

/// Host-facing configuration record.
///
/// The engine interprets only `size` and `difficulty`; the rest rides along
/// for the host's renderer and feedback layers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub size: usize,
    pub sound: bool,
    pub haptics: bool,
    pub difficulty: Difficulty,
    pub fast_anim: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            size: 4,
            sound: true,
            haptics: true,
            difficulty: Difficulty::Normal,
            fast_anim: false,
        }
    }
}

/// Serialize `session` into the store under [`STATE_KEY`].
pub fn save_session(store: &mut dyn Store, session: &Session) -> Result<(), PersistError> {
    let text = serde_json::to_string(session)?;
    store.set(STATE_KEY, text);
    Ok(())
}

/// Load and validate the stored session. `Ok(None)` when nothing is stored;
/// `Err` when the data is unparseable or violates an engine invariant.
pub fn load_session(store: &dyn Store) -> Result<Option<Session>, PersistError> {
    let Some(text) = store.get(STATE_KEY) else {
        return Ok(None);
    };
    let session: Session = serde_json::from_str(&text)?;
    validate_session(&session)?;
    Ok(Some(session))
}

/// Resume the stored session, or start a fresh two-tile game when nothing is
/// stored or the stored data is corrupt. Load failure degrades, never
/// crashes.
pub fn resume_or_fresh<R: Rng + ?Sized>(
    store: &dyn Store,
    config: &Config,
    rng: &mut R,
) -> Session {
    match load_session(store) {
        Ok(Some(session)) => session,
        Ok(None) => Session::fresh(config.size, config.difficulty, rng),
        Err(e) => {
            log::warn!("discarding corrupt saved session: {e}");
            Session::fresh(config.size, config.difficulty, rng)
        }
    }
}

/// Check every invariant a session must satisfy before it is trusted:
/// sane grid size, in-bounds unique coordinates, unique ids below `nextId`,
/// power-of-two values.
pub fn validate_session(session: &Session) -> Result<(), PersistError> {
    let n = session.size;
    if !(2..=16).contains(&n) {
        return Err(PersistError::Invalid("grid size out of range"));
    }
    let mut cells = std::collections::HashSet::new();
    let mut ids = std::collections::HashSet::new();
    for t in session.tiles() {
        if t.x >= n || t.y >= n {
            return Err(PersistError::Invalid("tile out of bounds"));
        }
        if !cells.insert((t.x, t.y)) {
            return Err(PersistError::Invalid("two tiles share a cell"));
        }
        if !ids.insert(t.id) {
            return Err(PersistError::Invalid("duplicate tile id"));
        }
        if t.id >= session.next_id {
            return Err(PersistError::Invalid("tile id not below nextId"));
        }
        if t.value < 2 || !t.value.is_power_of_two() {
            return Err(PersistError::Invalid("tile value not a power of two"));
        }
    }
    Ok(())
}

pub fn save_config(store: &mut dyn Store, config: &Config) -> Result<(), PersistError> {
    let text = serde_json::to_string(config)?;
    store.set(CFG_KEY, text);
    Ok(())
}

/// Load the configuration, falling back to defaults on absent or corrupt
/// data (config is never worth failing over).
pub fn load_config(store: &dyn Store) -> Config {
    match store.get(CFG_KEY) {
        Some(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
            log::warn!("discarding corrupt config: {e}");
            Config::default()
        }),
        None => Config::default(),
    }
}

/// Best score recorded for grid size `n` (0 when absent or unreadable).
pub fn load_best(store: &dyn Store, n: usize) -> u64 {
    store
        .get(&best_key(n))
        .and_then(|text| text.parse().ok())
        .unwrap_or(0)
}

/// Record `score` as the best for grid size `n` if it exceeds the stored
/// value. Returns true when the best changed.
pub fn update_best(store: &mut dyn Store, n: usize, score: u64) -> bool {
    if score > load_best(store, n) {
        store.set(&best_key(n), score.to_string());
        true
    } else {
        false
    }
}

pub fn reset_best(store: &mut dyn Store, n: usize) {
    store.remove(&best_key(n));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_session() -> Session {
        let mut s = Session::new(4);
        s.insert_tile(2, 0, 0);
        s.insert_tile(4, 3, 2);
        s.score = 36;
        s
    }

    #[test]
    fn session_round_trips_through_the_store() {
        let mut store = MemoryStore::new();
        let session = sample_session();
        save_session(&mut store, &session).unwrap();
        let loaded = load_session(&store).unwrap().unwrap();
        assert_eq!(loaded, session);
    }

    #[test]
    fn saved_session_uses_the_renamed_json_fields() {
        let mut store = MemoryStore::new();
        save_session(&mut store, &sample_session()).unwrap();
        let text = store.get(STATE_KEY).unwrap();
        assert!(text.contains("\"N\":4"));
        assert!(text.contains("\"nextId\""));
        assert!(!text.contains("merged"));
    }

    #[test]
    fn empty_store_loads_nothing() {
        let store = MemoryStore::new();
        assert!(load_session(&store).unwrap().is_none());
    }

    #[test]
    fn corrupt_session_is_an_error_not_a_panic() {
        let mut store = MemoryStore::new();
        store.set(STATE_KEY, "{not json".to_owned());
        assert!(load_session(&store).is_err());
    }

    #[test]
    fn resume_falls_back_to_a_fresh_game_on_corruption() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut store = MemoryStore::new();
        store.set(STATE_KEY, "{\"N\":4}".to_owned());
        let session = resume_or_fresh(&store, &Config::default(), &mut rng);
        assert_eq!(session.tiles().len(), 2);
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn resume_prefers_the_stored_session() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut store = MemoryStore::new();
        save_session(&mut store, &sample_session()).unwrap();
        let session = resume_or_fresh(&store, &Config::default(), &mut rng);
        assert_eq!(session.score(), 36);
    }

    #[test]
    fn validation_rejects_shared_cells() {
        let mut store = MemoryStore::new();
        store.set(
            STATE_KEY,
            r#"{"N":4,"tiles":[{"id":1,"value":2,"x":0,"y":0},{"id":2,"value":2,"x":0,"y":0}],"score":0,"nextId":3}"#.to_owned(),
        );
        assert!(matches!(
            load_session(&store),
            Err(PersistError::Invalid("two tiles share a cell"))
        ));
    }

    #[test]
    fn validation_rejects_out_of_bounds_tiles() {
        let mut store = MemoryStore::new();
        store.set(
            STATE_KEY,
            r#"{"N":4,"tiles":[{"id":1,"value":2,"x":9,"y":0}],"score":0,"nextId":2}"#.to_owned(),
        );
        assert!(matches!(
            load_session(&store),
            Err(PersistError::Invalid("tile out of bounds"))
        ));
    }

    #[test]
    fn validation_rejects_stale_id_counters() {
        let mut store = MemoryStore::new();
        store.set(
            STATE_KEY,
            r#"{"N":4,"tiles":[{"id":5,"value":2,"x":0,"y":0}],"score":0,"nextId":3}"#.to_owned(),
        );
        assert!(matches!(
            load_session(&store),
            Err(PersistError::Invalid("tile id not below nextId"))
        ));
    }

    #[test]
    fn validation_rejects_non_power_of_two_values() {
        let mut store = MemoryStore::new();
        store.set(
            STATE_KEY,
            r#"{"N":4,"tiles":[{"id":1,"value":3,"x":0,"y":0}],"score":0,"nextId":2}"#.to_owned(),
        );
        assert!(matches!(
            load_session(&store),
            Err(PersistError::Invalid("tile value not a power of two"))
        ));
    }

    #[test]
    fn best_scores_are_keyed_by_grid_size() {
        let mut store = MemoryStore::new();
        assert!(update_best(&mut store, 4, 100));
        assert!(update_best(&mut store, 5, 40));
        assert!(!update_best(&mut store, 4, 80));
        assert_eq!(load_best(&store, 4), 100);
        assert_eq!(load_best(&store, 5), 40);
        reset_best(&mut store, 4);
        assert_eq!(load_best(&store, 4), 0);
        assert_eq!(load_best(&store, 5), 40);
    }

    #[test]
    fn config_round_trips_and_corruption_defaults() {
        let mut store = MemoryStore::new();
        let config = Config {
            size: 6,
            sound: false,
            haptics: true,
            difficulty: Difficulty::Hard,
            fast_anim: true,
        };
        save_config(&mut store, &config).unwrap();
        assert_eq!(load_config(&store), config);

        store.set(CFG_KEY, "not json".to_owned());
        assert_eq!(load_config(&store), Config::default());
    }

    #[test]
    fn file_store_survives_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");

        let mut store = FileStore::open(&path).unwrap();
        save_session(&mut store, &sample_session()).unwrap();
        update_best(&mut store, 4, 36);
        store.persist().unwrap();

        let store = FileStore::open(&path).unwrap();
        let loaded = load_session(&store).unwrap().unwrap();
        assert_eq!(loaded.score(), 36);
        assert_eq!(load_best(&store, 4), 36);
    }

    #[test]
    fn missing_file_store_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("absent.json")).unwrap();
        assert!(load_session(&store).unwrap().is_none());
    }
}
