use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Tag written into every cache entry. Entries carrying a different tag are
/// treated as misses and overwritten on the next store.
pub const SOLVER_VERSION: &str = "astar-moves-1";

/// One memoized solver result, keyed externally by the puzzle digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub source_label: String,
    /// Move string in `[udlr]*` form. Empty means solved in zero moves;
    /// None means unsolved.
    pub solution: Option<String>,
    pub solved: bool,
    pub hit_limit: bool,
    pub nodes_explored: u64,
    pub time_ms: f64,
    pub move_count: u32,
    /// Unix timestamp, seconds.
    pub cached_at: u64,
    pub solver_version: String,
}

/// Digest-keyed store of solver results, persisted as pretty-printed JSON.
///
/// Reads are version-checked; stale-version entries stay on disk until a new
/// result overwrites them. The driver owns the single writer.
#[derive(Debug, Default)]
pub struct SolutionCache {
    entries: BTreeMap<String, CacheEntry>,
}

impl SolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a cache file, degrading to an empty cache on any failure. A
    /// missing file is the normal first-run case.
    pub fn load(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::info!("cache {} not found, starting empty", path.display());
                return Self::new();
            }
            Err(err) => {
                log::warn!("failed to read cache {}: {}", path.display(), err);
                return Self::new();
            }
        };

        match serde_json::from_str::<BTreeMap<String, CacheEntry>>(&contents) {
            Ok(entries) => {
                log::info!("loaded {} cache entries from {}", entries.len(), path.display());
                SolutionCache { entries }
            }
            Err(err) => {
                log::warn!("failed to parse cache {}: {}", path.display(), err);
                Self::new()
            }
        }
    }

    /// Fetch an entry, honoring the version tag: a mismatch is a miss.
    pub fn lookup(&self, digest: &str, version: &str) -> Option<&CacheEntry> {
        self.entries
            .get(digest)
            .filter(|entry| entry.solver_version == version)
    }

    pub fn insert(&mut self, digest: String, entry: CacheEntry) {
        self.entries.insert(digest, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the full cache as pretty JSON.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        fs::write(path, json)
    }

    /// Write the lite projection: digest to move string, solved entries
    /// only.
    pub fn save_lite(&self, path: &Path) -> io::Result<()> {
        let lite: BTreeMap<&str, &str> = self
            .entries
            .iter()
            .filter_map(|(digest, entry)| {
                entry
                    .solution
                    .as_deref()
                    .filter(|_| entry.solved)
                    .map(|solution| (digest.as_str(), solution))
            })
            .collect();
        let json = serde_json::to_string_pretty(&lite)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        fs::write(path, json)
    }
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
