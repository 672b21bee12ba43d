//! Story persistence.
//!
//! Stories live in a single pretty-printed JSON array on disk, newest
//! first. Every mutating operation is a whole-file read-modify-write with
//! no locking: concurrent writers to the same file race and the last one
//! wins. A file that cannot be read or parsed is treated as empty; the
//! failure is logged and swallowed, never surfaced to the caller.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// One saved story. The id comes from the caller and is the only field
/// with enforced meaning; everything else the frontend sends rides along
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Storage capability the front door is built against, so tests can
/// substitute an in-memory fake for the file on disk.
pub trait StoryStore: Send + Sync {
    /// All stories, newest first. Falls back to empty on a broken file.
    fn list_all(&self) -> Vec<StoryRecord>;

    /// Look up one story by id.
    fn get(&self, id: &str) -> Option<StoryRecord>;

    /// Replace the story with the same id in place, or prepend a new one.
    fn upsert(&self, record: StoryRecord) -> Result<()>;

    /// Remove a story. `Ok(false)` means the id was absent and nothing
    /// changed.
    fn delete(&self, id: &str) -> Result<bool>;
}

/// Thread-safe store handle shared across request handlers.
pub type SharedStoryStore = Arc<dyn StoryStore>;

// ─────────────────────────────────────────────────────────────────────────────
// File-backed store
// ─────────────────────────────────────────────────────────────────────────────

/// JSON-file store. Holds only the path; every operation opens the file
/// fresh, which is what makes concurrent same-id writes last-write-wins.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Vec<StoryRecord> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                eprintln!("Failed to read story file {}: {}", self.path.display(), err);
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(stories) => stories,
            Err(err) => {
                eprintln!(
                    "Story file {} is malformed, treating as empty: {}",
                    self.path.display(),
                    err
                );
                Vec::new()
            }
        }
    }

    fn save(&self, stories: &[StoryRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create story directory {}", parent.display())
                })?;
            }
        }

        let json = serde_json::to_string_pretty(stories).context("Failed to serialize stories")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write story file {}", self.path.display()))
    }
}

impl StoryStore for FileStore {
    fn list_all(&self) -> Vec<StoryRecord> {
        self.load()
    }

    fn get(&self, id: &str) -> Option<StoryRecord> {
        self.load().into_iter().find(|s| s.id == id)
    }

    fn upsert(&self, record: StoryRecord) -> Result<()> {
        let mut stories = self.load();
        match stories.iter().position(|s| s.id == record.id) {
            Some(index) => stories[index] = record,
            None => stories.insert(0, record),
        }
        self.save(&stories)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let mut stories = self.load();
        let before = stories.len();
        stories.retain(|s| s.id != id);
        if stories.len() == before {
            return Ok(false);
        }
        self.save(&stories)?;
        Ok(true)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory store
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory fake with the same semantics, for tests and embedding. The
/// mutex is only there to be `Sync`; the file store intentionally has no
/// equivalent.
#[derive(Default)]
pub struct MemoryStore {
    stories: Mutex<Vec<StoryRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoryStore for MemoryStore {
    fn list_all(&self) -> Vec<StoryRecord> {
        self.stories.lock().unwrap().clone()
    }

    fn get(&self, id: &str) -> Option<StoryRecord> {
        self.stories.lock().unwrap().iter().find(|s| s.id == id).cloned()
    }

    fn upsert(&self, record: StoryRecord) -> Result<()> {
        let mut stories = self.stories.lock().unwrap();
        match stories.iter().position(|s| s.id == record.id) {
            Some(index) => stories[index] = record,
            None => stories.insert(0, record),
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let mut stories = self.stories.lock().unwrap();
        let before = stories.len();
        stories.retain(|s| s.id != id);
        Ok(stories.len() != before)
    }
}
