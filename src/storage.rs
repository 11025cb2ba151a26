// Key-value slot backends and the persistence adapter

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::models::Todo;
use crate::transfer::{self, ImportMode};

/// Default slot key for the todo array
pub const DEFAULT_SLOT: &str = "todos";

/// A durable string-keyed store of string values
pub trait SlotBackend {
    /// Read the value under `key`, `None` if the slot was never written
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value under `key`
    fn write(&mut self, key: &str, value: &str) -> Result<()>;

    fn remove(&mut self, key: &str) -> Result<()>;
}

// ============================================================================
// File backend
// ============================================================================

/// One `<key>.json` file per slot inside a directory
pub struct FileSlots {
    dir: PathBuf,
}

impl FileSlots {
    /// Open or create the slot directory
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create slot directory")?;
        Ok(Self { dir })
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf> {
        validate_slot_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl SlotBackend for FileSlots {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.slot_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read slot file {:?}", path))?;
        Ok(Some(content))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.slot_path(key)?;
        let tmp_path = path.with_extension("json.tmp");
        let lock_path = path.with_extension("json.lock");

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .context("Failed to open slot lock file")?;

        // Acquire exclusive lock before writing
        lock.lock_exclusive().context("Failed to acquire slot lock")?;

        let mut file = File::create(&tmp_path).context("Failed to create temporary slot file")?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, &path).context("Failed to replace slot file")?;

        // Lock is released when `lock` is dropped
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.slot_path(key)?;
        if path.exists() {
            fs::remove_file(&path).context("Failed to remove slot file")?;
        }
        Ok(())
    }
}

// ============================================================================
// SQLite backend
// ============================================================================

/// Slots stored as rows of a single SQLite table
pub struct SqliteSlots {
    db: Connection,
}

impl SqliteSlots {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
        let db = Connection::open(path.as_ref()).context("Failed to open SQLite database")?;
        Self::with_connection(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        Self::with_connection(db)
    }

    fn with_connection(db: Connection) -> Result<Self> {
        debug!("Creating slot schema");
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(Self { db })
    }
}

impl SlotBackend for SqliteSlots {
    fn read(&self, key: &str) -> Result<Option<String>> {
        validate_slot_key(key)?;
        let value = self
            .db
            .query_row("SELECT value FROM slots WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        validate_slot_key(key)?;
        self.db.execute(
            "INSERT OR REPLACE INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, chrono::Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        validate_slot_key(key)?;
        self.db.execute("DELETE FROM slots WHERE key = ?1", [key])?;
        Ok(())
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local slots, optionally capped at a byte quota per write
#[derive(Debug, Default)]
pub struct MemorySlots {
    slots: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes larger than `bytes` fail like a full browser storage quota
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            slots: HashMap::new(),
            quota: Some(bytes),
        }
    }

    /// Pre-populate a slot
    pub fn with_slot(mut self, key: &str, value: &str) -> Self {
        self.slots.insert(key.to_string(), value.to_string());
        self
    }
}

impl SlotBackend for MemorySlots {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        if let Some(quota) = self.quota {
            if value.len() > quota {
                return Err(eyre!("Storage quota exceeded: {} bytes (max {})", value.len(), quota));
            }
        }
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.slots.remove(key);
        Ok(())
    }
}

// ============================================================================
// Persistence adapter
// ============================================================================

/// Reads and writes the whole todo sequence under one slot.
///
/// Neither direction propagates errors: a failed load yields an empty list,
/// a failed save is logged and the in-memory state stays authoritative.
///
/// When a load could not keep every stored entry, the raw slot content is
/// copied to `<key>-backup` before the next save overwrites the slot.
pub struct Persistence {
    backend: Box<dyn SlotBackend>,
    key: String,
    pending_backup: Option<String>,
}

/// Slot key holding the raw content of a lossy load
pub fn backup_key(key: &str) -> String {
    format!("{}-backup", key)
}

impl Persistence {
    pub fn new(backend: Box<dyn SlotBackend>, key: &str) -> Result<Self> {
        validate_slot_key(key)?;
        validate_slot_key(&backup_key(key))?;
        Ok(Self {
            backend,
            key: key.to_string(),
            pending_backup: None,
        })
    }

    /// Adapter on the default `todos` slot
    pub fn with_default_slot(backend: Box<dyn SlotBackend>) -> Self {
        Self {
            backend,
            key: DEFAULT_SLOT.to_string(),
            pending_backup: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the stored todos. Missing or malformed content gives an empty list.
    ///
    /// Individual malformed entries are skipped. Whenever anything stored is
    /// skipped, the raw content is kept for the backup slot.
    pub fn load(&mut self) -> Vec<Todo> {
        self.pending_backup = None;
        let raw = match self.backend.read(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(slot = %self.key, "Slot is empty, starting with no todos");
                return Vec::new();
            }
            Err(e) => {
                warn!(slot = %self.key, error = ?e, "Failed to read slot, starting with no todos");
                return Vec::new();
            }
        };

        let todos = match transfer::parse_document(&raw, ImportMode::Lenient) {
            Ok(todos) => todos,
            Err(e) => {
                warn!(slot = %self.key, error = ?e, "Slot content is malformed, starting with no todos");
                self.pending_backup = Some(raw);
                return Vec::new();
            }
        };

        let stored = serde_json::from_str::<Vec<serde_json::Value>>(&raw)
            .map(|entries| entries.len())
            .unwrap_or_default();
        if todos.len() < stored {
            warn!(
                slot = %self.key,
                kept = todos.len(),
                stored,
                backup = %backup_key(&self.key),
                "Skipped unreadable entries; raw content goes to the backup slot on next save"
            );
            self.pending_backup = Some(raw);
        } else {
            info!(slot = %self.key, count = todos.len(), "Loaded todos");
        }
        todos
    }

    /// Overwrite the slot with the full sequence. Returns whether it was written.
    ///
    /// The first save after a lossy load writes the backup slot first, and
    /// leaves the main slot untouched if that fails.
    pub fn save(&mut self, todos: &[Todo]) -> bool {
        if let Some(raw) = self.pending_backup.take() {
            let key = backup_key(&self.key);
            if let Err(e) = self.backend.write(&key, &raw) {
                error!(slot = %self.key, backup = %key, error = ?e, "Failed to write backup slot; not overwriting todos");
                self.pending_backup = Some(raw);
                return false;
            }
            warn!(slot = %self.key, backup = %key, "Preserved previous slot content before overwriting");
        }

        let result = serde_json::to_string(todos)
            .context("Failed to serialize todos")
            .and_then(|json| self.backend.write(&self.key, &json));

        match result {
            Ok(()) => {
                debug!(slot = %self.key, count = todos.len(), "Saved todos");
                true
            }
            Err(e) => {
                error!(slot = %self.key, error = ?e, "Failed to persist todos; keeping in-memory state");
                false
            }
        }
    }

    /// Raw slot content, for diagnostics
    pub fn raw(&self) -> Option<String> {
        self.backend.read(&self.key).ok().flatten()
    }

    /// Content preserved by the last lossy load, once it has been saved
    pub fn backup(&self) -> Option<String> {
        self.backend.read(&backup_key(&self.key)).ok().flatten()
    }

    /// Whether the next save will write the backup slot first
    pub fn has_pending_backup(&self) -> bool {
        self.pending_backup.is_some()
    }
}

/// Validate a slot key: non-empty, at most 64 chars, alphanumeric with `_`/`-`
pub fn validate_slot_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Slot key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Slot key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid slot key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}
