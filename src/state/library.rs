use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, ViewerError};

/// Every record the viewer persists.
///
/// One JSON value per key, so each concern can be rewritten on its own
/// without touching the (large) image record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey {
    Images,
    CurrentIndex,
    Captions,
    Lifespans,
    TextColors,
    Transforms,
    EngagementStats,
    MottoText,
    FullscreenNote,
}

impl StoreKey {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::Images => "realmImages",
            StoreKey::CurrentIndex => "realmCurrentImageIndex",
            StoreKey::Captions => "realmThoughtTexts",
            StoreKey::Lifespans => "realmBirthDeath",
            StoreKey::TextColors => "realmTextColors",
            StoreKey::Transforms => "realmImageTransforms",
            StoreKey::EngagementStats => "fullscreenEngagementStats",
            StoreKey::MottoText => "mottoTitleText",
            StoreKey::FullscreenNote => "fullscreenNoteText",
        }
    }
}

/// The Library manages the SQLite key/value store.
/// It holds one JSON record per `StoreKey`.
pub struct Library {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl Library {
    /// Open the library at its default location and initialize the schema.
    ///
    /// The database file is created in the user's data directory:
    /// - Linux: ~/.local/share/tribute-viewer/tribute.db
    /// - macOS: ~/Library/Application Support/tribute-viewer/tribute.db
    /// - Windows: %APPDATA%\tribute-viewer\tribute.db
    pub fn new() -> Result<Self> {
        let db_path = Self::default_db_path().ok_or_else(|| {
            ViewerError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine user data directory",
            ))
        })?;
        Self::open(&db_path)
    }

    /// Open (or create) the library at an explicit path
    pub fn open(db_path: &Path) -> Result<Self> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        log::info!("📁 Database initialized at: {}", db_path.display());

        let library = Library {
            conn,
            db_path: Some(db_path.to_path_buf()),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// A throwaway library that lives only in memory
    pub fn open_in_memory() -> Result<Self> {
        let library = Library {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Get the path where the database should be stored
    fn default_db_path() -> Option<PathBuf> {
        let mut path = dirs::data_dir().or_else(dirs::home_dir)?;
        path.push("tribute-viewer");
        path.push("tribute.db");
        Some(path)
    }

    /// Create the records table if it doesn't exist
    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL,
                updated_at      INTEGER NOT NULL
            )",
            [],
        )?;

        log::debug!("✅ Database schema initialized");
        Ok(())
    }

    /// Get the path to the database file (`None` for in-memory libraries)
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Raw JSON text stored under `key`
    pub fn get_raw(&self, key: StoreKey) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM records WHERE key = ?1",
                params![key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Replace the JSON text stored under `key`
    pub fn put_raw(&self, key: StoreKey, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO records (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key.as_str(), value, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    /// Delete the record under `key`
    pub fn remove(&self, key: StoreKey) -> Result<()> {
        self.conn
            .execute("DELETE FROM records WHERE key = ?1", params![key.as_str()])?;
        Ok(())
    }

    /// Deserialize the record under `key`
    pub fn get_json<T: DeserializeOwned>(&self, key: StoreKey) -> Result<Option<T>> {
        match self.get_raw(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Serialize `value` into the record under `key`
    pub fn put_json<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.put_raw(key, &json)
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}

/// Shared handle to a library.
///
/// The media store and the engagement ledger both write through it; the
/// mutex serializes their writes.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    inner: Arc<Mutex<Library>>,
}

impl StoreHandle {
    pub fn new(library: Library) -> Self {
        Self {
            inner: Arc::new(Mutex::new(library)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Library> {
        // A panic while holding the lock cannot leave a half-written record:
        // every write is a single statement.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: StoreKey) -> Result<Option<T>> {
        self.lock().get_json(key)
    }

    pub fn get_raw(&self, key: StoreKey) -> Result<Option<String>> {
        self.lock().get_raw(key)
    }

    pub fn put_json<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) -> Result<()> {
        self.lock().put_json(key, value)
    }

    /// Write a record, logging instead of failing.
    ///
    /// Persistence is best effort: the caller keeps working in memory.
    pub fn save<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) {
        if let Err(e) = self.put_json(key, value) {
            log::error!("❌ Failed to save {}: {}", key.as_str(), e);
        }
    }
}
