/// Save slot persistence — a key/value preference store and the single
/// snapshot slot kept inside it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

use crate::schema::snapshot::Snapshot;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// String key/value storage that survives between runs.
pub trait Preferences {
    fn has_key(&self, key: &str) -> bool;
    fn get_string(&self, key: &str) -> Option<String>;
    fn set_string(&mut self, key: &str, value: String);
    fn delete_key(&mut self, key: &str);
    /// Write pending changes to durable storage.
    fn flush(&mut self) -> Result<(), PersistenceError>;
}

/// Preferences held in memory only. Used by tests and the WASM bindings,
/// where the browser side owns durable storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    values: BTreeMap<String, String>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Preferences for MemoryPreferences {
    fn has_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_string(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn delete_key(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// Shared preferences: the sequencer owns one handle to the store while the
/// host keeps another to read the saved record back.
impl<P: Preferences> Preferences for Rc<RefCell<P>> {
    fn has_key(&self, key: &str) -> bool {
        self.borrow().has_key(key)
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.borrow().get_string(key)
    }

    fn set_string(&mut self, key: &str, value: String) {
        self.borrow_mut().set_string(key, value);
    }

    fn delete_key(&mut self, key: &str) {
        self.borrow_mut().delete_key(key);
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        self.borrow_mut().flush()
    }
}

/// Preferences stored as a JSON object in a single file.
#[derive(Debug, Clone)]
pub struct FilePreferences {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FilePreferences {
    /// Open the preference file at `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> Result<FilePreferences, PersistenceError> {
        let values = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str(&contents)?
        } else {
            BTreeMap::new()
        };
        Ok(FilePreferences {
            path: path.to_path_buf(),
            values,
        })
    }
}

impl Preferences for FilePreferences {
    fn has_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_string(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn delete_key(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        let contents = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, contents)?;
        debug!(path = %self.path.display(), "preferences flushed");
        Ok(())
    }
}

/// The persistence gateway: one save slot holding one [`Snapshot`].
pub trait SaveStore {
    fn has_saved(&self) -> bool;
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError>;
    /// `Ok(None)` when nothing is saved, `Err` when the record is unreadable.
    fn load(&self) -> Result<Option<Snapshot>, PersistenceError>;
    fn clear(&mut self) -> Result<(), PersistenceError>;
}

/// A [`SaveStore`] writing the snapshot's JSON under a fixed preference key.
#[derive(Debug, Clone)]
pub struct PrefsSaveStore<P: Preferences> {
    prefs: P,
    key: String,
}

impl<P: Preferences> PrefsSaveStore<P> {
    pub fn new(prefs: P, key: impl Into<String>) -> Self {
        Self {
            prefs,
            key: key.into(),
        }
    }

    pub fn prefs(&self) -> &P {
        &self.prefs
    }
}

impl<P: Preferences> SaveStore for PrefsSaveStore<P> {
    fn has_saved(&self) -> bool {
        self.prefs.has_key(&self.key)
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        self.prefs.set_string(&self.key, snapshot.to_json()?);
        self.prefs.flush()
    }

    fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        match self.prefs.get_string(&self.key) {
            Some(json) => Ok(Some(Snapshot::from_json(&json)?)),
            None => Ok(None),
        }
    }

    fn clear(&mut self) -> Result<(), PersistenceError> {
        self.prefs.delete_key(&self.key);
        self.prefs.flush()
    }
}
