//! Session persistence
//!
//! The session store is an opaque JSON blob under a single key. Hosts plug
//! in their own persistence; the SDK ships an in-memory store and a store
//! that keeps the blob in a JSON file.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::SESSION_STORE_KEY;
use crate::error::{SdkError, SdkResult};
use crate::models::SessionData;

/// Persistent storage of the session blob
pub trait SessionStore: Send + Sync {
    /// Current session, empty if nothing was stored
    fn session_data(&self) -> SdkResult<SessionData>;

    fn set_session_data(&self, data: SessionData) -> SdkResult<()>;

    fn delete_session_data(&self) -> SdkResult<()>;
}

fn poisoned<T>(_: T) -> SdkError {
    SdkError::Unknown("session store lock poisoned".to_string())
}

/// Session store that lives as long as the process
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    data: Mutex<SessionData>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: SessionData) -> Self {
        InMemorySessionStore {
            data: Mutex::new(data),
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn session_data(&self) -> SdkResult<SessionData> {
        Ok(self.data.lock().map_err(poisoned)?.clone())
    }

    fn set_session_data(&self, data: SessionData) -> SdkResult<()> {
        *self.data.lock().map_err(poisoned)? = data;
        Ok(())
    }

    fn delete_session_data(&self) -> SdkResult<()> {
        *self.data.lock().map_err(poisoned)? = SessionData::default();
        Ok(())
    }
}

/// Session store backed by a JSON file
///
/// The file holds a JSON object; the session lives under `blockstack_session`
/// and any other keys are preserved.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileSessionStore {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> SdkResult<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(SdkError::SerializationError(format!(
                "session file {} does not hold a JSON object",
                self.path.display()
            ))),
        }
    }

    fn write_document(&self, document: &Map<String, Value>) -> SdkResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_vec_pretty(document)?)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn session_data(&self) -> SdkResult<SessionData> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        match self.read_document()?.remove(SESSION_STORE_KEY) {
            Some(blob) => SessionData::from_json(blob),
            None => Ok(SessionData::default()),
        }
    }

    fn set_session_data(&self, data: SessionData) -> SdkResult<()> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        let mut document = self.read_document()?;
        document.insert(SESSION_STORE_KEY.to_string(), data.to_json()?);
        self.write_document(&document)?;
        log::debug!("Session written to {}", self.path.display());
        Ok(())
    }

    fn delete_session_data(&self) -> SdkResult<()> {
        let _guard = self.lock.lock().map_err(poisoned)?;
        let mut document = self.read_document()?;
        if document.remove(SESSION_STORE_KEY).is_some() {
            self.write_document(&document)?;
        }
        Ok(())
    }
}
