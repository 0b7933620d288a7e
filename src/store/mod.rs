//! Persistence adapters for the facility document.
//!
//! The ledger is the only writer. Every successful mutation rewrites the whole
//! document; there is no incremental log.

mod atomic;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;

use crate::error::{LedgerError, Result};
use crate::models::FacilityState;

pub use atomic::atomic_write;

/// Durable home of a [`FacilityState`].
pub trait StateStore: Send + Sync {
    /// Read the stored document. An absent target is a first run and yields
    /// the default (empty) state.
    fn load(&self) -> Result<FacilityState>;

    /// Replace the stored document with `state` in one atomic step.
    fn save(&self, state: &FacilityState) -> Result<()>;

    /// Move an unreadable document out of the way so the next save does not
    /// overwrite it. Returns where it went, if anywhere.
    fn quarantine(&self) -> io::Result<Option<PathBuf>> {
        Ok(None)
    }

    /// Human-readable location used in logs and errors.
    fn describe(&self) -> PathBuf;
}

/// JSON document on the local filesystem.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, reason: impl ToString) -> LedgerError {
        LedgerError::PersistenceCorrupt {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<FacilityState> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No stored state at {}, starting fresh", self.path.display());
                return Ok(FacilityState::default());
            }
            Err(e) => return Err(self.corrupt(e)),
        };

        let state: FacilityState = serde_json::from_str(&content).map_err(|e| self.corrupt(e))?;
        tracing::info!(
            "Loaded {} parked vehicles and {} history records from {}",
            state.active.len(),
            state.history.len(),
            self.path.display()
        );
        Ok(state)
    }

    fn save(&self, state: &FacilityState) -> Result<()> {
        let content = serde_json::to_vec_pretty(state).map_err(|e| {
            LedgerError::PersistenceWriteFailed {
                path: self.path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            }
        })?;

        atomic_write(&self.path, &content).map_err(|source| {
            LedgerError::PersistenceWriteFailed {
                path: self.path.clone(),
                source,
            }
        })?;

        tracing::debug!("Saved facility state to {}", self.path.display());
        Ok(())
    }

    fn quarantine(&self) -> io::Result<Option<PathBuf>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let stamp = Local::now().format("%Y%m%d%H%M%S").to_string();
        let target = (0u32..)
            .map(|n| {
                let mut name = self.path.clone().into_os_string();
                name.push(".corrupt-");
                name.push(&stamp);
                if n > 0 {
                    name.push(format!("-{}", n));
                }
                PathBuf::from(name)
            })
            .find(|candidate| !candidate.exists())
            .ok_or_else(|| io::Error::new(io::ErrorKind::AlreadyExists, "no free quarantine name"))?;
        fs::rename(&self.path, &target)?;
        Ok(Some(target))
    }

    fn describe(&self) -> PathBuf {
        self.path.clone()
    }
}

/// In-process store holding the serialized document, for tests and ephemeral
/// ledgers. Writes go through the same JSON encoding as the file store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<Option<String>>,
    fail_writes: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a raw document, as if written by an earlier run.
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(document.into())),
            fail_writes: Mutex::new(false),
        }
    }

    /// Make subsequent saves fail, simulating a full disk.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().expect("memory store lock poisoned") = fail;
    }

    /// The last saved document, if any.
    pub fn document(&self) -> Option<String> {
        self.document
            .lock()
            .expect("memory store lock poisoned")
            .clone()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<FacilityState> {
        match self.document() {
            Some(document) => {
                serde_json::from_str(&document).map_err(|e| LedgerError::PersistenceCorrupt {
                    path: self.describe(),
                    reason: e.to_string(),
                })
            }
            None => Ok(FacilityState::default()),
        }
    }

    fn save(&self, state: &FacilityState) -> Result<()> {
        if *self.fail_writes.lock().expect("memory store lock poisoned") {
            return Err(LedgerError::PersistenceWriteFailed {
                path: self.describe(),
                source: io::Error::new(io::ErrorKind::Other, "simulated write failure"),
            });
        }
        let document =
            serde_json::to_string(state).map_err(|e| LedgerError::PersistenceWriteFailed {
                path: self.describe(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            })?;
        *self.document.lock().expect("memory store lock poisoned") = Some(document);
        Ok(())
    }

    fn quarantine(&self) -> io::Result<Option<PathBuf>> {
        let mut document = self.document.lock().expect("memory store lock poisoned");
        Ok(document.take().map(|_| self.describe()))
    }

    fn describe(&self) -> PathBuf {
        PathBuf::from(":memory:")
    }
}
