//! JSON document store.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::engine::{EngineState, VersionEngine};
use crate::storage::BranchName;

/// Result type for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Persistence errors.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid document name: {0:?}")]
    InvalidDocumentName(String),
}

const MAX_DOCUMENT_NAME: usize = 64;

/// Saves and loads engine states as `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `name`.
    pub fn path_for(&self, name: &str) -> PersistResult<PathBuf> {
        validate_document_name(name)?;
        Ok(self.dir.join(format!("{}.json", name)))
    }

    pub fn exists(&self, name: &str) -> PersistResult<bool> {
        Ok(self.path_for(name)?.is_file())
    }

    /// Read a stored state. `Ok(None)` if the document does not exist.
    pub fn load(&self, name: &str) -> PersistResult<Option<EngineState>> {
        let path = self.path_for(name)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state: EngineState = serde_json::from_slice(&bytes)?;
        debug!(path = %path.display(), commits = state.commits.len(), "loaded document");
        Ok(Some(state))
    }

    /// Write a state, replacing any previous version atomically.
    pub fn save(&self, name: &str, state: &EngineState) -> PersistResult<()> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir)?;

        // write next to the target so the rename stays on one filesystem
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, state)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(path = %path.display(), commits = state.commits.len(), "saved document");
        Ok(())
    }

    /// Load `name` into an engine, or create and save a fresh one.
    pub fn load_or_init(&self, name: &str, default_branch: BranchName) -> PersistResult<VersionEngine> {
        if let Some(state) = self.load(name)? {
            return Ok(VersionEngine::from_state(state));
        }
        let engine = VersionEngine::with_default_branch(default_branch);
        self.save(name, &engine.export_state())?;
        info!(document = name, dir = %self.dir.display(), "initialized new document");
        Ok(engine)
    }

    /// Remove a document. Returns false if it did not exist.
    pub fn remove(&self, name: &str) -> PersistResult<bool> {
        match fs::remove_file(self.path_for(name)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn validate_document_name(name: &str) -> PersistResult<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_DOCUMENT_NAME
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(PersistError::InvalidDocumentName(name.to_string()))
    }
}
