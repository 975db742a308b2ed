//! Process-wide holder of the current credential.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use super::credential::Credential;
use crate::runtime::Runtime;

/// Owner-only permissions for the persisted credential.
const STORAGE_MODE: u32 = 0o600;

/// Holds at most one current [`Credential`].
///
/// Reads always observe the latest value. A persistent store mirrors every
/// change to a JSON file and loads it back on construction; only the
/// credential is ever written there.
pub struct CredentialStore {
    current: RwLock<Option<Credential>>,
    storage: Option<FileStorage>,
}

struct FileStorage {
    runtime: Box<dyn Runtime>,
    path: PathBuf,
}

impl CredentialStore {
    pub fn in_memory() -> Self {
        Self {
            current: RwLock::new(None),
            storage: None,
        }
    }

    /// Opens a store backed by `path`, re-hydrating the credential saved there.
    /// A missing or unreadable file starts the store empty.
    pub fn persistent<R: Runtime + 'static>(runtime: R, path: PathBuf) -> Self {
        let storage = FileStorage {
            runtime: Box::new(runtime),
            path,
        };
        let loaded = storage.load();

        Self {
            current: RwLock::new(loaded),
            storage: Some(storage),
        }
    }

    pub fn storage_path(&self) -> Option<&Path> {
        self.storage.as_ref().map(|s| s.path.as_path())
    }

    pub fn current(&self) -> Option<Credential> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.access_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some_and(|t| !t.is_empty())
    }

    /// Replaces the credential wholesale. The in-memory value is updated even
    /// when persisting it fails.
    ///
    /// The file is written while the write lock is held, so memory and file
    /// change together with respect to [`CredentialStore::clear`].
    pub fn set(&self, credential: Credential) -> Result<()> {
        debug!("Storing credential for uid {}", credential.uid);
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);

        let saved = match &self.storage {
            Some(storage) => storage.save(&credential),
            None => Ok(()),
        };
        *current = Some(credential);
        saved
    }

    /// Drops the credential (logout) and removes the persisted copy.
    pub fn clear(&self) -> Result<()> {
        debug!("Clearing credential");
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        current.take();

        match &self.storage {
            Some(storage) => storage.remove(),
            None => Ok(()),
        }
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl FileStorage {
    fn load(&self) -> Option<Credential> {
        if !self.runtime.exists(&self.path) {
            debug!("No stored credential at {:?}", self.path);
            return None;
        }

        let content = match self.runtime.read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read stored credential {:?}: {:#}", self.path, e);
                return None;
            }
        };

        match serde_json::from_str::<Credential>(&content) {
            Ok(credential) => {
                debug!("Loaded stored credential for uid {}", credential.uid);
                Some(credential)
            }
            Err(e) => {
                warn!("Ignoring corrupt credential file {:?}: {}", self.path, e);
                None
            }
        }
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !self.runtime.exists(parent) {
                self.runtime.create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(credential)?;
        self.runtime
            .write(&self.path, json.as_bytes())
            .with_context(|| format!("Failed to save credential to {:?}", self.path))?;
        self.runtime.set_permissions(&self.path, STORAGE_MODE)?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        if self.runtime.exists(&self.path) {
            self.runtime
                .remove_file(&self.path)
                .with_context(|| format!("Failed to remove credential file {:?}", self.path))?;
        }
        Ok(())
    }
}
