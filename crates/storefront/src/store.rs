//! Cart identity persistence.
//!
//! The backend correlates every operation on a shopping session through one
//! opaque cart identifier. The client keeps at most one active identifier
//! per context and persists it so a returning session reuses its cart.
//! Persistence is a seam: [`FileIdentityStore`] holds the identifier as a
//! single string in a file, [`MemoryIdentityStore`] backs tests.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use roastery_core::CartId;
use thiserror::Error;

/// Errors that can occur reading or writing the persisted identity.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem access failed.
    #[error("cart state I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The persisted value is not a cart identifier.
    #[error("cart state at {path} is corrupt: {value:?}")]
    Corrupt { path: PathBuf, value: String },
}

/// Storage seam for the current cart identifier.
pub trait IdentityStore: Send + Sync {
    /// Read the persisted identifier, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or holds a value that
    /// is not an identifier.
    fn load(&self) -> Result<Option<CartId>, StoreError>;

    /// Persist an identifier, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn save(&self, id: CartId) -> Result<(), StoreError>;

    /// Discard the persisted identifier unconditionally.
    ///
    /// Clearing an already-empty store is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn clear(&self) -> Result<(), StoreError>;
}

// =============================================================================
// FileIdentityStore
// =============================================================================

/// Identity store backed by a single file holding the identifier string.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    /// Create a store at the given path. The file is created lazily on the
    /// first `save`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Result<Option<CartId>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        trimmed
            .parse::<CartId>()
            .map(Some)
            .map_err(|_| StoreError::Corrupt {
                path: self.path.clone(),
                value: trimmed.to_owned(),
            })
    }

    fn save(&self, id: CartId) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        fs::write(&self.path, id.to_string()).map_err(|e| self.io_error(e))
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

// =============================================================================
// MemoryIdentityStore
// =============================================================================

/// In-memory identity store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    id: Mutex<Option<CartId>>,
}

impl MemoryIdentityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding an identifier.
    #[must_use]
    pub fn holding(id: CartId) -> Self {
        Self {
            id: Mutex::new(Some(id)),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<CartId>> {
        self.id.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Result<Option<CartId>, StoreError> {
        Ok(*self.slot())
    }

    fn save(&self, id: CartId) -> Result<(), StoreError> {
        *self.slot() = Some(id);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot() = None;
        Ok(())
    }
}
