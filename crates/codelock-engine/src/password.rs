//! Persisted password loading.
//!
//! The password lives in a single-line text file. On startup the file is
//! read and trimmed; if it does not exist, the configured default is used and
//! written back so the next start finds it.

use crate::error::{LockError, Result};
use codelock_core::{LockConfig, Password};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Password file with a fallback default.
#[derive(Debug, Clone)]
pub struct PasswordStore {
    path: PathBuf,
    default: String,
}

impl PasswordStore {
    pub fn new(path: impl Into<PathBuf>, default: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            default: default.into(),
        }
    }

    pub fn from_config(config: &LockConfig) -> Self {
        Self::new(&config.password_file, &config.default_password)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted password, or fall back to the default.
    ///
    /// A missing file is replaced by the default. An unparsable file is
    /// reported and the default is used without overwriting it.
    ///
    /// # Errors
    /// `StorageUnavailable` if the file exists but cannot be read, or if
    /// its presence cannot be determined. An invalid default password is a
    /// `Core` error.
    pub fn load_or_init(&self) -> Result<Password> {
        let default = Password::new(&self.default)?;

        let exists = self
            .path
            .try_exists()
            .map_err(|e| LockError::storage_unavailable(&self.path, e))?;

        if !exists {
            info!(path = %self.path.display(), "No password file, using default");
            self.persist(&default);
            return Ok(default);
        }

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.persist(&default);
                return Ok(default);
            }
            Err(e) => return Err(LockError::storage_unavailable(&self.path, e)),
        };

        match Password::new(&contents) {
            Ok(password) => {
                info!(path = %self.path.display(), length = password.len(), "Password loaded");
                Ok(password)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Password file unusable, using default");
                Ok(default)
            }
        }
    }

    fn persist(&self, password: &Password) {
        match fs::write(&self.path, password.to_code_string()) {
            Ok(()) => info!(path = %self.path.display(), "Wrote default password file"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Could not write password file"),
        }
    }
}
