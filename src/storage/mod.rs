//! Session store: one JSON file per conversation
//!
//! Every session lives in `<dir>/<identifier>.json`. Writes go through a
//! temporary file in the same directory that is synced and then atomically
//! moved over the destination, so readers never observe a partial file.
//! Renames refuse to replace an existing session.

use crate::config::StorageConfig;
use crate::error::{StoreError, StoreResult};
use crate::transcript::Transcript;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub mod types;
pub use types::StoredSession;

/// Environment variable that overrides the session directory
pub const SESSION_DIR_ENV: &str = "CONFAB_SESSION_DIR";

const SESSION_EXTENSION: &str = "json";
const MAX_IDENTIFIER_LEN: usize = 200;

/// Durable single-session-per-key storage
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Open (and create if needed) a store rooted at `dir`
    ///
    /// # Examples
    ///
    /// ```
    /// use confab::storage::SessionStore;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = SessionStore::new(dir.path().join("saved_chats")).unwrap();
    /// assert!(store.list().unwrap().is_empty());
    /// ```
    pub fn new<P: Into<PathBuf>>(dir: P) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        tracing::debug!("Session store at {}", dir.display());
        Ok(Self { dir })
    }

    /// Open the store at the default location
    ///
    /// Honors `CONFAB_SESSION_DIR`, otherwise uses the platform data
    /// directory.
    pub fn from_default_location() -> StoreResult<Self> {
        if let Ok(override_dir) = std::env::var(SESSION_DIR_ENV) {
            return Self::new(override_dir);
        }

        let proj_dirs = ProjectDirs::from("com", "confab", "confab").ok_or_else(|| {
            StoreError::IoFailure(io::Error::new(
                io::ErrorKind::NotFound,
                "could not determine data directory",
            ))
        })?;

        Self::new(proj_dirs.data_dir().join("saved_chats"))
    }

    /// Open the configured store, or the default location when unset
    pub fn from_config(config: &StorageConfig) -> StoreResult<Self> {
        match config.directory.as_deref() {
            Some(dir) if !dir.trim().is_empty() => Self::new(dir),
            _ => Self::from_default_location(),
        }
    }

    /// Directory holding the session files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `transcript` under `id`, replacing any previous content
    pub fn save(&self, id: &str, transcript: &Transcript) -> StoreResult<()> {
        let path = self.path_for(id)?;
        let tmp = self.write_temp(transcript)?;
        tmp.persist(&path).map_err(|e| StoreError::IoFailure(e.error))?;
        tracing::debug!("Saved session {} ({} messages)", id, transcript.len());
        Ok(())
    }

    /// Write `transcript` under `id` only if nothing is stored there yet
    pub fn create(&self, id: &str, transcript: &Transcript) -> StoreResult<()> {
        let path = self.path_for(id)?;
        let tmp = self.write_temp(transcript)?;
        tmp.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                StoreError::Conflict(id.to_string())
            } else {
                StoreError::IoFailure(e.error)
            }
        })?;
        tracing::debug!("Created session {}", id);
        Ok(())
    }

    /// Read the transcript stored under `id`
    pub fn load(&self, id: &str) -> StoreResult<Transcript> {
        let path = self.path_for(id)?;
        let data = fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(id.to_string()),
            io::ErrorKind::InvalidData => StoreError::CorruptData {
                id: id.to_string(),
                reason: e.to_string(),
            },
            _ => StoreError::IoFailure(e),
        })?;

        Transcript::deserialize(&data).map_err(|e| {
            tracing::warn!("Session {} could not be parsed: {}", id, e);
            StoreError::CorruptData {
                id: id.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// True when a session is stored under `id`
    pub fn exists(&self, id: &str) -> bool {
        self.path_for(id).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Remove the session stored under `id`
    pub fn delete(&self, id: &str) -> StoreResult<()> {
        let path = self.path_for(id)?;
        fs::remove_file(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(id.to_string()),
            _ => StoreError::IoFailure(e),
        })?;
        tracing::debug!("Deleted session {}", id);
        Ok(())
    }

    /// Move the session stored under `old_id` to `new_id`
    ///
    /// Fails with `Conflict` rather than replacing an existing session, and
    /// with `NotFound` when `old_id` is absent.
    pub fn rename(&self, old_id: &str, new_id: &str) -> StoreResult<()> {
        let from = self.path_for(old_id)?;
        let to = self.path_for(new_id)?;

        if from == to {
            return if from.is_file() {
                Ok(())
            } else {
                Err(StoreError::NotFound(old_id.to_string()))
            };
        }

        rename_noreplace(&from, &to).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => StoreError::Conflict(new_id.to_string()),
            io::ErrorKind::NotFound => StoreError::NotFound(old_id.to_string()),
            _ => StoreError::IoFailure(e),
        })?;

        tracing::info!("Renamed session {} -> {}", old_id, new_id);
        Ok(())
    }

    /// All stored sessions, most recently modified first
    ///
    /// Ties are broken by identifier ascending. Entries that disappear while
    /// the directory is being scanned are skipped.
    pub fn list(&self) -> StoreResult<Vec<StoredSession>> {
        let mut sessions = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };

            let Some(id) = identifier_from_path(&entry.path()) else {
                continue;
            };

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!("Session {} vanished during listing", id);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if !metadata.is_file() {
                continue;
            }

            let updated_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            sessions.push(StoredSession {
                id,
                updated_at,
                size_bytes: metadata.len(),
            });
        }

        sessions.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(sessions)
    }

    /// Identifiers of all stored sessions, in [`list`](Self::list) order
    pub fn list_ids(&self) -> StoreResult<Vec<String>> {
        Ok(self.list()?.into_iter().map(|s| s.id).collect())
    }

    fn path_for(&self, id: &str) -> StoreResult<PathBuf> {
        validate_identifier(id)?;
        Ok(self.dir.join(format!("{}.{}", id, SESSION_EXTENSION)))
    }

    fn write_temp(&self, transcript: &Transcript) -> StoreResult<NamedTempFile> {
        let data = transcript.serialize().map_err(io::Error::from)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".confab-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        tmp.write_all(data.as_bytes())?;
        tmp.as_file().sync_all()?;

        Ok(tmp)
    }
}

/// Check that `id` can be used as a file stem inside the store directory
pub fn validate_identifier(id: &str) -> StoreResult<()> {
    let invalid = id.trim().is_empty()
        || id.len() > MAX_IDENTIFIER_LEN
        || id.starts_with('.')
        || id.contains(['/', '\\'])
        || id.chars().any(char::is_control);

    if invalid {
        Err(StoreError::InvalidIdentifier(id.to_string()))
    } else {
        Ok(())
    }
}

fn identifier_from_path(path: &Path) -> Option<String> {
    if path.extension()?.to_str()? != SESSION_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.starts_with('.') {
        return None;
    }
    Some(stem.to_string())
}

#[cfg(any(all(target_os = "linux", target_env = "gnu"), target_vendor = "apple"))]
fn c_path(path: &Path) -> io::Result<std::ffi::CString> {
    use std::os::unix::ffi::OsStrExt;
    Ok(std::ffi::CString::new(path.as_os_str().as_bytes())?)
}

/// Atomically move `from` to `to`, failing with `AlreadyExists` if `to` exists
#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn rename_noreplace(from: &Path, to: &Path) -> io::Result<()> {
    let from_c = c_path(from)?;
    let to_c = c_path(to)?;

    // SAFETY: both pointers come from live NUL-terminated CStrings.
    let rc = unsafe {
        libc::renameat2(
            libc::AT_FDCWD,
            from_c.as_ptr(),
            libc::AT_FDCWD,
            to_c.as_ptr(),
            libc::RENAME_NOREPLACE,
        )
    };
    if rc == 0 {
        return Ok(());
    }

    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        // Filesystem or kernel without RENAME_NOREPLACE
        Some(libc::EINVAL) | Some(libc::ENOSYS) => link_then_unlink(from, to),
        _ => Err(err),
    }
}

/// Atomically move `from` to `to`, failing with `AlreadyExists` if `to` exists
#[cfg(target_vendor = "apple")]
fn rename_noreplace(from: &Path, to: &Path) -> io::Result<()> {
    let from_c = c_path(from)?;
    let to_c = c_path(to)?;

    // SAFETY: both pointers come from live NUL-terminated CStrings.
    let rc = unsafe { libc::renamex_np(from_c.as_ptr(), to_c.as_ptr(), libc::RENAME_EXCL) };
    if rc == 0 {
        return Ok(());
    }

    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        // Volume without exclusive rename support
        Some(libc::ENOTSUP) | Some(libc::EINVAL) => link_then_unlink(from, to),
        _ => Err(err),
    }
}

/// Move `from` to `to` without replacing an existing `to`
///
/// Not atomic: between the link and the unlink a concurrent `list` sees the
/// session under both identifiers.
#[cfg(not(any(all(target_os = "linux", target_env = "gnu"), target_vendor = "apple")))]
fn rename_noreplace(from: &Path, to: &Path) -> io::Result<()> {
    link_then_unlink(from, to)
}

fn link_then_unlink(from: &Path, to: &Path) -> io::Result<()> {
    fs::hard_link(from, to)?;
    if let Err(e) = fs::remove_file(from) {
        let _ = fs::remove_file(to);
        return Err(e);
    }
    Ok(())
}
