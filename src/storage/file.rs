//! JSON-file-based storage backend.
//!
//! Stores each key in its own file under a configurable directory
//! (default: `$XDG_DATA_HOME/finance-ai/`).

use core::future::{self, Future};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::error::{FinanceError, Result};

/// Application name used for the XDG data directory.
const APP_NAME: &str = "finance-ai";

/// Extension appended to every key.
const EXTENSION: &str = "json";

/// Sentinel file used for cross-process file locking.
const LOCK_FILE: &str = "storage.lock";

/// File-backed key/value storage.
///
/// # Concurrency
///
/// Thread safety within a single process is provided by an in-process
/// [`Mutex`]. Cross-process safety is achieved via an advisory file lock
/// on `storage.lock` (using [`std::fs::File::lock`] /
/// [`std::fs::File::lock_shared`]). Reads take a shared lock, writes an
/// exclusive one.
///
/// # File layout
///
/// ```text
/// <dir>/
///   storage.lock          (cross-process lock sentinel)
///   finance-store.json
///   finance-ai-auth.json
/// ```
#[derive(Debug)]
pub struct FileStorage {
    /// Root directory containing all value files.
    dir: PathBuf,
    /// Mutex serializing concurrent in-process access.
    lock: Mutex<()>,
    /// Sentinel file for cross-process advisory locking.
    lock_file: fs::File,
}

impl FileStorage {
    /// Creates a new file storage rooted at the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist, and opens
    /// (or creates) the `storage.lock` sentinel.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the lock
    /// file cannot be opened.
    #[inline]
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(storage_io_error)?;
        let lock_file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))
            .map_err(storage_io_error)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
            lock_file,
        })
    }

    /// Returns the default XDG-compliant data directory for this application.
    ///
    /// On Linux: `$XDG_DATA_HOME/finance-ai/` (typically
    /// `~/.local/share/finance-ai/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be determined.
    #[inline]
    pub fn default_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|data_path| data_path.join(APP_NAME))
            .ok_or_else(|| {
                FinanceError::Storage("could not determine platform data directory".into())
            })
    }

    /// Returns the file path for `key`, rejecting keys that would escape
    /// the storage directory.
    fn path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.contains("..") {
            return Err(FinanceError::Storage(
                format!("invalid storage key \"{key}\"").into(),
            ));
        }
        Ok(self.dir.join(format!("{key}.{EXTENSION}")))
    }

    /// Acquires an in-process mutex guard and a shared (read) file lock,
    /// executes `op`, then releases the file lock.
    fn with_shared_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock_shared().map_err(storage_io_error)?;
        let result = op();
        // Surface the unlock error only when the operation itself succeeded.
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Acquires an in-process mutex guard and an exclusive (write) file
    /// lock, executes `op`, then releases the file lock.
    fn with_exclusive_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock().map_err(storage_io_error)?;
        let result = op();
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Reads the value for `key`. A missing file is an absent key.
    fn read_value(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key)?;
        self.with_shared_lock(|| match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(storage_io_error(err)),
        })
    }

    /// Atomically writes the value for `key` (write-to-tmp then rename).
    fn write_value(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path(key)?;
        let tmp_path = path.with_extension(format!("{EXTENSION}.tmp"));
        self.with_exclusive_lock(|| {
            fs::write(&tmp_path, value).map_err(storage_io_error)?;
            fs::rename(&tmp_path, &path).map_err(storage_io_error)
        })
    }

    /// Deletes the file for `key`. A missing file is not an error.
    fn delete_value(&self, key: &str) -> Result<()> {
        let path = self.path(key)?;
        self.with_exclusive_lock(|| match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_io_error(err)),
        })
    }
}

/// Wraps an I/O error into a [`FinanceError::Storage`].
fn storage_io_error(err: std::io::Error) -> FinanceError {
    FinanceError::Storage(Box::new(err))
}

/// Wraps a mutex poison error into a [`FinanceError::Storage`].
fn lock_poison_error<T>(err: &std::sync::PoisonError<T>) -> FinanceError {
    FinanceError::Storage(err.to_string().into())
}

impl super::Storage for FileStorage {
    #[inline]
    fn get_item(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send {
        future::ready(self.read_value(key))
    }

    #[inline]
    fn set_item(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.write_value(key, &value))
    }

    #[inline]
    fn remove_item(&self, key: &str) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.delete_value(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage as _;

    /// Helper to create a [`FileStorage`] in a temporary directory.
    fn temp_storage() -> (FileStorage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        (storage, dir)
    }

    #[tokio::test]
    async fn absent_key_reads_none() {
        let (storage, _dir) = temp_storage();
        assert!(storage.get_item("finance-store").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn value_is_written_to_key_file() {
        let (storage, dir) = temp_storage();
        storage
            .set_item("finance-store", r#"{"state":{},"version":1}"#.to_owned())
            .await
            .unwrap();
        let on_disk = fs::read_to_string(dir.path().join("finance-store.json")).unwrap();
        assert_eq!(on_disk, r#"{"state":{},"version":1}"#);
        assert!(!dir.path().join("finance-store.json.tmp").exists());
        assert_eq!(
            storage.get_item("finance-store").await.unwrap().as_deref(),
            Some(r#"{"state":{},"version":1}"#)
        );
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let (storage, dir) = temp_storage();
        storage.set_item("finance-ai-auth", "saved".to_owned()).await.unwrap();
        drop(storage);
        let reopened = FileStorage::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(
            reopened.get_item("finance-ai-auth").await.unwrap().as_deref(),
            Some("saved")
        );
    }

    #[tokio::test]
    async fn remove_deletes_file_and_tolerates_absence() {
        let (storage, dir) = temp_storage();
        storage.set_item("k", "v".to_owned()).await.unwrap();
        storage.remove_item("k").await.unwrap();
        assert!(!dir.path().join("k.json").exists());
        storage.remove_item("k").await.unwrap();
        assert!(dir.path().join(LOCK_FILE).exists());
    }

    #[tokio::test]
    async fn path_like_keys_are_rejected() {
        let (storage, _dir) = temp_storage();
        for key in ["../escape", "a/b", "a\\b", ""] {
            let err = storage.set_item(key, "x".to_owned()).await.unwrap_err();
            assert!(matches!(err, FinanceError::Storage(_)), "key {key:?}");
        }
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let _storage = FileStorage::new(nested.clone()).unwrap();
        assert!(nested.join(LOCK_FILE).exists());
    }
}
