//! In-memory storage backend.
//!
//! Provides [`InMemoryStorage`], a thread-safe map that forgets everything
//! when dropped. Used by tests and by callers that do not want persistence.

use core::future::{self, Future};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{FinanceError, Result};

/// Thread-safe in-memory key/value storage.
///
/// # Example
///
/// ```rust
/// use finance_ai::storage::InMemoryStorage;
///
/// let storage = InMemoryStorage::new();
/// assert!(storage.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    /// Stored values by key.
    items: Mutex<HashMap<String, String>>,
}

impl InMemoryStorage {
    /// Creates a new empty in-memory storage.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no key is stored (or the lock is poisoned).
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.with_lock(|items| items.is_empty()).unwrap_or(true)
    }

    /// Acquires the inner lock and applies a closure.
    fn with_lock<R, F: FnOnce(&mut HashMap<String, String>) -> R>(&self, op: F) -> Result<R> {
        let mut items = self.items.lock().map_err(|err| lock_error(&err))?;
        Ok(op(&mut items))
    }
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> FinanceError {
    FinanceError::Storage(err.to_string().into())
}

impl super::Storage for InMemoryStorage {
    #[inline]
    fn get_item(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send {
        future::ready(self.with_lock(|items| items.get(key).cloned()))
    }

    #[inline]
    fn set_item(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.with_lock(|items| {
            let _old = items.insert(key.to_owned(), value);
        }))
    }

    #[inline]
    fn remove_item(&self, key: &str) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.with_lock(|items| {
            let _old = items.remove(key);
        }))
    }
}
