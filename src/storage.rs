//! Pluggable key/value persistence for store snapshots.
//!
//! [`Storage`] is the local-storage analogue the stores persist into:
//! string values under namespaced string keys. Each store writes one
//! key holding a versioned JSON envelope (see [`Persisted`]).

#[cfg(feature = "storage-file")]
mod file;
mod memory;

use core::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[cfg(feature = "storage-file")]
pub use file::FileStorage;
pub use memory::InMemoryStorage;

/// Key under which the finance store persists its collections.
pub const FINANCE_STORE_KEY: &str = "finance-store";

/// Key under which the auth store persists the signed-in user.
pub const AUTH_STORE_KEY: &str = "finance-ai-auth";

/// Version written into every snapshot envelope. Snapshots with any other
/// version are discarded on load.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Async key/value storage backend.
///
/// All methods take `&self`; implementations should use interior
/// mutability (e.g. `Mutex`) for thread-safe mutation.
pub trait Storage: core::fmt::Debug + Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to read.
    fn get_item(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to write.
    fn set_item(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send;

    /// Removes the value under `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to write.
    fn remove_item(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}

impl<S: Storage> Storage for Arc<S> {
    #[inline]
    fn get_item(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send {
        (**self).get_item(key)
    }

    #[inline]
    fn set_item(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send {
        (**self).set_item(key, value)
    }

    #[inline]
    fn remove_item(&self, key: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).remove_item(key)
    }
}

/// Versioned envelope around a persisted snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persisted<T> {
    /// The persisted state.
    pub state: T,
    /// Format version of `state`.
    pub version: u32,
}

/// Loads and decodes the snapshot under `key`.
///
/// Returns `Ok(None)` when nothing is stored, and also when the stored
/// envelope has a different version or cannot be decoded; both cases are
/// logged and the caller falls back to fresh defaults.
///
/// # Errors
///
/// Returns an error only if the storage backend itself fails.
#[inline]
#[tracing::instrument(skip(storage))]
pub async fn load_snapshot<S: Storage, T: DeserializeOwned>(
    storage: &S,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = storage.get_item(key).await? else {
        tracing::debug!("no persisted snapshot");
        return Ok(None);
    };
    let envelope: Persisted<serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(error = %err, "discarding unreadable snapshot");
            return Ok(None);
        }
    };
    if envelope.version != SNAPSHOT_VERSION {
        tracing::warn!(
            found = envelope.version,
            expected = SNAPSHOT_VERSION,
            "discarding snapshot with unsupported version"
        );
        return Ok(None);
    }
    match serde_json::from_value(envelope.state) {
        Ok(state) => Ok(Some(state)),
        Err(err) => {
            tracing::warn!(error = %err, "discarding snapshot with unexpected shape");
            Ok(None)
        }
    }
}

/// Encodes `state` in a versioned envelope and stores it under `key`.
///
/// # Errors
///
/// Returns an error if serialization or the storage backend fails.
#[inline]
#[tracing::instrument(skip(storage, state))]
pub async fn save_snapshot<S: Storage, T: Serialize + Sync>(
    storage: &S,
    key: &str,
    state: &T,
) -> Result<()> {
    let json = serde_json::to_string(&Persisted {
        state,
        version: SNAPSHOT_VERSION,
    })?;
    tracing::trace!(bytes = json.len(), "persisting snapshot");
    storage.set_item(key, json).await
}
