//! Authentication state: the signed-in user and whether the session is
//! valid.
//!
//! Only the user and the authenticated flag are persisted (under
//! [`AUTH_STORE_KEY`]); the loading flag and last error live for the
//! current session only.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::error::Result;
use crate::models::User;
use crate::storage::{AUTH_STORE_KEY, Storage, load_snapshot, save_snapshot};

/// Message recorded when the session check fails.
const AUTH_FAILED: &str = "Failed to authenticate";

/// Current authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    /// The signed-in user, if known.
    pub user: Option<User>,
    /// Whether the last session check succeeded.
    pub is_authenticated: bool,
    /// Whether a session check is in flight.
    pub is_loading: bool,
    /// User-visible message from the last failure.
    pub error: Option<String>,
}

/// The persisted subset of [`AuthState`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AuthSnapshot {
    /// The signed-in user.
    user: Option<User>,
    /// Whether the session was valid.
    is_authenticated: bool,
}

/// Holds the current user and checks the session against the backend.
#[derive(Debug)]
pub struct AuthStore<B, S> {
    /// Remote API.
    backend: B,
    /// Snapshot persistence.
    storage: S,
    /// Current state.
    state: Mutex<AuthState>,
    /// Held for the whole of a snapshot write.
    persisting: tokio::sync::Mutex<()>,
}

impl<B: Backend, S: Storage> AuthStore<B, S> {
    /// Creates a signed-out store. Nothing is read from storage.
    #[inline]
    #[must_use]
    pub fn new(backend: B, storage: S) -> Self {
        Self {
            backend,
            storage,
            state: Mutex::new(AuthState::default()),
            persisting: tokio::sync::Mutex::new(()),
        }
    }

    /// Creates a store from the persisted user and flag, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to read.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub async fn rehydrate(backend: B, storage: S) -> Result<Self> {
        let snapshot: AuthSnapshot = load_snapshot(&storage, AUTH_STORE_KEY)
            .await?
            .unwrap_or_default();
        tracing::debug!(has_user = snapshot.user.is_some(), "rehydrated auth store");
        Ok(Self {
            backend,
            storage,
            state: Mutex::new(AuthState {
                user: snapshot.user,
                is_authenticated: snapshot.is_authenticated,
                is_loading: false,
                error: None,
            }),
            persisting: tokio::sync::Mutex::new(()),
        })
    }

    /// Checks whether the user is signed in.
    ///
    /// With a cached user and a configured session this returns `true`
    /// without a network call. Otherwise it asks the backend who the
    /// session belongs to: on success the user is cached and the result
    /// reports whether a session credential is configured; on failure the
    /// user is cleared, an error message is recorded and `false` is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an error only if persisting the new state fails.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub async fn authenticate(&self) -> Result<bool> {
        let has_session = self.backend.has_session();
        {
            let mut state = self.state();
            if state.user.is_some() && has_session {
                tracing::debug!("using cached user");
                return Ok(true);
            }
            state.is_loading = true;
        }

        let outcome = self.backend.current_user().await;
        let authenticated = {
            let mut state = self.state();
            state.is_loading = false;
            match outcome {
                Ok(user) => {
                    tracing::debug!(user = %user.id, "authenticated");
                    state.user = Some(user);
                    state.is_authenticated = true;
                    state.error = None;
                    has_session
                }
                Err(err) => {
                    tracing::warn!(error = %err, "authentication failed");
                    state.user = None;
                    state.is_authenticated = false;
                    state.error = Some(AUTH_FAILED.to_owned());
                    false
                }
            }
        };
        self.persist().await?;
        Ok(authenticated)
    }

    /// Forgets the user locally. The backend session is not invalidated.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the cleared state fails.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub async fn logout(&self) -> Result<()> {
        {
            let mut state = self.state();
            state.user = None;
            state.is_authenticated = false;
            state.error = None;
        }
        self.persist().await
    }

    /// Sets or clears the user-visible error message.
    #[inline]
    pub fn set_error(&self, error: Option<String>) {
        self.state().error = error;
    }

    /// Returns a copy of the current state.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.state().clone()
    }

    /// Returns the cached user.
    #[inline]
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state().user.clone()
    }

    /// Returns whether the last session check succeeded.
    #[inline]
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated
    }

    /// Returns the backend.
    #[inline]
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Tears the store down, returning its backend and storage.
    #[inline]
    #[must_use]
    pub fn into_parts(self) -> (B, S) {
        (self.backend, self.storage)
    }

    /// Locks the state, recovering from poisoning.
    fn state(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes the user and flag to storage.
    async fn persist(&self) -> Result<()> {
        let _writing = self.persisting.lock().await;
        let snapshot = {
            let state = self.state();
            AuthSnapshot {
                user: state.user.clone(),
                is_authenticated: state.is_authenticated,
            }
        };
        save_snapshot(&self.storage, AUTH_STORE_KEY, &snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use crate::models::UserId;
    use crate::storage::InMemoryStorage;
    use std::sync::Arc;

    fn jane() -> User {
        User {
            id: UserId::from("u1"),
            email: "jane@example.com".to_owned(),
            name: "Jane".to_owned(),
            avatar: None,
        }
    }

    #[tokio::test]
    async fn first_check_calls_backend_and_caches_user() {
        let backend = MockBackend::signed_in(jane());
        let auth = AuthStore::new(backend.clone(), InMemoryStorage::new());

        assert!(auth.authenticate().await.unwrap());
        assert_eq!(backend.calls(), 1);
        assert_eq!(auth.user(), Some(jane()));
        assert!(auth.is_authenticated());
        assert!(!auth.snapshot().is_loading);
    }

    #[tokio::test]
    async fn second_check_is_served_from_cache() {
        let backend = MockBackend::signed_in(jane());
        let auth = AuthStore::new(backend.clone(), InMemoryStorage::new());

        assert!(auth.authenticate().await.unwrap());
        let calls = backend.calls();
        assert!(auth.authenticate().await.unwrap());
        assert_eq!(backend.calls(), calls);
    }

    #[tokio::test]
    async fn failure_clears_user_and_records_error() {
        let backend = MockBackend::new();
        let auth = AuthStore::new(backend.clone(), InMemoryStorage::new());

        assert!(!auth.authenticate().await.unwrap());
        let state = auth.snapshot();
        assert!(state.user.is_none());
        assert!(!state.is_authenticated);
        assert_eq!(state.error.as_deref(), Some("Failed to authenticate"));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn logout_is_local_only() {
        let backend = MockBackend::signed_in(jane());
        let auth = AuthStore::new(backend.clone(), InMemoryStorage::new());
        assert!(auth.authenticate().await.unwrap());
        let calls = backend.calls();

        auth.set_error(Some("stale".to_owned()));
        auth.logout().await.unwrap();
        assert_eq!(auth.snapshot(), AuthState::default());
        assert_eq!(backend.calls(), calls);
    }

    #[tokio::test]
    async fn only_user_and_flag_are_persisted() {
        let storage = Arc::new(InMemoryStorage::new());
        let backend = MockBackend::signed_in(jane());
        let auth = AuthStore::new(backend.clone(), Arc::clone(&storage));
        assert!(auth.authenticate().await.unwrap());
        auth.set_error(Some("transient".to_owned()));

        let raw = storage.get_item(AUTH_STORE_KEY).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["state"]["isAuthenticated"], true);
        assert_eq!(value["state"]["user"]["email"], "jane@example.com");
        assert!(value["state"].get("error").is_none());
        assert!(value["state"].get("isLoading").is_none());

        let restored = AuthStore::rehydrate(backend.clone(), storage).await.unwrap();
        assert_eq!(restored.user(), Some(jane()));
        assert!(restored.snapshot().error.is_none());
        let calls = backend.calls();
        assert!(restored.authenticate().await.unwrap());
        assert_eq!(backend.calls(), calls);
    }
}
