//! Client-side cache of accounts, categories and transactions.
//!
//! [`FinanceStore`] is the single local writer of these collections. Every
//! mutation goes to the backend first and is merged into local state only
//! after it succeeds, so a rejected call never leaves local state changed.
//! Guards (validation, existence, references) run against the local cache
//! before any network call.
//!
//! After every state change the collections are persisted under
//! [`FINANCE_STORE_KEY`] so that [`FinanceStore::rehydrate`] can restore
//! them on the next start.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::error::{EntityKind, FinanceError, Result};
use crate::models::{
    Account, AccountId, Category, CategoryId, CreateAccount, CreateCategory, CreateTransaction,
    DeleteAccount, DeleteCategory, DeleteTransaction, Transaction, TransactionId, UpdateAccount,
    UpdateCategory, UpdateTransaction, Validate as _,
};
use crate::storage::{FINANCE_STORE_KEY, Storage, load_snapshot, save_snapshot};

/// The persisted part of the finance store.
///
/// Missing collections decode as empty, so a partial snapshot is overlaid
/// on fresh defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinanceSnapshot {
    /// Cached accounts in backend order.
    pub accounts: Vec<Account>,
    /// Cached categories in backend order.
    pub categories: Vec<Category>,
    /// Cached transactions in backend order.
    pub transactions: Vec<Transaction>,
}

/// Generates the uniform per-collection operations: fetch, lookup, list,
/// add and update.
macro_rules! collection_ops {
    (
        $field:ident: $entity:ty,
        id: $id:ty,
        kind: $kind:expr,
        fetch: $fetch:ident => $list:ident,
        get: $get:ident,
        add: $add:ident($create:ty) => $backend_create:ident,
        update: $update:ident($update_dto:ty) => $backend_update:ident $(,)?
    ) => {
        #[doc = concat!(
            "Replaces the local ", stringify!($field), " with the backend's full list.\n\n",
            "# Errors\n\nReturns the backend error unchanged (local state is untouched), ",
            "or a storage error if persisting fails."
        )]
        #[inline]
        #[tracing::instrument(skip_all)]
        pub async fn $fetch(&self) -> Result<()> {
            let items = self.backend.$list().await?;
            tracing::debug!(collection = stringify!($field), count = items.len(), "fetched");
            self.state().$field = items;
            self.persist().await
        }

        #[doc = concat!("Returns a snapshot of the cached ", stringify!($field), ".")]
        #[inline]
        #[must_use]
        pub fn $field(&self) -> Vec<$entity> {
            self.state().$field.clone()
        }

        #[doc = concat!("Looks up one of the cached ", stringify!($field), " by id.")]
        #[inline]
        #[must_use]
        pub fn $get(&self, id: &$id) -> Option<$entity> {
            self.state().$field.iter().find(|item| item.id == *id).cloned()
        }

        #[doc = concat!(
            "Creates a record on the backend and appends the returned record ",
            "(with its assigned id) to the local ", stringify!($field), ".\n\n",
            "# Errors\n\nReturns [`FinanceError::Validation`] before any network call if the DTO ",
            "violates its schema, or the backend error unchanged."
        )]
        #[inline]
        #[tracing::instrument(skip_all)]
        pub async fn $add(&self, create: &$create) -> Result<$entity> {
            create.validate()?;
            let created = self.backend.$backend_create(create).await?;
            tracing::debug!(id = %created.id, "created");
            self.state().$field.push(created.clone());
            self.persist().await?;
            Ok(created)
        }

        #[doc = concat!(
            "Applies a partial update on the backend and replaces the local record in place.\n\n",
            "# Errors\n\nReturns [`FinanceError::Validation`] or [`FinanceError::NotFound`] before any ",
            "network call, or the backend error unchanged."
        )]
        #[inline]
        #[tracing::instrument(skip_all, fields(id = %id))]
        pub async fn $update(&self, id: &$id, update: &$update_dto) -> Result<$entity> {
            update.validate()?;
            if self.$get(id).is_none() {
                return Err(FinanceError::NotFound {
                    entity: $kind,
                    id: id.to_string(),
                });
            }
            let updated = self.backend.$backend_update(id, update).await?;
            {
                let mut state = self.state();
                if let Some(slot) = state.$field.iter_mut().find(|item| item.id == *id) {
                    *slot = updated.clone();
                }
            }
            tracing::debug!("updated");
            self.persist().await?;
            Ok(updated)
        }
    };
}

/// In-memory cache of finance data, backed by a [`Backend`] and persisted
/// to a [`Storage`].
///
/// All operations take `&self`; the cache is guarded by a mutex that is
/// never held across an `.await`. Concurrent mutations are applied in
/// completion order, and writes to storage are serialized so the last
/// one always carries the latest state.
#[derive(Debug)]
pub struct FinanceStore<B, S> {
    /// Remote API.
    backend: B,
    /// Snapshot persistence.
    storage: S,
    /// Cached collections.
    state: Mutex<FinanceSnapshot>,
    /// Held for the whole of a snapshot write.
    persisting: tokio::sync::Mutex<()>,
}

impl<B: Backend, S: Storage> FinanceStore<B, S> {
    /// Creates an empty store. Nothing is read from storage.
    #[inline]
    #[must_use]
    pub fn new(backend: B, storage: S) -> Self {
        Self::with_snapshot(backend, storage, FinanceSnapshot::default())
    }

    /// Creates a store pre-filled with `snapshot`.
    #[inline]
    #[must_use]
    pub fn with_snapshot(backend: B, storage: S, snapshot: FinanceSnapshot) -> Self {
        Self {
            backend,
            storage,
            state: Mutex::new(snapshot),
            persisting: tokio::sync::Mutex::new(()),
        }
    }

    /// Creates a store from the persisted snapshot, if any.
    ///
    /// Persisted collections are served as the current truth until the
    /// next fetch replaces them. An absent, unreadable or outdated snapshot
    /// yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to read.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub async fn rehydrate(backend: B, storage: S) -> Result<Self> {
        let snapshot: FinanceSnapshot = load_snapshot(&storage, FINANCE_STORE_KEY)
            .await?
            .unwrap_or_default();
        tracing::debug!(
            accounts = snapshot.accounts.len(),
            categories = snapshot.categories.len(),
            transactions = snapshot.transactions.len(),
            "rehydrated finance store"
        );
        Ok(Self::with_snapshot(backend, storage, snapshot))
    }

    /// Fetches accounts, categories and transactions, replacing all three
    /// local collections.
    ///
    /// # Errors
    ///
    /// Returns the first failing fetch's error. Collections fetched before
    /// the failure keep their new contents.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub async fn initialize(&self) -> Result<()> {
        self.fetch_accounts().await?;
        self.fetch_categories().await?;
        self.fetch_transactions().await
    }

    /// Clears all cached data and the persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to remove the snapshot.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub async fn reset(&self) -> Result<()> {
        let _writing = self.persisting.lock().await;
        *self.state() = FinanceSnapshot::default();
        self.storage.remove_item(FINANCE_STORE_KEY).await
    }

    /// Returns a copy of all cached collections.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> FinanceSnapshot {
        self.state().clone()
    }

    /// Returns the backend, e.g. for subscription calls that bypass the
    /// cache.
    #[inline]
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the storage backend.
    #[inline]
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Tears the store down, returning its backend and storage.
    #[inline]
    #[must_use]
    pub fn into_parts(self) -> (B, S) {
        (self.backend, self.storage)
    }

    collection_ops! {
        accounts: Account,
        id: AccountId,
        kind: EntityKind::Account,
        fetch: fetch_accounts => list_accounts,
        get: account_by_id,
        add: add_account(CreateAccount) => create_account,
        update: update_account(UpdateAccount) => update_account,
    }

    collection_ops! {
        categories: Category,
        id: CategoryId,
        kind: EntityKind::Category,
        fetch: fetch_categories => list_categories,
        get: category_by_id,
        add: add_category(CreateCategory) => create_category,
        update: update_category(UpdateCategory) => update_category,
    }

    collection_ops! {
        transactions: Transaction,
        id: TransactionId,
        kind: EntityKind::Transaction,
        fetch: fetch_transactions => list_transactions,
        get: transaction_by_id,
        add: add_transaction(CreateTransaction) => create_transaction,
        update: update_transaction(UpdateTransaction) => update_transaction,
    }

    /// Deletes an account that no transaction references.
    ///
    /// # Errors
    ///
    /// Returns [`FinanceError::NotFound`] or [`FinanceError::InUse`] before
    /// any network call, or the backend error unchanged.
    #[inline]
    #[tracing::instrument(skip_all, fields(id = %delete.id))]
    pub async fn delete_account(&self, delete: &DeleteAccount) -> Result<()> {
        let references = {
            let state = self.state();
            if !state.accounts.iter().any(|account| account.id == delete.id) {
                return Err(FinanceError::NotFound {
                    entity: EntityKind::Account,
                    id: delete.id.to_string(),
                });
            }
            state
                .transactions
                .iter()
                .filter(|transaction| transaction.account_id == delete.id)
                .count()
        };
        if references > 0 {
            return Err(FinanceError::InUse {
                entity: EntityKind::Account,
                id: delete.id.to_string(),
                references,
            });
        }
        self.backend.delete_account(&delete.id).await?;
        self.state().accounts.retain(|account| account.id != delete.id);
        tracing::debug!("deleted account");
        self.persist().await
    }

    /// Deletes a category that no transaction references.
    ///
    /// # Errors
    ///
    /// Returns [`FinanceError::NotFound`] or [`FinanceError::InUse`] before
    /// any network call, or the backend error unchanged.
    #[inline]
    #[tracing::instrument(skip_all, fields(id = %delete.id))]
    pub async fn delete_category(&self, delete: &DeleteCategory) -> Result<()> {
        let references = {
            let state = self.state();
            if !state.categories.iter().any(|category| category.id == delete.id) {
                return Err(FinanceError::NotFound {
                    entity: EntityKind::Category,
                    id: delete.id.to_string(),
                });
            }
            state
                .transactions
                .iter()
                .filter(|transaction| transaction.category_id == delete.id)
                .count()
        };
        if references > 0 {
            return Err(FinanceError::InUse {
                entity: EntityKind::Category,
                id: delete.id.to_string(),
                references,
            });
        }
        self.backend.delete_category(&delete.id).await?;
        self.state().categories.retain(|category| category.id != delete.id);
        tracing::debug!("deleted category");
        self.persist().await
    }

    /// Deletes a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`FinanceError::NotFound`] before any network call, or the
    /// backend error unchanged.
    #[inline]
    #[tracing::instrument(skip_all, fields(id = %delete.id))]
    pub async fn delete_transaction(&self, delete: &DeleteTransaction) -> Result<()> {
        if self.transaction_by_id(&delete.id).is_none() {
            return Err(FinanceError::NotFound {
                entity: EntityKind::Transaction,
                id: delete.id.to_string(),
            });
        }
        self.backend.delete_transaction(&delete.id).await?;
        self.state()
            .transactions
            .retain(|transaction| transaction.id != delete.id);
        tracing::debug!("deleted transaction");
        self.persist().await
    }

    /// Locks the cache. A poisoned lock still holds the last committed
    /// state, so it is recovered rather than propagated.
    fn state(&self) -> MutexGuard<'_, FinanceSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes the current collections to storage. The snapshot is taken
    /// after the write lock is acquired, so a slow earlier write can never
    /// land after a newer one.
    async fn persist(&self) -> Result<()> {
        let _writing = self.persisting.lock().await;
        let snapshot = self.snapshot();
        save_snapshot(&self.storage, FINANCE_STORE_KEY, &snapshot).await
    }
}
