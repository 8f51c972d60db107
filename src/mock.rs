//! In-memory [`Backend`] used by unit tests.
//!
//! Assigns sequential ids per resource (`a1`, `c1`, `t1`, `s1`, ...) and
//! counts every call so tests can prove that guards run before the
//! network.

use core::future::{self, Future};
use std::sync::{Arc, Mutex, PoisonError};

use crate::backend::Backend;
use crate::error::{FinanceError, Result};
use crate::models::{
    Account, AccountId, Category, CategoryId, CreateAccount, CreateCategory, CreateSubscription,
    CreateTransaction, Subscription, SubscriptionId, Transaction, TransactionId, UpdateAccount,
    UpdateCategory, UpdateSubscription, UpdateTransaction, User,
};

/// Mutable state shared by every clone of a [`MockBackend`].
#[derive(Debug, Default)]
struct MockState {
    /// Server-side accounts.
    accounts: Vec<Account>,
    /// Server-side categories.
    categories: Vec<Category>,
    /// Server-side transactions.
    transactions: Vec<Transaction>,
    /// Server-side subscriptions.
    subscriptions: Vec<Subscription>,
    /// User returned by `current_user`.
    user: Option<User>,
    /// Whether a session credential is configured.
    session: bool,
    /// When set, every call fails with HTTP 500.
    failing: bool,
    /// Number of backend calls made.
    calls: usize,
    /// Last id counter per resource prefix.
    counters: [u32; 4],
}

/// Cloneable handle to an in-memory backend.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockBackend {
    /// Shared state.
    state: Arc<Mutex<MockState>>,
}

/// Resource slot in [`MockState::counters`] with its id prefix.
#[derive(Debug, Clone, Copy)]
enum Resource {
    /// `a<n>` ids.
    Account,
    /// `c<n>` ids.
    Category,
    /// `t<n>` ids.
    Transaction,
    /// `s<n>` ids.
    Subscription,
}

impl MockBackend {
    /// Creates an empty backend with no session.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Creates a backend with a session that resolves to `user`.
    pub(crate) fn signed_in(user: User) -> Self {
        let backend = Self::new();
        backend.update(|state| {
            state.user = Some(user);
            state.session = true;
        });
        backend
    }

    /// Number of backend calls made so far.
    pub(crate) fn calls(&self) -> usize {
        self.update(|state| state.calls)
    }

    /// Makes every subsequent call fail (or succeed again).
    pub(crate) fn set_failing(&self, failing: bool) {
        self.update(|state| state.failing = failing);
    }

    /// Replaces the server-side collections without counting a call.
    pub(crate) fn seed(
        &self,
        accounts: Vec<Account>,
        categories: Vec<Category>,
        transactions: Vec<Transaction>,
    ) {
        self.update(|state| {
            state.accounts = accounts;
            state.categories = categories;
            state.transactions = transactions;
        });
    }

    /// Server-side accounts, for assertions.
    pub(crate) fn server_accounts(&self) -> Vec<Account> {
        self.update(|state| state.accounts.clone())
    }

    /// Server-side categories, for assertions.
    pub(crate) fn server_categories(&self) -> Vec<Category> {
        self.update(|state| state.categories.clone())
    }

    /// Server-side transactions, for assertions.
    pub(crate) fn server_transactions(&self) -> Vec<Transaction> {
        self.update(|state| state.transactions.clone())
    }

    /// Applies `op` to the shared state.
    fn update<R, F: FnOnce(&mut MockState) -> R>(&self, op: F) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        op(&mut state)
    }

    /// Counts a call, fails if requested, otherwise applies `op`.
    fn call<R: Send, F: FnOnce(&mut MockState) -> Result<R>>(
        &self,
        op: F,
    ) -> impl Future<Output = Result<R>> + Send {
        let result = self.update(|state| {
            state.calls += 1;
            if state.failing {
                return Err(FinanceError::Api {
                    status: 500,
                    message: "backend unavailable".to_owned(),
                });
            }
            op(state)
        });
        future::ready(result)
    }
}

impl MockState {
    /// Returns the next id for `resource`.
    fn next_id(&mut self, resource: Resource) -> String {
        let (slot, prefix) = match resource {
            Resource::Account => (0, 'a'),
            Resource::Category => (1, 'c'),
            Resource::Transaction => (2, 't'),
            Resource::Subscription => (3, 's'),
        };
        let counter = &mut self.counters[slot];
        *counter += 1;
        format!("{prefix}{counter}")
    }
}

/// The error a real backend would return for an unknown id.
fn not_found(id: &str) -> FinanceError {
    FinanceError::Api {
        status: 404,
        message: format!("{id} not found"),
    }
}

/// Replaces the item matching `matches` with `patch(item)` and returns it.
fn patch_where<T: Clone, P: Fn(&T) -> bool, F: FnOnce(&T) -> T>(
    items: &mut [T],
    id: &str,
    matches: P,
    patch: F,
) -> Result<T> {
    let slot = items
        .iter_mut()
        .find(|item| matches(&**item))
        .ok_or_else(|| not_found(id))?;
    *slot = patch(&*slot);
    Ok(slot.clone())
}

/// Removes the item matching `matches`.
fn remove_where<T, P: Fn(&T) -> bool>(items: &mut Vec<T>, id: &str, matches: P) -> Result<()> {
    let before = items.len();
    items.retain(|item| !matches(item));
    if items.len() == before {
        Err(not_found(id))
    } else {
        Ok(())
    }
}

impl Backend for MockBackend {
    fn list_accounts(&self) -> impl Future<Output = Result<Vec<Account>>> + Send {
        self.call(|state| Ok(state.accounts.clone()))
    }

    fn create_account(&self, create: &CreateAccount) -> impl Future<Output = Result<Account>> + Send {
        let create = create.clone();
        self.call(move |state| {
            let id = AccountId::new(state.next_id(Resource::Account));
            let account = Account::from_create(id, create);
            state.accounts.push(account.clone());
            Ok(account)
        })
    }

    fn update_account(
        &self,
        id: &AccountId,
        update: &UpdateAccount,
    ) -> impl Future<Output = Result<Account>> + Send {
        let (id, update) = (id.clone(), update.clone());
        self.call(move |state| {
            patch_where(&mut state.accounts, id.as_inner(), |item| item.id == id, |item| {
                item.patched(&update)
            })
        })
    }

    fn delete_account(&self, id: &AccountId) -> impl Future<Output = Result<()>> + Send {
        let id = id.clone();
        self.call(move |state| remove_where(&mut state.accounts, id.as_inner(), |item| item.id == id))
    }

    fn list_categories(&self) -> impl Future<Output = Result<Vec<Category>>> + Send {
        self.call(|state| Ok(state.categories.clone()))
    }

    fn create_category(
        &self,
        create: &CreateCategory,
    ) -> impl Future<Output = Result<Category>> + Send {
        let create = create.clone();
        self.call(move |state| {
            let id = CategoryId::new(state.next_id(Resource::Category));
            let category = Category::from_create(id, create);
            state.categories.push(category.clone());
            Ok(category)
        })
    }

    fn update_category(
        &self,
        id: &CategoryId,
        update: &UpdateCategory,
    ) -> impl Future<Output = Result<Category>> + Send {
        let (id, update) = (id.clone(), update.clone());
        self.call(move |state| {
            patch_where(&mut state.categories, id.as_inner(), |item| item.id == id, |item| {
                item.patched(&update)
            })
        })
    }

    fn delete_category(&self, id: &CategoryId) -> impl Future<Output = Result<()>> + Send {
        let id = id.clone();
        self.call(move |state| {
            remove_where(&mut state.categories, id.as_inner(), |item| item.id == id)
        })
    }

    fn list_transactions(&self) -> impl Future<Output = Result<Vec<Transaction>>> + Send {
        self.call(|state| Ok(state.transactions.clone()))
    }

    fn create_transaction(
        &self,
        create: &CreateTransaction,
    ) -> impl Future<Output = Result<Transaction>> + Send {
        let create = create.clone();
        self.call(move |state| {
            let id = TransactionId::new(state.next_id(Resource::Transaction));
            let transaction = Transaction::from_create(id, create);
            state.transactions.push(transaction.clone());
            Ok(transaction)
        })
    }

    fn update_transaction(
        &self,
        id: &TransactionId,
        update: &UpdateTransaction,
    ) -> impl Future<Output = Result<Transaction>> + Send {
        let (id, update) = (id.clone(), update.clone());
        self.call(move |state| {
            patch_where(&mut state.transactions, id.as_inner(), |item| item.id == id, |item| {
                item.patched(&update)
            })
        })
    }

    fn delete_transaction(&self, id: &TransactionId) -> impl Future<Output = Result<()>> + Send {
        let id = id.clone();
        self.call(move |state| {
            remove_where(&mut state.transactions, id.as_inner(), |item| item.id == id)
        })
    }

    fn list_subscriptions(&self) -> impl Future<Output = Result<Vec<Subscription>>> + Send {
        self.call(|state| Ok(state.subscriptions.clone()))
    }

    fn create_subscription(
        &self,
        create: &CreateSubscription,
    ) -> impl Future<Output = Result<Subscription>> + Send {
        let create = create.clone();
        self.call(move |state| {
            let id = SubscriptionId::new(state.next_id(Resource::Subscription));
            let subscription = Subscription::from_create(id, create);
            state.subscriptions.push(subscription.clone());
            Ok(subscription)
        })
    }

    fn update_subscription(
        &self,
        id: &SubscriptionId,
        update: &UpdateSubscription,
    ) -> impl Future<Output = Result<Subscription>> + Send {
        let (id, update) = (id.clone(), update.clone());
        self.call(move |state| {
            patch_where(&mut state.subscriptions, id.as_inner(), |item| item.id == id, |item| {
                item.patched(&update)
            })
        })
    }

    fn delete_subscription(&self, id: &SubscriptionId) -> impl Future<Output = Result<()>> + Send {
        let id = id.clone();
        self.call(move |state| {
            remove_where(&mut state.subscriptions, id.as_inner(), |item| item.id == id)
        })
    }

    fn current_user(&self) -> impl Future<Output = Result<User>> + Send {
        self.call(|state| {
            state
                .user
                .clone()
                .filter(|_| state.session)
                .ok_or_else(|| FinanceError::Api {
                    status: 401,
                    message: "Unauthorized".to_owned(),
                })
        })
    }

    fn has_session(&self) -> bool {
        self.update(|state| state.session)
    }
}
