//! The REST surface the stores talk to.
//!
//! [`Backend`] is implemented by [`crate::client::FinanceClient`] for the
//! real HTTP API. The stores are generic over it so they can run against
//! any other implementation (tests use an in-memory one).

use crate::error::Result;
use crate::models::{
    Account, AccountId, Category, CategoryId, CreateAccount, CreateCategory, CreateSubscription,
    CreateTransaction, Subscription, SubscriptionId, Transaction, TransactionId, UpdateAccount,
    UpdateCategory, UpdateSubscription, UpdateTransaction, User,
};

/// Generates the [`Backend`] trait with a list/create/update/delete
/// quartet per resource.
///
/// Every method returns `impl Future + Send` so the trait can be used from
/// multi-threaded runtimes without boxing.
macro_rules! define_backend {
    (
        $(
            $resource:literal {
                entity: $entity:ty,
                id: $id:ty,
                create: $create_dto:ty,
                update: $update_dto:ty,
                methods: [$list:ident, $create:ident, $update:ident, $delete:ident $(,)?] $(,)?
            }
        ),+ $(,)?
    ) => {
        /// Remote CRUD operations consumed by the finance and auth stores.
        ///
        /// All methods take `&self`. A failed call must not have partially
        /// applied any change that the caller will observe as success.
        pub trait Backend: core::fmt::Debug + Send + Sync {
            $(
                #[doc = concat!(
                    "Lists every ", $resource, " (`GET /", $resource, "`).\n\n",
                    "# Errors\n\nReturns an error if the request fails or the response cannot be decoded."
                )]
                fn $list(&self) -> impl core::future::Future<Output = Result<Vec<$entity>>> + Send;

                #[doc = concat!(
                    "Creates a record (`POST /", $resource, "`) and returns the stored record with its assigned id.\n\n",
                    "# Errors\n\nReturns an error if the request fails or the response cannot be decoded."
                )]
                fn $create(
                    &self,
                    create: &$create_dto,
                ) -> impl core::future::Future<Output = Result<$entity>> + Send;

                #[doc = concat!(
                    "Applies a partial update to a record (`PUT /", $resource, "/:id`).\n\n",
                    "# Errors\n\nReturns an error if the request fails or the response cannot be decoded."
                )]
                fn $update(
                    &self,
                    id: &$id,
                    update: &$update_dto,
                ) -> impl core::future::Future<Output = Result<$entity>> + Send;

                #[doc = concat!(
                    "Deletes a record (`DELETE /", $resource, "/:id`).\n\n",
                    "# Errors\n\nReturns an error if the request fails."
                )]
                fn $delete(&self, id: &$id) -> impl core::future::Future<Output = Result<()>> + Send;
            )+

            /// Returns the signed-in user (`GET /me`).
            ///
            /// # Errors
            ///
            /// Returns an error if the request fails, the session is not
            /// valid, or the body does not match the user schema.
            fn current_user(&self) -> impl core::future::Future<Output = Result<User>> + Send;

            /// Returns `true` if a session credential is configured.
            fn has_session(&self) -> bool;
        }
    };
}

define_backend! {
    "accounts" {
        entity: Account,
        id: AccountId,
        create: CreateAccount,
        update: UpdateAccount,
        methods: [list_accounts, create_account, update_account, delete_account],
    },
    "categories" {
        entity: Category,
        id: CategoryId,
        create: CreateCategory,
        update: UpdateCategory,
        methods: [list_categories, create_category, update_category, delete_category],
    },
    "transactions" {
        entity: Transaction,
        id: TransactionId,
        create: CreateTransaction,
        update: UpdateTransaction,
        methods: [list_transactions, create_transaction, update_transaction, delete_transaction],
    },
    "subscriptions" {
        entity: Subscription,
        id: SubscriptionId,
        create: CreateSubscription,
        update: UpdateSubscription,
        methods: [
            list_subscriptions,
            create_subscription,
            update_subscription,
            delete_subscription,
        ],
    },
}
