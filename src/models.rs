//! Domain schemas for finance entities.
//!
//! Every entity comes with a create DTO (the entity minus its id), an
//! update DTO (every field optional) and a delete DTO (`{id}` only). All
//! of them implement [`Schema`] for field-by-field validation of raw JSON
//! and [`Validate`] for semantic checks on typed values.

mod account;
mod category;
mod enums;
mod ids;
mod schema;
mod subscription;
mod transaction;
mod user;

pub use account::{Account, CreateAccount, DeleteAccount, UpdateAccount};
pub use category::{Category, CreateCategory, DeleteCategory, UpdateCategory};
pub use enums::{AccountType, CategoryType, PaymentMethod, TransactionType};
pub use ids::{AccountId, CategoryId, SubscriptionId, TransactionId, UserId};
pub use schema::{
    Field, FieldKind, Schema, Validate, ValidationErrors, Violation, ViolationKind, check_fields,
    is_valid_email, parse_iso_date,
};
pub use subscription::{CreateSubscription, DeleteSubscription, Subscription, UpdateSubscription};
pub use transaction::{CreateTransaction, DeleteTransaction, Transaction, UpdateTransaction};
pub use user::User;
