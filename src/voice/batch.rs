//! Suggested batches: parsing, preview and commit.
//!
//! A transaction in a batch may reference an account or category by id, or
//! by a `"<Name>:ID"` placeholder naming an entity the same batch creates.
//! Placeholders are resolved by case-insensitive name at commit time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::Backend;
use crate::error::{FinanceError, Result};
use crate::models::{
    Account, AccountId, AccountType, Category, CategoryId, CreateAccount, CreateCategory,
    CreateTransaction, Field, FieldKind, PaymentMethod, Schema, Transaction, TransactionType,
    Validate, ValidationErrors, ViolationKind,
};
use crate::storage::Storage;
use crate::store::{FinanceSnapshot, FinanceStore};

use super::prompt::PLACEHOLDER_SUFFIX;

/// Display name used when a reference matches nothing.
const UNKNOWN: &str = "Unknown";

/// A new account proposed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedAccount {
    /// Display name.
    pub name: String,
    /// Account kind; [`AccountType::Checking`] when omitted.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AccountType>,
    /// Display color.
    pub color: String,
}

impl SuggestedAccount {
    /// The create DTO committed for this suggestion.
    #[inline]
    #[must_use]
    pub fn to_create(&self) -> CreateAccount {
        CreateAccount {
            name: self.name.clone(),
            kind: self.kind.unwrap_or(AccountType::Checking),
            color: self.color.clone(),
        }
    }
}

impl Validate for SuggestedAccount {
    #[inline]
    fn validate(&self) -> core::result::Result<(), ValidationErrors> {
        Ok(())
    }
}

impl Schema for SuggestedAccount {
    const FIELDS: &'static [Field] = &[
        Field::required("name", FieldKind::String),
        Field::optional("type", FieldKind::Enum(AccountType::NAMES)),
        Field::required("color", FieldKind::String),
    ];
}

/// What to do with a placeholder that matches no account or category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaceholderPolicy {
    /// Fail the commit before any network call.
    #[default]
    Reject,
    /// Use the placeholder text itself as the id, leaving a dangling
    /// reference.
    KeepRaw,
}

/// A suggested transaction with its references rendered as names.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionPreview {
    /// Transaction name.
    pub name: String,
    /// Unsigned amount.
    pub amount: f64,
    /// Income or expense.
    pub kind: TransactionType,
    /// Resolved category name, or `"Unknown"`.
    pub category_name: String,
    /// Resolved account name, or `"Unknown"`.
    pub account_name: String,
    /// Payment method.
    pub payment_method: PaymentMethod,
    /// Free-form details.
    pub details: Option<String>,
    /// Transaction date.
    pub date: String,
}

/// Everything a commit created, in creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitSummary {
    /// Accounts created.
    pub accounts: Vec<Account>,
    /// Categories created.
    pub categories: Vec<Category>,
    /// Transactions created, with placeholders resolved.
    pub transactions: Vec<Transaction>,
}

/// Transactions, accounts and categories proposed from one transcript.
///
/// Nothing is written until [`SuggestedBatch::commit`]; dropping the batch
/// discards it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestedBatch {
    /// New transactions. Ids may be placeholders.
    pub transactions: Vec<CreateTransaction>,
    /// New accounts.
    pub accounts: Vec<SuggestedAccount>,
    /// New categories.
    pub categories: Vec<CreateCategory>,
}

/// Returns the entity name inside a `"<Name>:ID"` placeholder, or `None`
/// if `reference` is a plain id.
///
/// ```
/// use finance_ai::voice::placeholder_name;
///
/// assert_eq!(placeholder_name("<Cash>:ID").as_deref(), Some("Cash"));
/// assert_eq!(placeholder_name("Bank Account:ID").as_deref(), Some("Bank Account"));
/// assert_eq!(placeholder_name("a1"), None);
/// ```
#[inline]
#[must_use]
pub fn placeholder_name(reference: &str) -> Option<String> {
    let raw = reference.trim().strip_suffix(PLACEHOLDER_SUFFIX)?;
    let name: String = raw.chars().filter(|ch| !matches!(*ch, '<' | '>')).collect();
    let trimmed = name.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Case-insensitive name comparison.
fn same_name(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

/// Display name of an account.
fn name_of_account(account: &Account) -> &str {
    account.name.as_str()
}

/// Display name of a category.
fn name_of_category(category: &Category) -> &str {
    category.name.as_str()
}

/// Finds the item whose name matches `name`, ignoring case.
fn named<'list, T, F: Fn(&T) -> &str>(items: &'list [T], name: &str, name_of: F) -> Option<&'list T> {
    items.iter().find(|item| same_name(name_of(item), name))
}

/// Decodes a top-level array of `T`, recording violations under `key`.
fn parse_items<T: Schema>(value: Option<&Value>, key: &str, errors: &mut ValidationErrors) -> Vec<T> {
    let Some(raw) = value.filter(|raw| !raw.is_null()) else {
        return Vec::new();
    };
    let Some(items) = raw.as_array() else {
        errors.push(key, ViolationKind::TypeMismatch { expected: "array" });
        return Vec::new();
    };
    let mut parsed = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match T::parse(item) {
            Ok(entity) => parsed.push(entity),
            Err(violations) => errors.extend(violations.nested(&format!("{key}.{index}"))),
        }
    }
    parsed
}

/// Validates every item, prefixing field names with `key.index`.
fn validate_items<T: Validate>(items: &[T], key: &str, errors: &mut ValidationErrors) {
    for (index, item) in items.iter().enumerate() {
        if let Err(violations) = item.validate() {
            errors.extend(violations.nested(&format!("{key}.{index}")));
        }
    }
}

impl Validate for SuggestedBatch {
    #[inline]
    fn validate(&self) -> core::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        validate_items(&self.transactions, "transactions", &mut errors);
        validate_items(&self.accounts, "accounts", &mut errors);
        validate_items(&self.categories, "categories", &mut errors);
        errors.into_result()
    }
}

impl SuggestedBatch {
    /// Parses a provider reply.
    ///
    /// Missing or `null` arrays are treated as empty.
    ///
    /// # Errors
    ///
    /// Returns [`FinanceError::Interpretation`] if `raw` is not a JSON
    /// object or any item violates its schema.
    #[inline]
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw.trim())
            .map_err(|err| FinanceError::Interpretation(format!("reply is not JSON: {err}")))?;
        Self::from_value(&value)
    }

    /// Parses an already-decoded provider reply.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_json`].
    #[inline]
    pub fn from_value(value: &Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(FinanceError::Interpretation(
                "reply is not a JSON object".to_owned(),
            ));
        };
        let mut errors = ValidationErrors::default();
        let batch = Self {
            transactions: parse_items(object.get("transactions"), "transactions", &mut errors),
            accounts: parse_items(object.get("accounts"), "accounts", &mut errors),
            categories: parse_items(object.get("categories"), "categories", &mut errors),
        };
        if errors.is_empty() {
            Ok(batch)
        } else {
            Err(FinanceError::Interpretation(format!("malformed batch: {errors}")))
        }
    }

    /// Returns `true` if the batch proposes nothing.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty() && self.accounts.is_empty() && self.categories.is_empty()
    }

    /// Renders each transaction with display names for its references.
    ///
    /// A placeholder shows the matching batch entity's name (or an
    /// existing one of the same name); a plain id shows the cached
    /// entity's name. Anything else shows `"Unknown"`.
    #[inline]
    #[must_use]
    pub fn preview(&self, snapshot: &FinanceSnapshot) -> Vec<TransactionPreview> {
        self.transactions
            .iter()
            .map(|transaction| TransactionPreview {
                name: transaction.name.clone(),
                amount: transaction.amount,
                kind: transaction.kind,
                category_name: self.category_name(&transaction.category_id, snapshot),
                account_name: self.account_name(&transaction.account_id, snapshot),
                payment_method: transaction.payment_method,
                details: transaction.details.clone(),
                date: transaction.date.clone(),
            })
            .collect()
    }

    /// Display name for a category reference.
    fn category_name(&self, reference: &CategoryId, snapshot: &FinanceSnapshot) -> String {
        let name = match placeholder_name(reference.as_inner()) {
            Some(wanted) => named(&self.categories, &wanted, |category| category.name.as_str())
                .map(|category| category.name.clone())
                .or_else(|| {
                    named(&snapshot.categories, &wanted, name_of_category)
                        .map(|category| category.name.clone())
                }),
            None => snapshot
                .categories
                .iter()
                .find(|category| category.id == *reference)
                .map(|category| category.name.clone()),
        };
        name.unwrap_or_else(|| UNKNOWN.to_owned())
    }

    /// Display name for an account reference.
    fn account_name(&self, reference: &AccountId, snapshot: &FinanceSnapshot) -> String {
        let name = match placeholder_name(reference.as_inner()) {
            Some(wanted) => named(&self.accounts, &wanted, |account| account.name.as_str())
                .map(|account| account.name.clone())
                .or_else(|| {
                    named(&snapshot.accounts, &wanted, name_of_account)
                        .map(|account| account.name.clone())
                }),
            None => snapshot
                .accounts
                .iter()
                .find(|account| account.id == *reference)
                .map(|account| account.name.clone()),
        };
        name.unwrap_or_else(|| UNKNOWN.to_owned())
    }

    /// Returns the placeholders that would match nothing after the batch's
    /// own accounts and categories are created.
    #[inline]
    #[must_use]
    pub fn unresolved(&self, snapshot: &FinanceSnapshot) -> Vec<String> {
        let mut missing = Vec::new();
        for transaction in &self.transactions {
            let account = transaction.account_id.as_inner();
            if let Some(wanted) = placeholder_name(account) {
                let known = self.accounts.iter().any(|item| same_name(&item.name, &wanted))
                    || snapshot.accounts.iter().any(|item| same_name(&item.name, &wanted));
                if !known {
                    missing.push(account.to_owned());
                }
            }
            let category = transaction.category_id.as_inner();
            if let Some(wanted) = placeholder_name(category) {
                let known = self.categories.iter().any(|item| same_name(&item.name, &wanted))
                    || snapshot.categories.iter().any(|item| same_name(&item.name, &wanted));
                if !known {
                    missing.push(category.to_owned());
                }
            }
        }
        missing
    }

    /// Creates the batch through `store`: accounts first, then categories,
    /// then transactions with placeholders resolved.
    ///
    /// Placeholders resolve to a just-created entity of the same name,
    /// otherwise to an existing one. The whole batch is validated, and
    /// under [`PlaceholderPolicy::Reject`] every placeholder is checked,
    /// before the first backend call. A backend failure stops the commit;
    /// entities created before it are kept.
    ///
    /// # Errors
    ///
    /// Returns [`FinanceError::Validation`] or
    /// [`FinanceError::UnresolvedReference`] before any network call, or
    /// the first store error.
    #[inline]
    #[tracing::instrument(skip_all, fields(
        transactions = self.transactions.len(),
        accounts = self.accounts.len(),
        categories = self.categories.len(),
    ))]
    pub async fn commit<B: Backend, S: Storage>(
        &self,
        store: &FinanceStore<B, S>,
        policy: PlaceholderPolicy,
    ) -> Result<CommitSummary> {
        self.validate()?;
        if policy == PlaceholderPolicy::Reject
            && let Some(first) = self.unresolved(&store.snapshot()).into_iter().next()
        {
            return Err(FinanceError::UnresolvedReference(first));
        }

        let mut summary = CommitSummary::default();
        for account in &self.accounts {
            summary.accounts.push(store.add_account(&account.to_create()).await?);
        }
        for category in &self.categories {
            summary.categories.push(store.add_category(category).await?);
        }

        let existing = store.snapshot();
        for transaction in &self.transactions {
            let create = CreateTransaction {
                account_id: resolve_account(
                    &transaction.account_id,
                    &summary.accounts,
                    &existing.accounts,
                    policy,
                )?,
                category_id: resolve_category(
                    &transaction.category_id,
                    &summary.categories,
                    &existing.categories,
                    policy,
                )?,
                ..transaction.clone()
            };
            summary.transactions.push(store.add_transaction(&create).await?);
        }
        tracing::debug!("committed suggested batch");
        Ok(summary)
    }
}

/// Resolves an account reference against created then existing accounts.
fn resolve_account(
    reference: &AccountId,
    created: &[Account],
    existing: &[Account],
    policy: PlaceholderPolicy,
) -> Result<AccountId> {
    let Some(wanted) = placeholder_name(reference.as_inner()) else {
        return Ok(reference.clone());
    };
    match named(created, &wanted, name_of_account)
        .or_else(|| named(existing, &wanted, name_of_account))
    {
        Some(account) => Ok(account.id.clone()),
        None => keep_raw(reference.as_inner(), policy).map(|()| reference.clone()),
    }
}

/// Resolves a category reference against created then existing categories.
fn resolve_category(
    reference: &CategoryId,
    created: &[Category],
    existing: &[Category],
    policy: PlaceholderPolicy,
) -> Result<CategoryId> {
    let Some(wanted) = placeholder_name(reference.as_inner()) else {
        return Ok(reference.clone());
    };
    match named(created, &wanted, name_of_category)
        .or_else(|| named(existing, &wanted, name_of_category))
    {
        Some(category) => Ok(category.id.clone()),
        None => keep_raw(reference.as_inner(), policy).map(|()| reference.clone()),
    }
}

/// Applies `policy` to a placeholder that matched nothing.
fn keep_raw(reference: &str, policy: PlaceholderPolicy) -> Result<()> {
    match policy {
        PlaceholderPolicy::Reject => Err(FinanceError::UnresolvedReference(reference.to_owned())),
        PlaceholderPolicy::KeepRaw => {
            tracing::warn!(reference, "keeping unresolved placeholder as id");
            Ok(())
        }
    }
}
