//! Financial transaction model and its DTOs.

use serde::{Deserialize, Serialize};

use super::schema::Checks;
use super::{
    AccountId, CategoryId, Field, FieldKind, PaymentMethod, Schema, TransactionId,
    TransactionType, Validate, ValidationErrors,
};

/// A single income or expense record.
///
/// `amount` is a non-negative magnitude; whether it adds to or subtracts
/// from the balance is decided by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Backend-assigned identifier.
    pub id: TransactionId,
    /// Short description.
    pub name: String,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// ISO-8601 date or timestamp.
    pub date: String,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Non-negative magnitude.
    pub amount: f64,
    /// Category this transaction is filed under.
    pub category_id: CategoryId,
    /// Account the money moved through.
    pub account_id: AccountId,
    /// How the transaction was paid.
    pub payment_method: PaymentMethod,
}

impl Transaction {
    /// Builds a transaction from a create DTO and the id the backend assigned.
    #[inline]
    #[must_use]
    pub fn from_create(id: TransactionId, create: CreateTransaction) -> Self {
        Self {
            id,
            name: create.name,
            details: create.details,
            date: create.date,
            kind: create.kind,
            amount: create.amount,
            category_id: create.category_id,
            account_id: create.account_id,
            payment_method: create.payment_method,
        }
    }

    /// Returns a copy with every field present in `update` replaced.
    #[inline]
    #[must_use]
    pub fn patched(&self, update: &UpdateTransaction) -> Self {
        Self {
            id: self.id.clone(),
            name: update.name.clone().unwrap_or_else(|| self.name.clone()),
            details: update.details.clone().or_else(|| self.details.clone()),
            date: update.date.clone().unwrap_or_else(|| self.date.clone()),
            kind: update.kind.unwrap_or(self.kind),
            amount: update.amount.unwrap_or(self.amount),
            category_id: update
                .category_id
                .clone()
                .unwrap_or_else(|| self.category_id.clone()),
            account_id: update
                .account_id
                .clone()
                .unwrap_or_else(|| self.account_id.clone()),
            payment_method: update.payment_method.unwrap_or(self.payment_method),
        }
    }

    /// Amount with the sign implied by the transaction type.
    #[inline]
    #[must_use]
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }
}

/// Fields required to create a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransaction {
    /// Short description.
    pub name: String,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// ISO-8601 date or timestamp.
    pub date: String,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Non-negative magnitude.
    pub amount: f64,
    /// Category id, or a `"<Name>:ID"` placeholder inside a voice batch.
    pub category_id: CategoryId,
    /// Account id, or a `"<Name>:ID"` placeholder inside a voice batch.
    pub account_id: AccountId,
    /// How the transaction was paid.
    pub payment_method: PaymentMethod,
}

/// Partial transaction update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransaction {
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// New date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// New type.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    /// New amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// New category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    /// New account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    /// New payment method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
}

/// Identifies a transaction to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteTransaction {
    /// Transaction to delete.
    pub id: TransactionId,
}

impl Validate for Transaction {
    #[inline]
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut checks = Checks::default();
        checks.amount("amount", self.amount);
        checks.date("date", &self.date);
        checks.finish()
    }
}

impl Validate for CreateTransaction {
    #[inline]
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut checks = Checks::default();
        checks.amount("amount", self.amount);
        checks.date("date", &self.date);
        checks.finish()
    }
}

impl Validate for UpdateTransaction {
    #[inline]
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut checks = Checks::default();
        if let Some(amount) = self.amount {
            checks.amount("amount", amount);
        }
        if let Some(date) = self.date.as_deref() {
            checks.date("date", date);
        }
        checks.finish()
    }
}

impl Validate for DeleteTransaction {
    #[inline]
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl Schema for Transaction {
    const FIELDS: &'static [Field] = &[
        Field::required("id", FieldKind::String),
        Field::required("name", FieldKind::String),
        Field::optional("details", FieldKind::String),
        Field::required("date", FieldKind::Date),
        Field::required("type", FieldKind::Enum(TransactionType::NAMES)),
        Field::required("amount", FieldKind::Amount),
        Field::required("categoryId", FieldKind::String),
        Field::required("accountId", FieldKind::String),
        Field::required("paymentMethod", FieldKind::Enum(PaymentMethod::NAMES)),
    ];
}

impl Schema for CreateTransaction {
    const FIELDS: &'static [Field] = &[
        Field::required("name", FieldKind::String),
        Field::optional("details", FieldKind::String),
        Field::required("date", FieldKind::Date),
        Field::required("type", FieldKind::Enum(TransactionType::NAMES)),
        Field::required("amount", FieldKind::Amount),
        Field::required("categoryId", FieldKind::String),
        Field::required("accountId", FieldKind::String),
        Field::required("paymentMethod", FieldKind::Enum(PaymentMethod::NAMES)),
    ];
}

impl Schema for UpdateTransaction {
    const FIELDS: &'static [Field] = &[
        Field::optional("name", FieldKind::String),
        Field::optional("details", FieldKind::String),
        Field::optional("date", FieldKind::Date),
        Field::optional("type", FieldKind::Enum(TransactionType::NAMES)),
        Field::optional("amount", FieldKind::Amount),
        Field::optional("categoryId", FieldKind::String),
        Field::optional("accountId", FieldKind::String),
        Field::optional("paymentMethod", FieldKind::Enum(PaymentMethod::NAMES)),
    ];
}

impl Schema for DeleteTransaction {
    const FIELDS: &'static [Field] = &[Field::required("id", FieldKind::String)];
}
