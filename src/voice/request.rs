//! What an interpretation provider is asked.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{
    Account, AccountId, AccountType, Category, CategoryId, CategoryType, PaymentMethod,
};
use crate::store::FinanceSnapshot;

/// An existing category the provider may match against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryContext {
    /// Category id, used verbatim in suggested transactions.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: CategoryType,
    /// Display color, so new categories can pick a distinct one.
    pub color: String,
}

impl From<&Category> for CategoryContext {
    #[inline]
    fn from(category: &Category) -> Self {
        Self {
            id: category.id.clone(),
            name: category.name.clone(),
            kind: category.kind,
            color: category.color.clone(),
        }
    }
}

/// An existing account the provider may match against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountContext {
    /// Account id, used verbatim in suggested transactions.
    pub id: AccountId,
    /// Display name.
    pub name: String,
    /// Account kind.
    #[serde(rename = "type")]
    pub kind: AccountType,
}

impl From<&Account> for AccountContext {
    #[inline]
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            kind: account.kind,
        }
    }
}

/// Everything the provider may reference besides the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretationContext {
    /// Categories that already exist.
    pub categories: Vec<CategoryContext>,
    /// Accounts that already exist.
    pub accounts: Vec<AccountContext>,
    /// Payment methods a transaction may use.
    pub payment_methods: Vec<PaymentMethod>,
}

impl From<&FinanceSnapshot> for InterpretationContext {
    #[inline]
    fn from(snapshot: &FinanceSnapshot) -> Self {
        Self {
            categories: snapshot.categories.iter().map(CategoryContext::from).collect(),
            accounts: snapshot.accounts.iter().map(AccountContext::from).collect(),
            payment_methods: PaymentMethod::ALL.to_vec(),
        }
    }
}

/// A transcript plus the context needed to turn it into transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretationRequest {
    /// What the user said.
    pub voice_input: String,
    /// Language tag (e.g. `en-US`) the suggested values should be in.
    pub language: String,
    /// Reference date for relative expressions like "yesterday".
    pub date: String,
    /// Existing entities and allowed values.
    pub context: InterpretationContext,
}

impl InterpretationRequest {
    /// Builds a request against the current contents of a finance store.
    #[inline]
    #[must_use]
    pub fn new<T: Into<String>, L: Into<String>>(
        voice_input: T,
        language: L,
        today: NaiveDate,
        snapshot: &FinanceSnapshot,
    ) -> Self {
        Self {
            voice_input: voice_input.into(),
            language: language.into(),
            date: today.format("%Y-%m-%d").to_string(),
            context: InterpretationContext::from(snapshot),
        }
    }
}
