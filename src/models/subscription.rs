//! Recurring subscription model and its DTOs.

use serde::{Deserialize, Serialize};

use super::schema::Checks;
use super::{
    AccountId, CategoryId, Field, FieldKind, Schema, SubscriptionId, Validate, ValidationErrors,
};

/// Lowest valid due day.
const MIN_DUE_DAY: i64 = 1;
/// Highest valid due day.
const MAX_DUE_DAY: i64 = 31;

/// A recurring monthly charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Backend-assigned identifier.
    pub id: SubscriptionId,
    /// Display name.
    pub name: String,
    /// Amount charged each period.
    pub amount: f64,
    /// Day of the month the charge is due (1-31).
    pub due_day: u8,
    /// Category charges are filed under.
    pub category_id: CategoryId,
    /// Account charges are paid from.
    pub account_id: AccountId,
    /// ISO-8601 start date.
    pub start_date: String,
    /// ISO-8601 end date, if the subscription ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl Subscription {
    /// Builds a subscription from a create DTO and the id the backend assigned.
    #[inline]
    #[must_use]
    pub fn from_create(id: SubscriptionId, create: CreateSubscription) -> Self {
        Self {
            id,
            name: create.name,
            amount: create.amount,
            due_day: create.due_day,
            category_id: create.category_id,
            account_id: create.account_id,
            start_date: create.start_date,
            end_date: create.end_date,
        }
    }

    /// Returns a copy with every field present in `update` replaced.
    #[inline]
    #[must_use]
    pub fn patched(&self, update: &UpdateSubscription) -> Self {
        Self {
            id: self.id.clone(),
            name: update.name.clone().unwrap_or_else(|| self.name.clone()),
            amount: update.amount.unwrap_or(self.amount),
            due_day: update.due_day.unwrap_or(self.due_day),
            category_id: update
                .category_id
                .clone()
                .unwrap_or_else(|| self.category_id.clone()),
            account_id: update
                .account_id
                .clone()
                .unwrap_or_else(|| self.account_id.clone()),
            start_date: update
                .start_date
                .clone()
                .unwrap_or_else(|| self.start_date.clone()),
            end_date: update.end_date.clone().or_else(|| self.end_date.clone()),
        }
    }
}

/// Fields required to create a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscription {
    /// Display name.
    pub name: String,
    /// Amount charged each period.
    pub amount: f64,
    /// Day of the month the charge is due (1-31).
    pub due_day: u8,
    /// Category charges are filed under.
    pub category_id: CategoryId,
    /// Account charges are paid from.
    pub account_id: AccountId,
    /// ISO-8601 start date.
    pub start_date: String,
    /// ISO-8601 end date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Partial subscription update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscription {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// New due day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_day: Option<u8>,
    /// New category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    /// New account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    /// New start date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// New end date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Identifies a subscription to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSubscription {
    /// Subscription to delete.
    pub id: SubscriptionId,
}

impl Validate for Subscription {
    #[inline]
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut checks = Checks::default();
        checks.amount("amount", self.amount);
        checks.range("dueDay", i64::from(self.due_day), MIN_DUE_DAY, MAX_DUE_DAY);
        checks.date("startDate", &self.start_date);
        if let Some(end) = self.end_date.as_deref() {
            checks.date("endDate", end);
        }
        checks.finish()
    }
}

impl Validate for CreateSubscription {
    #[inline]
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut checks = Checks::default();
        checks.amount("amount", self.amount);
        checks.range("dueDay", i64::from(self.due_day), MIN_DUE_DAY, MAX_DUE_DAY);
        checks.date("startDate", &self.start_date);
        if let Some(end) = self.end_date.as_deref() {
            checks.date("endDate", end);
        }
        checks.finish()
    }
}

impl Validate for UpdateSubscription {
    #[inline]
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut checks = Checks::default();
        if let Some(amount) = self.amount {
            checks.amount("amount", amount);
        }
        if let Some(day) = self.due_day {
            checks.range("dueDay", i64::from(day), MIN_DUE_DAY, MAX_DUE_DAY);
        }
        if let Some(start) = self.start_date.as_deref() {
            checks.date("startDate", start);
        }
        if let Some(end) = self.end_date.as_deref() {
            checks.date("endDate", end);
        }
        checks.finish()
    }
}

impl Validate for DeleteSubscription {
    #[inline]
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl Schema for Subscription {
    const FIELDS: &'static [Field] = &[
        Field::required("id", FieldKind::String),
        Field::required("name", FieldKind::String),
        Field::required("amount", FieldKind::Amount),
        Field::required("dueDay", FieldKind::Integer { min: MIN_DUE_DAY, max: MAX_DUE_DAY }),
        Field::required("categoryId", FieldKind::String),
        Field::required("accountId", FieldKind::String),
        Field::required("startDate", FieldKind::Date),
        Field::optional("endDate", FieldKind::Date),
    ];
}

impl Schema for CreateSubscription {
    const FIELDS: &'static [Field] = &[
        Field::required("name", FieldKind::String),
        Field::required("amount", FieldKind::Amount),
        Field::required("dueDay", FieldKind::Integer { min: MIN_DUE_DAY, max: MAX_DUE_DAY }),
        Field::required("categoryId", FieldKind::String),
        Field::required("accountId", FieldKind::String),
        Field::required("startDate", FieldKind::Date),
        Field::optional("endDate", FieldKind::Date),
    ];
}

impl Schema for UpdateSubscription {
    const FIELDS: &'static [Field] = &[
        Field::optional("name", FieldKind::String),
        Field::optional("amount", FieldKind::Amount),
        Field::optional("dueDay", FieldKind::Integer { min: MIN_DUE_DAY, max: MAX_DUE_DAY }),
        Field::optional("categoryId", FieldKind::String),
        Field::optional("accountId", FieldKind::String),
        Field::optional("startDate", FieldKind::Date),
        Field::optional("endDate", FieldKind::Date),
    ];
}

impl Schema for DeleteSubscription {
    const FIELDS: &'static [Field] = &[Field::required("id", FieldKind::String)];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ViolationKind;
    use serde_json::json;

    #[test]
    fn parse_subscription() {
        let subscription = Subscription::parse(&json!({
            "id": "s1",
            "name": "Streaming",
            "amount": 12.99,
            "dueDay": 5,
            "categoryId": "c3",
            "accountId": "a1",
            "startDate": "2024-01-05"
        }))
        .unwrap();
        assert_eq!(subscription.due_day, 5);
        assert!(subscription.end_date.is_none());
    }

    #[test]
    fn due_day_out_of_range() {
        let errors = CreateSubscription::parse(&json!({
            "name": "Gym",
            "amount": 30,
            "dueDay": 0,
            "categoryId": "c3",
            "accountId": "a1",
            "startDate": "2024-01-01"
        }))
        .unwrap_err();
        assert_eq!(errors.violations().len(), 1);
        assert_eq!(
            errors.violations()[0].kind,
            ViolationKind::OutOfRange { min: 1, max: 31 }
        );
    }

    #[test]
    fn typed_validate_checks_range_and_dates() {
        let create = CreateSubscription {
            name: "Gym".to_owned(),
            amount: 30.0,
            due_day: 40,
            category_id: CategoryId::from("c3"),
            account_id: AccountId::from("a1"),
            start_date: "2024-01-01".to_owned(),
            end_date: Some("never".to_owned()),
        };
        let errors = create.validate().unwrap_err();
        assert!(errors.has_field("dueDay"));
        assert!(errors.has_field("endDate"));
    }

    #[test]
    fn patched_sets_end_date() {
        let subscription = Subscription::from_create(
            SubscriptionId::from("s1"),
            CreateSubscription {
                name: "Gym".to_owned(),
                amount: 30.0,
                due_day: 1,
                category_id: CategoryId::from("c3"),
                account_id: AccountId::from("a1"),
                start_date: "2024-01-01".to_owned(),
                end_date: None,
            },
        );
        let ended = subscription.patched(&UpdateSubscription {
            end_date: Some("2024-12-31".to_owned()),
            ..UpdateSubscription::default()
        });
        assert_eq!(ended.end_date.as_deref(), Some("2024-12-31"));
        assert_eq!(ended.due_day, 1);
    }
}
