//! Financial account model and its DTOs.

use serde::{Deserialize, Serialize};

use super::{AccountId, AccountType, Field, FieldKind, Schema, Validate, ValidationErrors};

/// A financial account (checking, savings, credit card, investment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Backend-assigned identifier.
    pub id: AccountId,
    /// Display name.
    pub name: String,
    /// Type of account.
    #[serde(rename = "type")]
    pub kind: AccountType,
    /// Display color (CSS hex string).
    pub color: String,
}

impl Account {
    /// Builds an account from a create DTO and the id the backend assigned.
    #[inline]
    #[must_use]
    pub fn from_create(id: AccountId, create: CreateAccount) -> Self {
        Self {
            id,
            name: create.name,
            kind: create.kind,
            color: create.color,
        }
    }

    /// Returns a copy with every field present in `update` replaced.
    #[inline]
    #[must_use]
    pub fn patched(&self, update: &UpdateAccount) -> Self {
        Self {
            id: self.id.clone(),
            name: update.name.clone().unwrap_or_else(|| self.name.clone()),
            kind: update.kind.unwrap_or(self.kind),
            color: update.color.clone().unwrap_or_else(|| self.color.clone()),
        }
    }
}

/// Fields required to create an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccount {
    /// Display name.
    pub name: String,
    /// Type of account.
    #[serde(rename = "type")]
    pub kind: AccountType,
    /// Display color.
    pub color: String,
}

/// Partial account update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAccount {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New account type.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<AccountType>,
    /// New display color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Identifies an account to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAccount {
    /// Account to delete.
    pub id: AccountId,
}

impl Validate for Account {
    #[inline]
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl Validate for CreateAccount {
    #[inline]
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl Validate for UpdateAccount {
    #[inline]
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl Validate for DeleteAccount {
    #[inline]
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl Schema for Account {
    const FIELDS: &'static [Field] = &[
        Field::required("id", FieldKind::String),
        Field::required("name", FieldKind::String),
        Field::required("type", FieldKind::Enum(AccountType::NAMES)),
        Field::required("color", FieldKind::String),
    ];
}

impl Schema for CreateAccount {
    const FIELDS: &'static [Field] = &[
        Field::required("name", FieldKind::String),
        Field::required("type", FieldKind::Enum(AccountType::NAMES)),
        Field::required("color", FieldKind::String),
    ];
}

impl Schema for UpdateAccount {
    const FIELDS: &'static [Field] = &[
        Field::optional("name", FieldKind::String),
        Field::optional("type", FieldKind::Enum(AccountType::NAMES)),
        Field::optional("color", FieldKind::String),
    ];
}

impl Schema for DeleteAccount {
    const FIELDS: &'static [Field] = &[Field::required("id", FieldKind::String)];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ViolationKind;
    use serde_json::json;

    #[test]
    fn parse_account() {
        let account = Account::parse(&json!({
            "id": "a1",
            "name": "Checking",
            "type": "CHECKING",
            "color": "#0088FE"
        }))
        .unwrap();
        assert_eq!(account.id, AccountId::from("a1"));
        assert_eq!(account.kind, AccountType::Checking);
    }

    #[test]
    fn parse_reports_invalid_type_and_missing_color() {
        let errors = CreateAccount::parse(&json!({"name": "Wallet", "type": "WALLET"})).unwrap_err();
        assert_eq!(errors.violations().len(), 2);
        assert!(matches!(
            errors.violations()[0].kind,
            ViolationKind::InvalidEnum { .. }
        ));
        assert_eq!(errors.violations()[1].field, "color");
        assert_eq!(errors.violations()[1].kind, ViolationKind::Missing);
    }

    #[test]
    fn update_serializes_only_present_fields() {
        let update = UpdateAccount {
            color: Some("#FF8042".to_owned()),
            ..UpdateAccount::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"color": "#FF8042"}));
        assert_eq!(UpdateAccount::parse(&json!({})).unwrap(), UpdateAccount::default());
    }

    #[test]
    fn patched_keeps_unspecified_fields() {
        let account = Account::from_create(
            AccountId::from("a1"),
            CreateAccount {
                name: "Checking".to_owned(),
                kind: AccountType::Checking,
                color: "#0088FE".to_owned(),
            },
        );
        let renamed = account.patched(&UpdateAccount {
            name: Some("Main".to_owned()),
            ..UpdateAccount::default()
        });
        assert_eq!(renamed.name, "Main");
        assert_eq!(renamed.kind, AccountType::Checking);
        assert_eq!(renamed.color, "#0088FE");
        assert_eq!(renamed.id, account.id);
    }

    #[test]
    fn delete_dto_wire_shape() {
        let delete = DeleteAccount { id: AccountId::from("a1") };
        assert_eq!(serde_json::to_value(&delete).unwrap(), json!({"id": "a1"}));
    }
}
