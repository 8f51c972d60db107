//! Transaction category model and its DTOs.

use serde::{Deserialize, Serialize};

use super::{CategoryId, CategoryType, Field, FieldKind, Schema, Validate, ValidationErrors};

/// A category that transactions are filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Backend-assigned identifier.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// Income or expense. Not enforced against referencing transactions.
    #[serde(rename = "type")]
    pub kind: CategoryType,
    /// Display color (CSS hex string).
    pub color: String,
}

impl Category {
    /// Builds a category from a create DTO and the id the backend assigned.
    #[inline]
    #[must_use]
    pub fn from_create(id: CategoryId, create: CreateCategory) -> Self {
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
    pub fn patched(&self, update: &UpdateCategory) -> Self {
        Self {
            id: self.id.clone(),
            name: update.name.clone().unwrap_or_else(|| self.name.clone()),
            kind: update.kind.unwrap_or(self.kind),
            color: update.color.clone().unwrap_or_else(|| self.color.clone()),
        }
    }
}

/// Fields required to create a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCategory {
    /// Display name.
    pub name: String,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: CategoryType,
    /// Display color.
    pub color: String,
}

/// Partial category update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCategory {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New category type.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<CategoryType>,
    /// New display color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Identifies a category to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCategory {
    /// Category to delete.
    pub id: CategoryId,
}

impl Validate for Category {
    #[inline]
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl Validate for CreateCategory {
    #[inline]
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl Validate for UpdateCategory {
    #[inline]
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl Validate for DeleteCategory {
    #[inline]
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl Schema for Category {
    const FIELDS: &'static [Field] = &[
        Field::required("id", FieldKind::String),
        Field::required("name", FieldKind::String),
        Field::required("type", FieldKind::Enum(CategoryType::NAMES)),
        Field::required("color", FieldKind::String),
    ];
}

impl Schema for CreateCategory {
    const FIELDS: &'static [Field] = &[
        Field::required("name", FieldKind::String),
        Field::required("type", FieldKind::Enum(CategoryType::NAMES)),
        Field::required("color", FieldKind::String),
    ];
}

impl Schema for UpdateCategory {
    const FIELDS: &'static [Field] = &[
        Field::optional("name", FieldKind::String),
        Field::optional("type", FieldKind::Enum(CategoryType::NAMES)),
        Field::optional("color", FieldKind::String),
    ];
}

impl Schema for DeleteCategory {
    const FIELDS: &'static [Field] = &[Field::required("id", FieldKind::String)];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TransactionType, ViolationKind};
    use serde_json::json;

    #[test]
    fn parse_category() {
        let category = Category::parse(&json!({
            "id": "c1",
            "name": "Groceries",
            "type": "EXPENSE",
            "color": "#00C49F"
        }))
        .unwrap();
        assert_eq!(category.kind, TransactionType::Expense);
        assert_eq!(category.name, "Groceries");
    }

    #[test]
    fn numeric_name_is_a_type_mismatch() {
        let errors = CreateCategory::parse(&json!({
            "name": 7,
            "type": "INCOME",
            "color": "#FFBB28"
        }))
        .unwrap_err();
        assert_eq!(errors.violations().len(), 1);
        assert_eq!(errors.violations()[0].field, "name");
        assert_eq!(
            errors.violations()[0].kind,
            ViolationKind::TypeMismatch { expected: "string" }
        );
    }

    #[test]
    fn patched_changes_type_only() {
        let category = Category {
            id: CategoryId::from("c1"),
            name: "Freelance".to_owned(),
            kind: TransactionType::Expense,
            color: "#8884d8".to_owned(),
        };
        let patched = category.patched(&UpdateCategory {
            kind: Some(TransactionType::Income),
            ..UpdateCategory::default()
        });
        assert_eq!(patched.kind, TransactionType::Income);
        assert_eq!(patched.name, "Freelance");
    }
}
