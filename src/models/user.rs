//! Authenticated user model.

use serde::{Deserialize, Serialize};

use super::schema::Checks;
use super::{Field, FieldKind, Schema, UserId, Validate, ValidationErrors};

/// The signed-in user, as returned by `GET /me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend identifier.
    pub id: UserId,
    /// Email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Avatar image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Validate for User {
    #[inline]
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut checks = Checks::default();
        checks.email("email", &self.email);
        checks.finish()
    }
}

impl Schema for User {
    const FIELDS: &'static [Field] = &[
        Field::required("id", FieldKind::String),
        Field::required("email", FieldKind::Email),
        Field::required("name", FieldKind::String),
        Field::optional("avatar", FieldKind::String),
    ];
}
