//! Newtype wrappers for entity identifiers.
//!
//! All identifiers are opaque strings assigned by the backend. Wrapping
//! them prevents passing a category id where an account id is expected.

use serde::{Deserialize, Serialize};

/// Defines opaque string identifiers, one newtype per entity.
macro_rules! string_ids {
    ($($(#[$meta:meta])* $name:ident;)+) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a backend-assigned id.
            #[inline]
            #[must_use]
            pub const fn new(value: String) -> Self {
                Self(value)
            }

            /// Returns the raw id.
            #[inline]
            #[must_use]
            pub fn as_inner(&self) -> &str {
                self.0.as_str()
            }

            /// Unwraps the raw id.
            #[inline]
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                self.as_inner()
            }
        }

        impl core::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_inner())
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self::new(value.to_owned())
            }
        }

        impl From<$name> for String {
            #[inline]
            fn from(id: $name) -> Self {
                id.into_inner()
            }
        }
    )+};
}

string_ids! {
    /// Id of an account.
    AccountId;
    /// Id of a category.
    CategoryId;
    /// Id of a transaction.
    TransactionId;
    /// Id of a recurring subscription.
    SubscriptionId;
    /// Id of a signed-in user.
    UserId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_is_transparent_on_the_wire() {
        let id = AccountId::new("a1".to_owned());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""a1""#);
        let deserialized: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, id);
    }

    #[test]
    fn display_prints_raw_value() {
        let id = CategoryId::from("Groceries:ID");
        assert_eq!(id.to_string(), "Groceries:ID");
    }

    #[test]
    fn id_conversions() {
        let id: TransactionId = "t-1".to_owned().into();
        assert_eq!(id.as_inner(), "t-1");
        assert_eq!(id.as_ref(), "t-1");
        assert_eq!(String::from(id), "t-1");
    }
}
