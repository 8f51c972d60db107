//! Error types for the finance client library.

use crate::models::ValidationErrors;

/// Kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A financial account.
    Account,
    /// A transaction category.
    Category,
    /// A single transaction.
    Transaction,
    /// A recurring subscription.
    Subscription,
}

impl core::fmt::Display for EntityKind {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match *self {
            Self::Account => "account",
            Self::Category => "category",
            Self::Transaction => "transaction",
            Self::Subscription => "subscription",
        };
        f.write_str(name)
    }
}

/// All errors that can occur when using the finance client.
#[derive(Debug, thiserror::Error)]
pub enum FinanceError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend or a provider returned a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, or a placeholder if it could not be read.
        message: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local storage backend failed.
    #[error("storage error: {0}")]
    Storage(Box<dyn core::error::Error + Send + Sync>),

    /// A DTO or payload violated its schema.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The target of an update or delete is not in the local cache.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of the missing entity.
        entity: EntityKind,
        /// Identifier that was looked up.
        id: String,
    },

    /// Deletion blocked because transactions still reference the entity.
    #[error("{entity} {id} is still referenced by {references} transaction(s)")]
    InUse {
        /// Kind of the entity that could not be deleted.
        entity: EntityKind,
        /// Identifier of the entity.
        id: String,
        /// Number of transactions referencing it.
        references: usize,
    },

    /// The interpretation provider failed or returned a malformed batch.
    #[error("interpretation failed: {0}")]
    Interpretation(String),

    /// Speech capture was misused or the recognizer reported an error.
    #[error("voice capture error: {0}")]
    Capture(String),

    /// A `"<Name>:ID"` placeholder matched no account or category.
    #[error("unresolved placeholder reference: {0}")]
    UnresolvedReference(String),

    /// Client or provider configuration is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, FinanceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Violation, ViolationKind};

    #[test]
    fn error_from_serde_json() {
        let serde_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err = FinanceError::from(serde_err);
        assert!(matches!(err, FinanceError::Serialization(_)));
        assert!(err.to_string().contains("serialization error"));
    }

    #[test]
    fn error_storage_display() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = FinanceError::Storage(Box::new(inner));
        let msg = err.to_string();
        assert!(msg.contains("storage error"));
        assert!(msg.contains("file missing"));
    }

    #[test]
    fn in_use_names_the_relationship() {
        let err = FinanceError::InUse {
            entity: EntityKind::Account,
            id: "a1".to_owned(),
            references: 2,
        };
        assert_eq!(
            err.to_string(),
            "account a1 is still referenced by 2 transaction(s)"
        );
    }

    #[test]
    fn not_found_display() {
        let err = FinanceError::NotFound {
            entity: EntityKind::Category,
            id: "c9".to_owned(),
        };
        assert_eq!(err.to_string(), "category not found: c9");
    }

    #[test]
    fn validation_lists_fields() {
        let errors = ValidationErrors::from(vec![Violation::new("email", ViolationKind::InvalidEmail)]);
        let err = FinanceError::from(errors);
        assert!(err.to_string().contains("email"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FinanceError>();
    }
}
