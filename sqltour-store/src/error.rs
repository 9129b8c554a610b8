//! Error types for sqltour-store

use sqltour_core::TourError;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Anything the driver or the store raised: constraint violations,
    /// connectivity, decode failures.
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("missing bind parameter ':{0}'")]
    MissingParam(String),

    #[error(transparent)]
    Core(#[from] TourError),
}

impl StoreError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// True when the error is a relationship read outside a scope.
    pub fn is_detached(&self) -> bool {
        matches!(self, StoreError::Core(TourError::DetachedAccess { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StoreError::not_found("a", 42);
        assert_eq!(err.to_string(), "not found: a '42'");
    }

    #[test]
    fn test_detached_is_transparent() {
        let err: StoreError = TourError::detached("A", "bs").into();
        assert!(err.is_detached());
        assert!(err.to_string().starts_with("Detached access"));
    }

    #[test]
    fn test_sqlx_error_is_query_failure() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::Query(_)));
        assert!(!err.is_detached());
    }
}
