use axum::http::StatusCode;

use crate::transaction::TransactionError;

/// Errors raised by the goal, neighbor and content logic.
///
/// Handlers answer with `(StatusCode, String)`; this converts into that shape.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Not logged in")]
    AuthenticationRequired,

    /// Returned both for unknown users and for relationships that are not
    /// accepted, so callers cannot probe who is related to whom.
    #[error("Neighbor relationship not found")]
    RelationshipNotFound,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Query(String),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

impl DomainError {
    /// Wraps a data-layer failure with the step that failed.
    pub fn query(context: &str) -> impl FnOnce(libsql::Error) -> DomainError + '_ {
        move |e| {
            tracing::error!(error = %e, context, "query failed");
            DomainError::Query(context.to_string())
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            DomainError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            DomainError::RelationshipNotFound | DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Query(_) | DomainError::Transaction(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DomainError> for (StatusCode, String) {
    fn from(e: DomainError) -> Self {
        (e.status(), e.to_string())
    }
}
