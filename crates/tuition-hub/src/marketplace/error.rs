use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Error enumeration for repository failures.
///
/// `VersionMismatch` signals a stale optimistic-concurrency token on a
/// versioned document; services retry a bounded number of times before
/// reporting the write as unavailable.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("stale document version")]
    VersionMismatch,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Client-facing failure taxonomy shared by every marketplace service.
///
/// `Unavailable` is reported distinctly from `Internal` so callers can tell
/// "try again" apart from "this request is invalid"; the services themselves
/// never retry a failed write beyond the optimistic-concurrency loop.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("authentication required")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl MarketplaceError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    const fn status(&self) -> StatusCode {
        match self {
            MarketplaceError::Unauthorized => StatusCode::UNAUTHORIZED,
            MarketplaceError::Forbidden(_) => StatusCode::FORBIDDEN,
            MarketplaceError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketplaceError::Conflict(_) => StatusCode::CONFLICT,
            MarketplaceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MarketplaceError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            MarketplaceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for MarketplaceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => Self::Conflict("record already exists".to_string()),
            RepositoryError::NotFound => Self::NotFound("record"),
            RepositoryError::VersionMismatch => {
                Self::Unavailable("document update contention".to_string())
            }
            RepositoryError::Unavailable(message) => Self::Unavailable(message),
        }
    }
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "message": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_version_mismatch_surfaces_as_unavailable() {
        let error = MarketplaceError::from(RepositoryError::VersionMismatch);
        assert!(matches!(error, MarketplaceError::Unavailable(_)));
        assert_eq!(error.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn taxonomy_maps_to_expected_status_codes() {
        assert_eq!(
            MarketplaceError::Unauthorized.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            MarketplaceError::forbidden("not authorized").status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            MarketplaceError::NotFound("tuition post").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            MarketplaceError::conflict("already applied").status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            MarketplaceError::validation("rating out of range").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
