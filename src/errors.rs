use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::auth::IdentityError;
use crate::services::lifecycle::TransitionError;
use crate::services::scheduling::SchedulingError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("upstream error: {0}")]
    Upstream(String),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn unauthenticated() -> Self {
        AppError::Unauthenticated("Authentication required".to_string())
    }

    pub fn forbidden() -> Self {
        AppError::Forbidden("Access denied".to_string())
    }

    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-side detail stays in the log
        let message = match &self {
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                "Internal server error".to_string()
            }
            AppError::Upstream(_) => {
                tracing::error!(error = %self, "hosted service call failed");
                "Upstream service unavailable".to_string()
            }
            _ => self.to_string(),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::NotPermitted { .. } => AppError::Forbidden(err.to_string()),
            TransitionError::Invalid { .. } => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::ServiceNotFound => AppError::NotFound(err.to_string()),
            SchedulingError::Storage(e) => AppError::Internal(e),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected(msg) => AppError::BadRequest(msg),
            IdentityError::Transport(_) | IdentityError::Unexpected(_) => {
                AppError::Upstream(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingStatus;
    use crate::services::lifecycle::BookingParty;

    #[test]
    fn test_transition_errors_split_by_kind() {
        let denied = TransitionError::NotPermitted {
            party: BookingParty::Customer,
            from: BookingStatus::Pending,
            to: BookingStatus::Confirmed,
        };
        assert_eq!(AppError::from(denied).status(), StatusCode::FORBIDDEN);

        let invalid = TransitionError::Invalid {
            from: BookingStatus::Pending,
            to: BookingStatus::Paid,
        };
        assert_eq!(AppError::from(invalid).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_scheduling_errors_map_to_client_errors() {
        assert_eq!(
            AppError::from(SchedulingError::SlotTaken).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(SchedulingError::ServiceNotFound).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_identity_rejection_is_client_error() {
        let err = AppError::from(IdentityError::Rejected("email taken".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "email taken");

        let err = AppError::from(IdentityError::Unexpected("bad json".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
