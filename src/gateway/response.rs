//! API response envelope and error codes.
//!
//! Every endpoint answers `{code, msg, data}`: code 0 with data on success,
//! a non-zero code with a French message on failure.

use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthError;
use crate::ledger::LedgerError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    #[schema(example = "ok")]
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Standard error codes
pub mod error_codes {
    pub const SUCCESS: i32 = 0;

    // Business errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_BALANCE: i32 = 1002;
    pub const ACCOUNT_LOCKED: i32 = 1003;
    pub const SELF_TRANSFER: i32 = 1004;
    pub const ALREADY_CANCELLED: i32 = 1005;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;
    pub const PERMISSION_DENIED: i32 = 2003;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4004;
    pub const CONFLICT: i32 = 4091;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
}

/// Error half of every handler result. Renders as the standard envelope
/// with an HTTP status matching the failure class.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Success helper used by the handlers.
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            error_codes::INVALID_PARAMETER,
            msg,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiResponse::<()>::error(self.code, self.msg)),
        )
            .into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        use error_codes::*;
        let (status, code) = match &err {
            LedgerError::Validation(_) => (StatusCode::BAD_REQUEST, INVALID_PARAMETER),
            LedgerError::InsufficientFunds(_) => (StatusCode::BAD_REQUEST, INSUFFICIENT_BALANCE),
            LedgerError::AccountLocked(_) => (StatusCode::BAD_REQUEST, ACCOUNT_LOCKED),
            LedgerError::SelfTransfer => (StatusCode::BAD_REQUEST, SELF_TRANSFER),
            LedgerError::AlreadyCancelled => (StatusCode::BAD_REQUEST, ALREADY_CANCELLED),
            LedgerError::Permission(_) => (StatusCode::FORBIDDEN, PERMISSION_DENIED),
            LedgerError::NotFound(_) => (StatusCode::NOT_FOUND, NOT_FOUND),
            LedgerError::Conflict => (StatusCode::SERVICE_UNAVAILABLE, CONFLICT),
            LedgerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR),
        };
        let msg = match &err {
            // Internal details never reach the wire.
            LedgerError::Internal(detail) => {
                tracing::error!(%detail, "erreur interne");
                "Erreur interne du serveur".to_string()
            }
            other => other.to_string(),
        };
        Self { status, code, msg }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        use error_codes::*;
        match err {
            AuthError::InvalidCredentials => Self::new(
                StatusCode::UNAUTHORIZED,
                AUTH_FAILED,
                AuthError::InvalidCredentials.to_string(),
            ),
            AuthError::Inactive => Self::new(
                StatusCode::FORBIDDEN,
                PERMISSION_DENIED,
                AuthError::Inactive.to_string(),
            ),
            AuthError::InvalidToken => Self::new(
                StatusCode::UNAUTHORIZED,
                AUTH_FAILED,
                AuthError::InvalidToken.to_string(),
            ),
            AuthError::Internal(detail) => {
                tracing::error!(%detail, "erreur interne d'authentification");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR,
                    "Erreur interne du serveur",
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_to_http_statuses() {
        let err: ApiError = LedgerError::SelfTransfer.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, error_codes::SELF_TRANSFER);

        let err: ApiError = LedgerError::Permission("non".to_string()).into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let err: ApiError = LedgerError::NotFound("introuvable".to_string()).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err: ApiError = LedgerError::Conflict.into();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn internal_errors_are_redacted() {
        let err: ApiError = LedgerError::Internal("connection refused".to_string()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.msg.contains("connection"));
    }

    #[test]
    fn envelope_serializes_without_null_data() {
        let body = serde_json::to_value(ApiResponse::<()>::error(
            error_codes::NOT_FOUND,
            "Transaction introuvable",
        ))
        .unwrap();
        assert_eq!(body["code"], 4004);
        assert!(body.get("data").is_none());
    }
}
