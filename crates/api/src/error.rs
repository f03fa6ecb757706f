use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::models::profile::ProfileError;
use domain::services::two_factor::TwoFactorError;
use persistence::{IdentityError, RealtimeError, RepositoryError, StoreError};
use serde::Serialize;
use thiserror::Error;

use crate::services::exports::ExportError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: {0}")]
    InvalidFields(String, Vec<ValidationDetail>),

    #[error("Invalid one-time code: {0}")]
    InvalidOtp(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg, None)
            }
            ApiError::InvalidFields(msg, details) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                msg,
                Some(details),
            ),
            ApiError::InvalidOtp(msg) => (StatusCode::BAD_REQUEST, "invalid_otp", msg, None),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many requests. Please try again later.".into(),
                None,
            ),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => {
                ApiError::NotFound(format!("{} {} not found", collection, id))
            }
            StoreError::InvalidField(msg) => ApiError::Validation(msg),
            other => ApiError::Internal(format!("Record store error: {}", other)),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::NotFound(_) => ApiError::NotFound("Account not found".into()),
            IdentityError::EmailExists(_) => {
                ApiError::Conflict("An account with this email already exists".into())
            }
            IdentityError::Password(e) => ApiError::Validation(e.to_string()),
            other => ApiError::Internal(format!("Identity error: {}", other)),
        }
    }
}

impl From<RealtimeError> for ApiError {
    fn from(err: RealtimeError) -> Self {
        ApiError::Internal(format!("Realtime store error: {}", err))
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Store(e) => e.into(),
            RepositoryError::Identity(e) => e.into(),
            RepositoryError::Realtime(e) => e.into(),
        }
    }
}

impl From<TwoFactorError> for ApiError {
    fn from(err: TwoFactorError) -> Self {
        let message = err.to_string();
        match err {
            TwoFactorError::InvalidCredentials | TwoFactorError::NotAuthenticated => {
                ApiError::Unauthorized(message)
            }
            TwoFactorError::AccessDenied => ApiError::Forbidden(message),
            TwoFactorError::InvalidOtp => ApiError::InvalidOtp(message),
            TwoFactorError::NoPendingLogin
            | TwoFactorError::EnrollmentNotStarted
            | TwoFactorError::NotEnabled => ApiError::Validation(message),
            TwoFactorError::CorruptSecret(e) => {
                ApiError::Internal(format!("Stored 2FA secret is unusable: {}", e))
            }
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        ApiError::Internal(format!("Export failed: {}", err))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {}", field)),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        let message = if details.len() == 1 {
            details[0].message.clone()
        } else {
            format!("{} validation errors", details.len())
        };

        ApiError::InvalidFields(message, details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::Conflict("x".into()), StatusCode::CONFLICT),
            (ApiError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::InvalidOtp("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (ApiError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ApiError::ServiceUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = ApiError::Internal("connection refused".into()).into_response();
        let body = body_json(response).await;
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_two_factor_mapping() {
        let response = ApiError::from(TwoFactorError::InvalidOtp).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_otp");
        assert_eq!(body["message"], "Invalid 2FA code. Please try again.");

        assert!(matches!(
            ApiError::from(TwoFactorError::AccessDenied),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            ApiError::from(TwoFactorError::InvalidCredentials),
            ApiError::Unauthorized(_)
        ));
    }

    #[test]
    fn test_store_not_found_mapping() {
        let error: ApiError = StoreError::not_found("users", "u1").into();
        match error {
            ApiError::NotFound(msg) => assert_eq!(msg, "users u1 not found"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_email_exists_is_conflict() {
        let error: ApiError = RepositoryError::from(IdentityError::EmailExists("a@b.c".into())).into();
        assert!(matches!(error, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_validation_errors_carry_details() {
        let request = domain::models::user::CreateUserRequest {
            username: String::new(),
            email: "not-an-email".into(),
            password: "123".into(),
            full_name: String::new(),
            address: None,
            role: None,
            department: None,
            status: None,
            municipality: None,
            barangay: None,
        };
        let error: ApiError = request.validate().unwrap_err().into();
        let body = body_json(error.into_response()).await;
        assert_eq!(body["message"], "3 validation errors");
        let details = body["details"].as_array().unwrap();
        assert_eq!(details[0]["field"], "email");
        assert_eq!(details[1]["field"], "password");
        assert_eq!(details[2]["field"], "username");
    }

    #[test]
    fn test_profile_error_message() {
        match ApiError::from(ProfileError::InvalidProfileType) {
            ApiError::Validation(msg) => assert_eq!(msg, "Invalid profile type"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
