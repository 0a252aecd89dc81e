use crate::providers::nse::NseError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

/// Unified error type that renders as a JSON `{"error": "..."}` response
/// with an appropriate HTTP status code.
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Component failures cross the handler boundary as JSON error bodies.
/// Anti-bot blocks and malformed upstream payloads keep their distinct
/// status codes; everything else is a 500.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<NseError>() {
            Some(NseError::Blocked(_)) => Self {
                status: StatusCode::TOO_MANY_REQUESTS,
                message: err.to_string(),
            },
            Some(NseError::Invalid(_)) => Self {
                status: StatusCode::BAD_GATEWAY,
                message: err.to_string(),
            },
            None => Self::internal(format!("{err:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_maps_to_429() {
        let err: anyhow::Error = NseError::Blocked("captcha".to_string()).into();
        let api_err = ApiError::from(err);
        assert_eq!(api_err.status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_invalid_maps_to_502() {
        let err: anyhow::Error = NseError::Invalid("html".to_string()).into();
        let api_err = ApiError::from(err);
        assert_eq!(api_err.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_other_errors_map_to_500() {
        let api_err = ApiError::from(anyhow::anyhow!("boom"));
        assert_eq!(api_err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api_err.message.contains("boom"));
    }
}
