// HTTP API Error Types
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::tenant::FeatureFlag;

/// Who is to blame for a failed upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamFault {
    /// The caller sent something the upstream refused as malformed
    InvalidInput,
    /// Credentials or token were rejected
    Rejected,
    /// Outage, timeout, or an answer we could not understand
    Provider,
}

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    FeatureNotAvailable {
        tenant: String,
        feature: FeatureFlag,
    },

    // 404 Not Found
    TenantNotFound(String),
    NotFound(String),

    // 400 / 401 / 500 depending on fault
    UpstreamAuth {
        message: String,
        reason: Option<String>,
        fault: UpstreamFault,
    },
    UpstreamQuery {
        message: String,
        reason: Option<String>,
        fault: UpstreamFault,
    },
    UpstreamStorage {
        message: String,
        reason: Option<String>,
        fault: UpstreamFault,
    },

    // 429 Too Many Requests
    TooManyRequests(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::FeatureNotAvailable { .. } => 403,
            ApiError::TenantNotFound(_) => 404,
            ApiError::NotFound(_) => 404,
            ApiError::UpstreamAuth { fault, .. } => match fault {
                UpstreamFault::InvalidInput => 400,
                UpstreamFault::Rejected => 401,
                UpstreamFault::Provider => 500,
            },
            ApiError::UpstreamQuery { fault, .. } | ApiError::UpstreamStorage { fault, .. } => match fault {
                UpstreamFault::Provider => 500,
                UpstreamFault::InvalidInput | UpstreamFault::Rejected => 400,
            },
            ApiError::TooManyRequests(_) => 429,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::ValidationError { message, .. } => message.clone(),
            ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::FeatureNotAvailable { feature, .. } => {
                format!("Feature {} not available in this application", feature)
            }
            ApiError::TenantNotFound(_) => "Application not found".to_string(),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::UpstreamAuth { message, .. } => message.clone(),
            ApiError::UpstreamQuery { message, .. } => message.clone(),
            ApiError::UpstreamStorage { message, .. } => message.clone(),
            ApiError::TooManyRequests(msg) => msg.clone(),
            ApiError::InternalServerError(msg) => msg.clone(),
            ApiError::ServiceUnavailable(msg) => msg.clone(),
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::FeatureNotAvailable { .. } => "FEATURE_NOT_AVAILABLE",
            ApiError::TenantNotFound(_) => "TENANT_NOT_FOUND",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::UpstreamAuth { .. } => "UPSTREAM_AUTH_ERROR",
            ApiError::UpstreamQuery { .. } => "UPSTREAM_QUERY_ERROR",
            ApiError::UpstreamStorage { .. } => "UPSTREAM_STORAGE_ERROR",
            ApiError::TooManyRequests(_) => "TOO_MANY_REQUESTS",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body: `{ status, message, details }`
    pub fn to_json(&self) -> Value {
        let mut details = Map::new();
        details.insert("code".into(), Value::String(self.error_code().to_string()));

        match self {
            ApiError::ValidationError {
                field_errors: Some(field_errors),
                ..
            } => {
                details.insert("field_errors".into(), json!(field_errors));
            }
            ApiError::FeatureNotAvailable { tenant, feature } => {
                details.insert("tenant".into(), Value::String(tenant.clone()));
                details.insert("feature".into(), Value::String(feature.to_string()));
            }
            ApiError::TenantNotFound(tenant) if !tenant.is_empty() => {
                details.insert("tenant".into(), Value::String(tenant.clone()));
            }
            ApiError::UpstreamAuth { reason: Some(reason), .. }
            | ApiError::UpstreamQuery { reason: Some(reason), .. }
            | ApiError::UpstreamStorage { reason: Some(reason), .. } => {
                details.insert("reason".into(), Value::String(reason.clone()));
            }
            _ => {}
        }

        json!({
            "status": "error",
            "message": self.message(),
            "details": Value::Object(details),
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    /// Single-field validation failure
    pub fn invalid_field(field: &str, problem: impl Into<String>) -> Self {
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), problem.into());
        Self::validation_error("Invalid field format", Some(field_errors))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn feature_not_available(tenant: impl Into<String>, feature: FeatureFlag) -> Self {
        ApiError::FeatureNotAvailable {
            tenant: tenant.into(),
            feature,
        }
    }

    pub fn tenant_not_found(tenant: impl Into<String>) -> Self {
        ApiError::TenantNotFound(tenant.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        ApiError::TooManyRequests(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(format!("Invalid query string: {}", rejection.body_text()))
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
