//! Capabilities the gateway borrows from the hosted backend.
//!
//! Each capability is its own trait so handlers depend only on what they use and
//! tests can swap in in-memory fakes. [`supabase::SupabaseClient`] implements all of them.

pub mod supabase;

use async_trait::async_trait;
use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ApiError, UpstreamFault};

/// Column → value equality filters
pub type Filters = BTreeMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Which schema a table call runs against and whose credentials it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableScope {
    pub schema: String,
    pub access_token: Option<String>,
}

impl TableScope {
    pub fn new(schema: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            schema: schema.into(),
            access_token,
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, credentials: &Credentials) -> Result<Value, UpstreamError>;
    async fn sign_in(&self, credentials: &Credentials) -> Result<Value, UpstreamError>;
    async fn refresh_session(&self, refresh_token: &str) -> Result<Value, UpstreamError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), UpstreamError>;
    /// Resolve the user owning `access_token`; fails when the token is invalid or expired.
    async fn get_user(&self, access_token: &str) -> Result<Value, UpstreamError>;
}

#[async_trait]
pub trait TableStore: Send + Sync {
    async fn select(&self, scope: &TableScope, table: &str, filters: &Filters) -> Result<Vec<Value>, UpstreamError>;
    async fn insert(&self, scope: &TableScope, table: &str, row: &Value) -> Result<Vec<Value>, UpstreamError>;
    async fn update(
        &self,
        scope: &TableScope,
        table: &str,
        filters: &Filters,
        changes: &Value,
    ) -> Result<Vec<Value>, UpstreamError>;
    async fn delete(&self, scope: &TableScope, table: &str, filters: &Filters) -> Result<Vec<Value>, UpstreamError>;
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn upload(
        &self,
        access_token: Option<&str>,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<Value, UpstreamError>;
    async fn list(&self, access_token: Option<&str>, bucket: &str, prefix: &str) -> Result<Vec<String>, UpstreamError>;
    async fn remove(&self, access_token: Option<&str>, bucket: &str, path: &str) -> Result<(), UpstreamError>;
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn health_check(&self) -> Result<(), UpstreamError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Auth,
    Query,
    Storage,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::Auth => "auth",
            Capability::Query => "query",
            Capability::Storage => "storage",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{capability} request rejected with status {status}: {message}")]
    Status {
        capability: Capability,
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("{capability} request failed: {message}")]
    Transport { capability: Capability, message: String },
    #[error("{capability} response could not be decoded: {message}")]
    Decode { capability: Capability, message: String },
    #[error("{capability} input rejected: {message}")]
    InvalidInput { capability: Capability, message: String },
}

impl UpstreamError {
    pub fn invalid_input(capability: Capability, message: impl Into<String>) -> Self {
        UpstreamError::InvalidInput {
            capability,
            message: message.into(),
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            UpstreamError::Status { capability, .. }
            | UpstreamError::Transport { capability, .. }
            | UpstreamError::Decode { capability, .. }
            | UpstreamError::InvalidInput { capability, .. } => *capability,
        }
    }

    /// Upstream 4xx answers are the caller's fault; everything else is the provider's.
    pub fn fault(&self) -> UpstreamFault {
        match self {
            UpstreamError::InvalidInput { .. } => UpstreamFault::InvalidInput,
            UpstreamError::Status { status: 401 | 403, .. } => UpstreamFault::Rejected,
            // GoTrue answers a failed password grant with 400 invalid_grant
            UpstreamError::Status {
                capability: Capability::Auth,
                code: Some(code),
                ..
            } if code == "invalid_grant" || code == "invalid_credentials" => UpstreamFault::Rejected,
            UpstreamError::Status { status, .. } if (400..500).contains(status) => UpstreamFault::InvalidInput,
            _ => UpstreamFault::Provider,
        }
    }

    /// Transport failures and 5xx answers may succeed on a second attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::Transport { .. } => true,
            UpstreamError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The upstream's own description of the failure
    pub fn upstream_message(&self) -> &str {
        match self {
            UpstreamError::Status { message, .. }
            | UpstreamError::Transport { message, .. }
            | UpstreamError::Decode { message, .. }
            | UpstreamError::InvalidInput { message, .. } => message,
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        let fault = err.fault();
        if fault == UpstreamFault::Provider {
            tracing::error!("Upstream failure: {}", err);
        } else {
            tracing::warn!("Upstream rejected request: {}", err);
        }

        let reason = Some(err.upstream_message().to_string());
        match err.capability() {
            Capability::Auth => ApiError::UpstreamAuth {
                message: match fault {
                    UpstreamFault::Rejected => "Invalid authentication credentials",
                    UpstreamFault::InvalidInput => "Authentication request was rejected",
                    UpstreamFault::Provider => "Authentication service failed",
                }
                .to_string(),
                reason,
                fault,
            },
            Capability::Query => ApiError::UpstreamQuery {
                message: match fault {
                    UpstreamFault::Provider => "Data service failed",
                    _ => "Query was rejected",
                }
                .to_string(),
                reason,
                fault,
            },
            Capability::Storage => ApiError::UpstreamStorage {
                message: match fault {
                    UpstreamFault::Provider => "Storage service failed",
                    _ => "Storage request was rejected",
                }
                .to_string(),
                reason,
                fault,
            },
        }
    }
}
