use axum::extract::{Extension, State};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::tenant::{CurrentTenant, FeatureFlag, Resolution, TenantLimits};
use crate::AppState;
use std::collections::BTreeMap;

/// What a client learns about the tenant it is talking to.
#[derive(Debug, Serialize)]
pub struct AppInfo {
    pub id: String,
    pub display_name: String,
    pub features: Vec<FeatureFlag>,
    pub api_prefix: String,
    pub theme: BTreeMap<String, String>,
    pub limits: TenantLimits,
    pub resolved_by: Option<Resolution>,
}

/// GET /
pub async fn root(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "tenants": state.registry.ids(),
    })))
}

/// GET /health - 503 when the upstream does not answer
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    match state.health.health_check().await {
        Ok(()) => Ok(ApiResponse::success(json!({
            "status": "healthy",
            "upstream": "reachable",
            "timestamp": chrono::Utc::now(),
        }))),
        Err(err) => {
            tracing::warn!("Health check failed: {}", err);
            Err(ApiError::service_unavailable("Upstream service is unreachable"))
        }
    }
}

/// GET /api/v1/app
pub async fn app_info(tenant: CurrentTenant, resolution: Option<Extension<Resolution>>) -> ApiResult<AppInfo> {
    Ok(ApiResponse::success(AppInfo {
        id: tenant.id.clone(),
        display_name: tenant.display_name.clone(),
        features: tenant.enabled_features.iter().copied().collect(),
        api_prefix: tenant.api_path_prefix.clone(),
        theme: tenant.theme.clone(),
        limits: tenant.limits.clone(),
        resolved_by: resolution.map(|Extension(resolution)| resolution),
    }))
}
