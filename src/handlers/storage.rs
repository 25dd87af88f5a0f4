// handlers/storage.rs - object storage under the tenant's own key prefix
//
// Every object key is `<storage_schema_name>/<path>`, so two tenants sharing a
// bucket never see each other's files.

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Extension, Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap},
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::tenant::CurrentTenant;
use crate::upstream::{Capability, UpstreamError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BucketPath {
    pub bucket: String,
}

#[derive(Debug, Deserialize)]
pub struct ObjectPath {
    pub bucket: String,
    pub path: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub prefix: String,
}

/// `..` segments are refused so a path can never climb out of the tenant prefix.
fn object_key(tenant: &CurrentTenant, path: &str) -> Result<String, UpstreamError> {
    if path.split('/').any(|segment| segment == "..") {
        return Err(UpstreamError::invalid_input(
            Capability::Storage,
            format!("'{}' is not a valid object path", path),
        ));
    }
    Ok(format!("{}/{}", tenant.storage_schema_name, path.trim_start_matches('/')))
}

/// GET /api/v1/storage/:bucket - names under the tenant prefix (`?prefix=` narrows further)
pub async fn list(
    State(state): State<AppState>,
    tenant: CurrentTenant,
    Extension(user): Extension<AuthUser>,
    Path(BucketPath { bucket }): Path<BucketPath>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<String>> {
    let Query(query) = query?;
    let prefix = object_key(&tenant, &query.prefix)?;
    let names = state.files.list(Some(&user.access_token), &bucket, &prefix).await?;
    Ok(ApiResponse::success(names))
}

/// PUT /api/v1/storage/:bucket/*path - upload the raw request body
pub async fn upload(
    State(state): State<AppState>,
    tenant: CurrentTenant,
    Extension(user): Extension<AuthUser>,
    Path(ObjectPath { bucket, path }): Path<ObjectPath>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Value> {
    if let Some(limit) = tenant.limits.storage_limit_bytes {
        if body.len() as u64 > limit {
            return Err(UpstreamError::invalid_input(
                Capability::Storage,
                format!("Upload of {} bytes exceeds the {} byte limit", body.len(), limit),
            )
            .into());
        }
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let key = object_key(&tenant, &path)?;
    let size = body.len();

    let stored = state
        .files
        .upload(Some(&user.access_token), &bucket, &key, &content_type, body)
        .await?;
    tracing::info!("Stored {} bytes at {}/{} for tenant '{}'", size, bucket, key, tenant.id());

    Ok(ApiResponse::created(json!({
        "key": key,
        "public_url": state.files.public_url(&bucket, &key),
        "upstream": stored,
    })))
}

/// DELETE /api/v1/storage/:bucket/*path
pub async fn remove(
    State(state): State<AppState>,
    tenant: CurrentTenant,
    Extension(user): Extension<AuthUser>,
    Path(ObjectPath { bucket, path }): Path<ObjectPath>,
) -> ApiResult<Value> {
    let key = object_key(&tenant, &path)?;
    state.files.remove(Some(&user.access_token), &bucket, &key).await?;
    Ok(ApiResponse::success(json!({ "deleted": key })))
}
