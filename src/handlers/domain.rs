// handlers/domain.rs - feature-gated product routes
//
// Each route sits behind `require_feature`, so a tenant without the flag is
// turned away before any of these bodies (and their writes) run.

use axum::{body::Bytes, extract::State, http::HeaderMap};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::auth::extract_bearer_token;
use crate::middleware::{ApiResponse, ApiResult};
use crate::tenant::CurrentTenant;
use crate::upstream::{Filters, TableScope};
use crate::AppState;

/// Callers may be anonymous here; a bearer token, when sent, is forwarded as-is.
fn scope_for(tenant: &CurrentTenant, headers: &HeaderMap) -> TableScope {
    TableScope::new(&tenant.storage_schema_name, extract_bearer_token(headers).ok())
}

/// Empty body is an empty object.
fn parse_object(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))?;
    if !value.is_object() {
        return Err(ApiError::bad_request("Body must be a JSON object"));
    }
    Ok(value)
}

/// GET /products - MARKETPLACE
pub async fn list_products(State(state): State<AppState>, tenant: CurrentTenant, headers: HeaderMap) -> ApiResult<Value> {
    let products = state
        .tables
        .select(&scope_for(&tenant, &headers), "products", &Filters::new())
        .await?;
    Ok(ApiResponse::success(json!({ "products": products, "app": tenant.id() })))
}

/// POST /checkout - PAYMENTS
pub async fn checkout(
    State(state): State<AppState>,
    tenant: CurrentTenant,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Value> {
    let order = parse_object(&body)?;
    let created = state.tables.insert(&scope_for(&tenant, &headers), "orders", &order).await?;
    tracing::info!("Checkout completed for tenant '{}'", tenant.id());
    Ok(ApiResponse::success(json!({ "order": created.into_iter().next(), "app": tenant.id() }))
        .with_message("Checkout processed"))
}

/// GET /courses - SCHEDULING
pub async fn list_courses(State(state): State<AppState>, tenant: CurrentTenant, headers: HeaderMap) -> ApiResult<Value> {
    let courses = state
        .tables
        .select(&scope_for(&tenant, &headers), "courses", &Filters::new())
        .await?;
    Ok(ApiResponse::success(json!({ "courses": courses, "app": tenant.id() })))
}

/// POST /schedule - VIDEOCONFERENCE
pub async fn schedule_session(
    State(state): State<AppState>,
    tenant: CurrentTenant,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Value> {
    let session = parse_object(&body)?;
    let created = state
        .tables
        .insert(&scope_for(&tenant, &headers), "sessions", &session)
        .await?;
    tracing::info!("Session scheduled for tenant '{}'", tenant.id());
    Ok(ApiResponse::success(json!({
        "session": created.into_iter().next(),
        "scheduled": true,
        "app": tenant.id(),
    })))
}
