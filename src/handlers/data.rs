use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::tenant::CurrentTenant;
use crate::upstream::{Filters, TableScope};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TablePath {
    pub table: String,
}

fn scope_for(tenant: &CurrentTenant, user: AuthUser) -> TableScope {
    TableScope::new(&tenant.storage_schema_name, Some(user.access_token))
}

/// GET /api/v1/data/:table - rows matching every `column=value` in the query string
pub async fn select(
    State(state): State<AppState>,
    tenant: CurrentTenant,
    Extension(user): Extension<AuthUser>,
    Path(TablePath { table }): Path<TablePath>,
    filters: Result<Query<Filters>, QueryRejection>,
) -> ApiResult<Vec<Value>> {
    let Query(filters) = filters?;
    let rows = state.tables.select(&scope_for(&tenant, user), &table, &filters).await?;
    Ok(ApiResponse::success(rows))
}

/// POST /api/v1/data/:table - insert one object or an array of objects
pub async fn insert(
    State(state): State<AppState>,
    tenant: CurrentTenant,
    Extension(user): Extension<AuthUser>,
    Path(TablePath { table }): Path<TablePath>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Vec<Value>> {
    let Json(payload) = payload?;
    let well_formed = match &payload {
        Value::Object(_) => true,
        Value::Array(rows) => !rows.is_empty() && rows.iter().all(Value::is_object),
        _ => false,
    };
    if !well_formed {
        return Err(ApiError::bad_request(
            "Body must be a JSON object or a non-empty array of objects",
        ));
    }

    let rows = state.tables.insert(&scope_for(&tenant, user), &table, &payload).await?;
    Ok(ApiResponse::created(rows))
}

/// PATCH /api/v1/data/:table - apply the body to every matching row
pub async fn update(
    State(state): State<AppState>,
    tenant: CurrentTenant,
    Extension(user): Extension<AuthUser>,
    Path(TablePath { table }): Path<TablePath>,
    filters: Result<Query<Filters>, QueryRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Vec<Value>> {
    let Query(filters) = filters?;
    let Json(changes) = payload?;
    if !changes.is_object() {
        return Err(ApiError::bad_request("Body must be a JSON object of column changes"));
    }

    let rows = state
        .tables
        .update(&scope_for(&tenant, user), &table, &filters, &changes)
        .await?;
    Ok(ApiResponse::success(rows))
}

/// DELETE /api/v1/data/:table - delete matching rows, returning them
pub async fn delete(
    State(state): State<AppState>,
    tenant: CurrentTenant,
    Extension(user): Extension<AuthUser>,
    Path(TablePath { table }): Path<TablePath>,
    filters: Result<Query<Filters>, QueryRejection>,
) -> ApiResult<Vec<Value>> {
    let Query(filters) = filters?;
    let rows = state.tables.delete(&scope_for(&tenant, user), &table, &filters).await?;
    Ok(ApiResponse::success(rows))
}
