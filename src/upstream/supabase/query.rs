use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde_json::Value;

use super::SupabaseClient;
use crate::upstream::{Capability, Filters, TableScope, TableStore, UpstreamError};

impl SupabaseClient {
    fn table_url(&self, table: &str) -> Result<String, UpstreamError> {
        if !is_identifier(table) {
            return Err(UpstreamError::invalid_input(
                Capability::Query,
                format!("'{}' is not a valid table name", table),
            ));
        }
        Ok(self.endpoint(&format!("/rest/v1/{}", table)))
    }

    /// Scope a PostgREST request to the tenant schema and caller token.
    fn scoped(&self, request: RequestBuilder, scope: &TableScope, writes: bool) -> RequestBuilder {
        let profile_header = if writes { "Content-Profile" } else { "Accept-Profile" };
        self.authorize(request, scope.access_token.as_deref())
            .header(profile_header, &scope.schema)
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

/// `{"status": "paid"}` → `[("status", "eq.paid")]`
fn filter_params(filters: &Filters) -> Result<Vec<(String, String)>, UpstreamError> {
    filters
        .iter()
        .map(|(column, value)| {
            if is_identifier(column) {
                Ok((column.clone(), format!("eq.{}", value)))
            } else {
                Err(UpstreamError::invalid_input(
                    Capability::Query,
                    format!("'{}' is not a valid column name", column),
                ))
            }
        })
        .collect()
}

fn require_filters(filters: &Filters, operation: &str) -> Result<(), UpstreamError> {
    if filters.is_empty() {
        return Err(UpstreamError::invalid_input(
            Capability::Query,
            format!("refusing to {} without at least one filter", operation),
        ));
    }
    Ok(())
}

#[async_trait]
impl TableStore for SupabaseClient {
    async fn select(&self, scope: &TableScope, table: &str, filters: &Filters) -> Result<Vec<Value>, UpstreamError> {
        let url = self.table_url(table)?;
        let params = filter_params(filters)?;

        let response = self
            .execute(Capability::Query, "select", true, || {
                self.scoped(self.http.get(&url), scope, false)
                    .query(&[("select", "*")])
                    .query(&params)
            })
            .await?;
        Ok(Self::into_rows(Self::read_json(Capability::Query, response).await?))
    }

    async fn insert(&self, scope: &TableScope, table: &str, row: &Value) -> Result<Vec<Value>, UpstreamError> {
        let url = self.table_url(table)?;

        let response = self
            .execute(Capability::Query, "insert", false, || {
                self.scoped(self.http.post(&url), scope, true)
                    .header("Prefer", "return=representation")
                    .json(row)
            })
            .await?;
        Ok(Self::into_rows(Self::read_json(Capability::Query, response).await?))
    }

    async fn update(
        &self,
        scope: &TableScope,
        table: &str,
        filters: &Filters,
        changes: &Value,
    ) -> Result<Vec<Value>, UpstreamError> {
        let url = self.table_url(table)?;
        require_filters(filters, "update")?;
        let params = filter_params(filters)?;

        let response = self
            .execute(Capability::Query, "update", false, || {
                self.scoped(self.http.patch(&url), scope, true)
                    .header("Prefer", "return=representation")
                    .query(&params)
                    .json(changes)
            })
            .await?;
        Ok(Self::into_rows(Self::read_json(Capability::Query, response).await?))
    }

    async fn delete(&self, scope: &TableScope, table: &str, filters: &Filters) -> Result<Vec<Value>, UpstreamError> {
        let url = self.table_url(table)?;
        require_filters(filters, "delete")?;
        let params = filter_params(filters)?;

        let response = self
            .execute(Capability::Query, "delete", false, || {
                self.scoped(self.http.delete(&url), scope, true)
                    .header("Prefer", "return=representation")
                    .query(&params)
            })
            .await?;
        Ok(Self::into_rows(Self::read_json(Capability::Query, response).await?))
    }
}
