use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;
use crate::upstream::{Filters, TableScope, TableStore};

pub const PROFILES_TABLE: &str = "profiles";

/// Profile rows live in the tenant schema's `profiles` table, keyed by user id.
#[derive(Clone)]
pub struct ProfileService {
    tables: Arc<dyn TableStore>,
}

impl ProfileService {
    pub fn new(tables: Arc<dyn TableStore>) -> Self {
        Self { tables }
    }

    pub async fn get_profile(&self, scope: &TableScope, user_id: &str) -> Result<Value, ApiError> {
        if user_id.trim().is_empty() {
            return Err(ApiError::invalid_field("id", "Profile id cannot be empty"));
        }

        let mut filters = Filters::new();
        filters.insert("id".to_string(), user_id.to_string());

        let rows = self.tables.select(scope, PROFILES_TABLE, &filters).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found(format!("Profile '{}' not found", user_id)))
    }
}
