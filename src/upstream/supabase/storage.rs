use async_trait::async_trait;
use axum::body::Bytes;
use serde_json::{json, Value};

use super::SupabaseClient;
use crate::upstream::{Capability, FileStore, UpstreamError};

fn check_bucket(bucket: &str) -> Result<(), UpstreamError> {
    let valid = !bucket.is_empty()
        && bucket
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(UpstreamError::invalid_input(
            Capability::Storage,
            format!("'{}' is not a valid bucket name", bucket),
        ))
    }
}

fn check_object_path(path: &str) -> Result<(), UpstreamError> {
    if path.is_empty() || path.split('/').any(|segment| segment == "..") {
        return Err(UpstreamError::invalid_input(
            Capability::Storage,
            format!("'{}' is not a valid object path", path),
        ));
    }
    Ok(())
}

#[async_trait]
impl FileStore for SupabaseClient {
    async fn upload(
        &self,
        access_token: Option<&str>,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<Value, UpstreamError> {
        check_bucket(bucket)?;
        check_object_path(path)?;
        let url = self.endpoint(&format!("/storage/v1/object/{}/{}", bucket, path));

        let response = self
            .execute(Capability::Storage, "upload", false, || {
                self.authorize(self.http.post(&url), access_token)
                    .header("Content-Type", content_type)
                    .header("x-upsert", "false")
                    .body(bytes.clone())
            })
            .await?;
        Self::read_json(Capability::Storage, response).await
    }

    async fn list(&self, access_token: Option<&str>, bucket: &str, prefix: &str) -> Result<Vec<String>, UpstreamError> {
        check_bucket(bucket)?;
        let url = self.endpoint(&format!("/storage/v1/object/list/{}", bucket));
        let body = json!({ "prefix": prefix, "limit": 100, "offset": 0 });

        let response = self
            .execute(Capability::Storage, "list", true, || {
                self.authorize(self.http.post(&url), access_token).json(&body)
            })
            .await?;

        let entries = Self::into_rows(Self::read_json(Capability::Storage, response).await?);
        Ok(entries
            .iter()
            .filter_map(|entry| entry.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    async fn remove(&self, access_token: Option<&str>, bucket: &str, path: &str) -> Result<(), UpstreamError> {
        check_bucket(bucket)?;
        check_object_path(path)?;
        let url = self.endpoint(&format!("/storage/v1/object/{}", bucket));
        let body = json!({ "prefixes": [path] });

        self.execute(Capability::Storage, "remove", false, || {
            self.authorize(self.http.delete(&url), access_token).json(&body)
        })
        .await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.endpoint(&format!("/storage/v1/object/public/{}/{}", bucket, path))
    }
}
