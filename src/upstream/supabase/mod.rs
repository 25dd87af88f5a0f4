//! REST client for a hosted Supabase project (GoTrue, PostgREST, Storage).

mod auth;
mod query;
mod storage;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use std::time::{Duration, Instant};

use super::{Capability, HealthProbe, UpstreamError};
use crate::config::{SupabaseConfig, MAX_RETRIES};

#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.key.clone(),
            max_retries: config.max_retries.min(MAX_RETRIES),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the project key, plus the caller's token when one is given.
    fn authorize(&self, request: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(access_token.unwrap_or(&self.api_key))
    }

    /// Send a request built by `build`, logging every attempt.
    ///
    /// Idempotent calls are retried on transport errors and 5xx answers with
    /// exponential backoff; writes are sent exactly once.
    async fn execute<F>(
        &self,
        capability: Capability,
        operation: &'static str,
        idempotent: bool,
        build: F,
    ) -> Result<Response, UpstreamError>
    where
        F: Fn() -> RequestBuilder,
    {
        let attempts = if idempotent { self.max_retries.saturating_add(1) } else { 1 };
        let mut attempt = 0;

        loop {
            attempt += 1;
            let started = Instant::now();
            tracing::debug!("Calling {} {} (attempt {}/{})", capability, operation, attempt, attempts);

            let err = match build().send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(
                        "{} {} completed in {}ms",
                        capability,
                        operation,
                        started.elapsed().as_millis()
                    );
                    return Ok(response);
                }
                Ok(response) => error_from_response(capability, response).await,
                Err(e) => UpstreamError::Transport {
                    capability,
                    message: e.to_string(),
                },
            };

            if attempt >= attempts || !err.is_retryable() {
                tracing::warn!("{} {} failed after {} attempt(s): {}", capability, operation, attempt, err);
                return Err(err);
            }

            let delay = self.retry_backoff.saturating_mul(2u32.saturating_pow(attempt - 1));
            tracing::warn!("{} {} failed ({}), retrying in {:?}", capability, operation, err, delay);
            tokio::time::sleep(delay).await;
        }
    }

    async fn read_json(capability: Capability, response: Response) -> Result<Value, UpstreamError> {
        let bytes = response.bytes().await.map_err(|e| UpstreamError::Transport {
            capability,
            message: e.to_string(),
        })?;

        if bytes.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Decode {
            capability,
            message: e.to_string(),
        })
    }

    /// PostgREST and Storage return either an array or a single object; normalise to rows.
    fn into_rows(value: Value) -> Vec<Value> {
        match value {
            Value::Array(rows) => rows,
            Value::Null => Vec::new(),
            other => vec![other],
        }
    }
}

#[async_trait]
impl HealthProbe for SupabaseClient {
    async fn health_check(&self) -> Result<(), UpstreamError> {
        self.execute(Capability::Auth, "health", true, || {
            self.authorize(self.http.get(self.endpoint("/auth/v1/health")), None)
        })
        .await?;
        Ok(())
    }
}

async fn error_from_response(capability: Capability, response: Response) -> UpstreamError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let (code, message) = parse_error_body(&body);

    UpstreamError::Status {
        capability,
        status,
        code,
        message: message.unwrap_or_else(|| format!("upstream returned status {}", status)),
    }
}

/// Pull a code and message out of the various Supabase error shapes:
/// GoTrue `{error_code, msg}` / `{error, error_description}`,
/// PostgREST `{code, message}`, Storage `{error, message}`.
fn parse_error_body(body: &str) -> (Option<String>, Option<String>) {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        let trimmed = body.trim();
        return (None, (!trimmed.is_empty()).then(|| trimmed.to_string()));
    };

    let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);

    let code = text("error_code").or_else(|| text("error")).or_else(|| text("code"));
    let message = text("msg")
        .or_else(|| text("message"))
        .or_else(|| text("error_description"))
        .or_else(|| text("error"));

    (code, message)
}
