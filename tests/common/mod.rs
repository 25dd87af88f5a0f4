#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::body::{to_bytes, Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use tenant_gateway::config::AppConfig;
use tenant_gateway::tenant::TenantRegistry;
use tenant_gateway::upstream::{
    AuthProvider, Capability, Credentials, FileStore, Filters, HealthProbe, TableScope, TableStore, UpstreamError,
};
use tenant_gateway::{app, AppState};

pub const VALID_TOKEN: &str = "valid-token";
pub const PASSWORD: &str = "correct-horse";

/// Identity provider that knows one user and one token.
#[derive(Default)]
pub struct FakeAuth {
    pub calls: AtomicUsize,
}

impl FakeAuth {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn rejected(status: u16, code: &str, message: &str) -> UpstreamError {
    UpstreamError::Status {
        capability: Capability::Auth,
        status,
        code: Some(code.to_string()),
        message: message.to_string(),
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn sign_up(&self, credentials: &Credentials) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "id": "user-2", "email": credentials.email }))
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if credentials.password == PASSWORD {
            Ok(json!({ "access_token": VALID_TOKEN, "refresh_token": "refresh-1", "token_type": "bearer" }))
        } else {
            Err(rejected(400, "invalid_grant", "Invalid login credentials"))
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if refresh_token == "refresh-1" {
            Ok(json!({ "access_token": VALID_TOKEN, "refresh_token": "refresh-2" }))
        } else {
            Err(rejected(400, "invalid_grant", "Invalid Refresh Token"))
        }
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if access_token == VALID_TOKEN {
            Ok(json!({ "id": "user-1", "email": "ada@example.com", "role": "authenticated" }))
        } else {
            Err(rejected(401, "bad_jwt", "invalid JWT"))
        }
    }
}

/// Every write the tables fake received.
#[derive(Debug, Clone, PartialEq)]
pub struct Write {
    pub op: &'static str,
    pub schema: String,
    pub table: String,
    pub body: Value,
    pub access_token: Option<String>,
}

/// In-memory tables keyed by `(schema, table)`.
#[derive(Default)]
pub struct FakeTables {
    rows: Mutex<HashMap<(String, String), Vec<Value>>>,
    writes: Mutex<Vec<Write>>,
}

impl FakeTables {
    pub fn seed(&self, schema: &str, table: &str, row: Value) {
        self.rows
            .lock()
            .unwrap()
            .entry((schema.to_string(), table.to_string()))
            .or_default()
            .push(row);
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    fn record(&self, op: &'static str, scope: &TableScope, table: &str, body: Value) {
        self.writes.lock().unwrap().push(Write {
            op,
            schema: scope.schema.clone(),
            table: table.to_string(),
            body,
            access_token: scope.access_token.clone(),
        });
    }

    fn matches(row: &Value, filters: &Filters) -> bool {
        filters.iter().all(|(column, expected)| match row.get(column) {
            Some(Value::String(s)) => s == expected,
            Some(other) => other.to_string() == *expected,
            None => false,
        })
    }
}

#[async_trait]
impl TableStore for FakeTables {
    async fn select(&self, scope: &TableScope, table: &str, filters: &Filters) -> Result<Vec<Value>, UpstreamError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .get(&(scope.schema.clone(), table.to_string()))
            .map(|rows| rows.iter().filter(|row| Self::matches(row, filters)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, scope: &TableScope, table: &str, row: &Value) -> Result<Vec<Value>, UpstreamError> {
        self.record("insert", scope, table, row.clone());
        let inserted = match row {
            Value::Array(rows) => rows.clone(),
            other => vec![other.clone()],
        };
        let mut rows = self.rows.lock().unwrap();
        rows.entry((scope.schema.clone(), table.to_string()))
            .or_default()
            .extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn update(
        &self,
        scope: &TableScope,
        table: &str,
        filters: &Filters,
        changes: &Value,
    ) -> Result<Vec<Value>, UpstreamError> {
        if filters.is_empty() {
            return Err(UpstreamError::invalid_input(Capability::Query, "refusing to update without at least one filter"));
        }
        self.record("update", scope, table, changes.clone());
        let mut rows = self.rows.lock().unwrap();
        let mut updated = Vec::new();
        if let Some(rows) = rows.get_mut(&(scope.schema.clone(), table.to_string())) {
            for row in rows.iter_mut().filter(|row| Self::matches(row, filters)) {
                if let (Value::Object(target), Value::Object(changes)) = (&mut *row, changes) {
                    target.extend(changes.clone());
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, scope: &TableScope, table: &str, filters: &Filters) -> Result<Vec<Value>, UpstreamError> {
        if filters.is_empty() {
            return Err(UpstreamError::invalid_input(Capability::Query, "refusing to delete without at least one filter"));
        }
        self.record("delete", scope, table, json!(filters));
        let mut rows = self.rows.lock().unwrap();
        let mut removed = Vec::new();
        if let Some(rows) = rows.get_mut(&(scope.schema.clone(), table.to_string())) {
            rows.retain(|row| {
                let hit = Self::matches(row, filters);
                if hit {
                    removed.push(row.clone());
                }
                !hit
            });
        }
        Ok(removed)
    }
}

#[derive(Default)]
pub struct FakeFiles {
    objects: Mutex<HashMap<(String, String), Bytes>>,
}

impl FakeFiles {
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .map(|(bucket, path)| format!("{}/{}", bucket, path))
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl FileStore for FakeFiles {
    async fn upload(
        &self,
        _access_token: Option<&str>,
        bucket: &str,
        path: &str,
        _content_type: &str,
        bytes: Bytes,
    ) -> Result<Value, UpstreamError> {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), path.to_string()), bytes);
        Ok(json!({ "Key": format!("{}/{}", bucket, path) }))
    }

    async fn list(&self, _access_token: Option<&str>, bucket: &str, prefix: &str) -> Result<Vec<String>, UpstreamError> {
        let objects = self.objects.lock().unwrap();
        let mut names: Vec<String> = objects
            .keys()
            .filter(|(b, path)| b == bucket && path.starts_with(prefix))
            .map(|(_, path)| path.trim_start_matches(prefix).trim_start_matches('/').to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn remove(&self, _access_token: Option<&str>, bucket: &str, path: &str) -> Result<(), UpstreamError> {
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), path.to_string()));
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("http://storage.test/public/{}/{}", bucket, path)
    }
}

pub struct FakeHealth(pub bool);

#[async_trait]
impl HealthProbe for FakeHealth {
    async fn health_check(&self) -> Result<(), UpstreamError> {
        if self.0 {
            Ok(())
        } else {
            Err(UpstreamError::Transport {
                capability: Capability::Auth,
                message: "connection refused".to_string(),
            })
        }
    }
}

/// The gateway wired to in-memory fakes, with handles for inspecting them.
pub struct TestApp {
    pub router: Router,
    pub auth: Arc<FakeAuth>,
    pub tables: Arc<FakeTables>,
    pub files: Arc<FakeFiles>,
}

pub fn test_config() -> AppConfig {
    AppConfig::for_upstream("http://127.0.0.1:9", "test-anon-key-0123456789")
}

pub fn test_app() -> TestApp {
    test_app_with(test_config(), TenantRegistry::builtin(), true)
}

pub fn test_app_with(config: AppConfig, registry: TenantRegistry, healthy: bool) -> TestApp {
    let auth = Arc::new(FakeAuth::default());
    let tables = Arc::new(FakeTables::default());
    let files = Arc::new(FakeFiles::default());

    let state = AppState::new(
        config,
        registry,
        auth.clone(),
        tables.clone(),
        files.clone(),
        Arc::new(FakeHealth(healthy)),
    );

    TestApp {
        router: app(state),
        auth,
        tables,
        files,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        send(&self.router, request).await
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).context("response body is not JSON")?
    };
    Ok((status, body))
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_authed(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {}", VALID_TOKEN))
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn json_request_authed(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", VALID_TOKEN))
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// A real listener on an ephemeral port, for tests that go through reqwest.
pub struct TestServer {
    pub base_url: String,
    pub addr: SocketAddr,
}

pub async fn spawn_server(router: Router) -> Result<TestServer> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>()).await;
    });
    Ok(TestServer {
        base_url: format!("http://{}", addr),
        addr,
    })
}
