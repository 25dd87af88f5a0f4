mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::future::join_all;
use serde_json::json;

use common::{get, test_app, test_app_with, test_config};
use tenant_gateway::tenant::{FeatureFlag, TenantConfig, TenantRegistry};

#[tokio::test]
async fn path_prefix_selects_the_tenant() -> Result<()> {
    let app = test_app();

    let (status, body) = app.send(get("/app2/api/v1/app")).await?;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["id"], "app2");
    assert_eq!(body["data"]["resolved_by"]["source"], "path");
    assert_eq!(body["data"]["features"], json!(["auth", "scheduling", "videoconference"]));
    Ok(())
}

#[tokio::test]
async fn host_subdomain_selects_the_tenant_on_the_root_mount() -> Result<()> {
    let app = test_app();

    let request = Request::builder()
        .uri("/api/v1/app")
        .header("host", "app1.yourdomain.com:8443")
        .body(Body::empty())?;
    let (status, body) = app.send(request).await?;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["data"]["id"], "app1");
    assert_eq!(body["data"]["resolved_by"]["source"], "host");
    Ok(())
}

#[tokio::test]
async fn unknown_path_tenant_is_not_found() -> Result<()> {
    let app = test_app();

    let (status, body) = app.send(get("/nosuchapp/api/v1/app")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
    assert_eq!(body["details"]["code"], "TENANT_NOT_FOUND");
    assert_eq!(body["details"]["tenant"], "nosuchapp");
    Ok(())
}

#[tokio::test]
async fn unregistered_default_tenant_is_not_found() -> Result<()> {
    let app = test_app();

    // no path tenant, no matching host: falls back to the unregistered "default"
    let (status, body) = app.send(get("/api/v1/app")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["details"]["code"], "TENANT_NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn registered_default_tenant_serves_the_root_mount() -> Result<()> {
    let mut config = test_config();
    config.api.default_tenant = "app1".to_string();
    let app = test_app_with(config, TenantRegistry::builtin(), true);

    let (status, body) = app.send(get("/api/v1/app")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], "app1");
    assert_eq!(body["data"]["resolved_by"]["source"], "default");
    Ok(())
}

#[tokio::test]
async fn re_registration_replaces_features() -> Result<()> {
    let mut registry = TenantRegistry::builtin();
    registry.register(TenantConfig::new("app1").with_features([FeatureFlag::Marketplace]));
    let app = test_app_with(test_config(), registry, true);

    let (status, _) = app.send(get("/app1/products")).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(common::json_request("POST", "/app1/checkout", json!({}))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "payments should be gone after overwrite: {}", body);
    Ok(())
}

#[tokio::test]
async fn concurrent_requests_keep_their_own_tenant() -> Result<()> {
    let app = test_app();

    let requests = (0..64).map(|i| {
        let tenant = if i % 2 == 0 { "app1" } else { "app2" };
        let router = app.router.clone();
        async move {
            let (status, body) = common::send(&router, get(&format!("/{}/api/v1/app", tenant))).await?;
            anyhow::ensure!(status == StatusCode::OK, "status {} for {}", status, tenant);
            Ok::<_, anyhow::Error>((tenant, body["data"]["id"].as_str().unwrap_or_default().to_string()))
        }
    });

    for result in join_all(requests).await {
        let (requested, observed) = result?;
        assert_eq!(requested, observed, "request for {} saw tenant {}", requested, observed);
    }
    Ok(())
}

#[tokio::test]
async fn concurrent_requests_on_spawned_tasks_keep_their_own_tenant() -> Result<()> {
    let app = test_app();

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let router = app.router.clone();
            let tenant = if i % 2 == 0 { "app1" } else { "app2" };
            tokio::spawn(async move {
                let (_, body) = common::send(&router, get(&format!("/{}/api/v1/app", tenant))).await?;
                Ok::<_, anyhow::Error>((tenant, body["data"]["id"].clone()))
            })
        })
        .collect();

    for handle in handles {
        let (requested, observed) = handle.await??;
        assert_eq!(observed, json!(requested));
    }
    Ok(())
}

#[tokio::test]
async fn root_and_health() -> Result<()> {
    let app = test_app();
    let (status, body) = app.send(get("/")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tenants"], json!(["app1", "app2"]));

    let (status, body) = app.send(get("/health")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");

    let unhealthy = test_app_with(test_config(), TenantRegistry::builtin(), false);
    let (status, body) = unhealthy.send(get("/health")).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["details"]["code"], "SERVICE_UNAVAILABLE");
    Ok(())
}

#[tokio::test]
async fn unknown_routes_use_the_error_envelope() -> Result<()> {
    let app = test_app();
    let (status, body) = app.send(get("/app1/api/v1/nothing-here")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
    Ok(())
}

#[tokio::test]
async fn cors_allows_tenant_origins_only() -> Result<()> {
    let app = test_app();

    let preflight = |origin: &str| {
        Request::builder()
            .method("OPTIONS")
            .uri("/app1/api/v1/app")
            .header("origin", origin)
            .header("access-control-request-method", "GET")
            .body(Body::empty())
            .unwrap()
    };

    let response = tower::ServiceExt::oneshot(app.router.clone(), preflight("https://app1.yourdomain.com")).await?;
    assert_eq!(
        response.headers().get("access-control-allow-origin").map(|v| v.as_bytes()),
        Some(&b"https://app1.yourdomain.com"[..])
    );

    let response = tower::ServiceExt::oneshot(app.router.clone(), preflight("https://evil.example")).await?;
    assert!(response.headers().get("access-control-allow-origin").is_none());
    Ok(())
}

#[tokio::test]
async fn wildcard_origin_setting_is_not_echoed_with_credentials() -> Result<()> {
    let mut config = test_config();
    config.security.cors_origins = vec!["*".to_string()];
    let app = test_app_with(config, TenantRegistry::builtin(), true);

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/app1/api/v1/app")
        .header("origin", "https://evil.example")
        .header("access-control-request-method", "GET")
        .body(Body::empty())?;
    let response = tower::ServiceExt::oneshot(app.router.clone(), request).await?;
    assert!(response.headers().get("access-control-allow-origin").is_none());
    Ok(())
}
