//! Intake endpoint tests: signature checks, dedup, topic validation.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use shopsync_engine::{
    ConflictDetector, EngineConfig, InMemoryAuthority, InMemoryPlatform, LockRegistry,
    Orchestrator, Reconciler,
};
use shopsync_store::{JobStatus, Stores, Tenant};
use shopsync_webhooks::{
    compute_signature, webhooks_router, WebhookAdapter, WebhooksState,
};
use shopsync_webhooks::router::{SIGNATURE_HEADER, TENANT_HEADER, TOPIC_HEADER};

struct Env {
    stores: Stores,
    tenant: Tenant,
    router: axum::Router,
}

fn env() -> Env {
    let config = EngineConfig::default();
    let stores = Stores::new();
    let platform = Arc::new(InMemoryPlatform::new());
    let authority = Arc::new(InMemoryAuthority::new());
    let detector = Arc::new(ConflictDetector::new(stores.conflicts.clone()));
    let locks = Arc::new(LockRegistry::new());
    let reconciler = Arc::new(Reconciler::new(
        platform.clone(),
        authority,
        stores.clone(),
        detector,
        locks,
        config.clone(),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        stores.clone(),
        reconciler,
        platform,
        config,
    ));
    let tenant = Tenant::new("frames.example.com", "topsecret");
    let adapter = Arc::new(WebhookAdapter::new(stores.tenants.clone(), orchestrator));
    let router = webhooks_router(WebhooksState { adapter });
    Env {
        stores,
        tenant,
        router,
    }
}

async fn seed_tenant(env: &Env) {
    env.stores.tenants.insert(env.tenant.clone()).await.unwrap();
}

fn request(env: &Env, topic: &str, body: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhooks/intake")
        .header(TOPIC_HEADER, topic)
        .header(TENANT_HEADER, env.tenant.id.to_string())
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn signed_request(env: &Env, topic: &str, body: &str) -> Request<Body> {
    let signature = compute_signature(&env.tenant.webhook_secret, body.as_bytes());
    request(env, topic, body, &signature)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_valid_delivery_enqueues_job() {
    let env = env();
    seed_tenant(&env).await;

    let response = env
        .router
        .clone()
        .oneshot(signed_request(
            &env,
            "products/update",
            r#"{"id": "P1", "title": "Aviator Gold"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "accepted");
    let job_id = body["job_id"].as_str().unwrap().parse().unwrap();
    let job = env.stores.jobs.get(job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.targets.len(), 1);
    assert_eq!(job.targets[0].platform_id, "P1");
}

#[tokio::test]
async fn test_bad_signature_rejected_without_job() {
    let env = env();
    seed_tenant(&env).await;

    let response = env
        .router
        .clone()
        .oneshot(request(
            &env,
            "products/update",
            r#"{"id": "P1"}"#,
            "deadbeef",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = json_body(response).await;
    assert_eq!(body["error"], "invalid_signature");
    assert!(env.stores.jobs.list(env.tenant.id, None, 10).await.is_empty());
}

#[tokio::test]
async fn test_duplicate_delivery_creates_one_job() {
    let env = env();
    seed_tenant(&env).await;

    let body = r#"{"id": "P1", "title": "Aviator Gold"}"#;
    let first = env
        .router
        .clone()
        .oneshot(signed_request(&env, "products/update", body))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = env
        .router
        .clone()
        .oneshot(signed_request(&env, "products/update", body))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let payload = json_body(second).await;
    assert_eq!(payload["status"], "duplicate");
    assert!(payload["job_id"].is_null());

    assert_eq!(env.stores.jobs.list(env.tenant.id, None, 10).await.len(), 1);
}

#[tokio::test]
async fn test_other_tenants_identical_delivery_is_not_suppressed() {
    let env = env();
    seed_tenant(&env).await;
    let other = Tenant::new("lenses.example.com", "topsecret");
    env.stores.tenants.insert(other.clone()).await.unwrap();

    let body = r#"{"id": "P1", "title": "Aviator Gold"}"#;
    let first = env
        .router
        .clone()
        .oneshot(signed_request(&env, "products/update", body))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    // Same topic, resource id and payload, different tenant: real work.
    let signature = compute_signature(&other.webhook_secret, body.as_bytes());
    let second = env
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/intake")
                .header(TOPIC_HEADER, "products/update")
                .header(TENANT_HEADER, other.id.to_string())
                .header(SIGNATURE_HEADER, signature)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let payload = json_body(second).await;
    assert_eq!(payload["status"], "accepted");
    assert_eq!(env.stores.jobs.list(other.id, None, 10).await.len(), 1);
}

#[tokio::test]
async fn test_changed_payload_is_not_a_duplicate() {
    let env = env();
    seed_tenant(&env).await;

    for body in [
        r#"{"id": "P1", "title": "Aviator Gold"}"#,
        r#"{"id": "P1", "title": "Aviator Silver"}"#,
    ] {
        let response = env
            .router
            .clone()
            .oneshot(signed_request(&env, "products/update", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(env.stores.jobs.list(env.tenant.id, None, 10).await.len(), 2);
}

#[tokio::test]
async fn test_unknown_topic_rejected() {
    let env = env();
    seed_tenant(&env).await;

    let response = env
        .router
        .clone()
        .oneshot(signed_request(&env, "orders/create", r#"{"id": "O1"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "unknown_topic");
}

#[tokio::test]
async fn test_uninstall_deactivates_tenant() {
    let env = env();
    seed_tenant(&env).await;

    let response = env
        .router
        .clone()
        .oneshot(signed_request(
            &env,
            "app/uninstalled",
            r#"{"shop_domain": "frames.example.com"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "tenant_deactivated");

    let tenant = env.stores.tenants.get(env.tenant.id).await.unwrap();
    assert!(!tenant.active);
    assert!(env.stores.jobs.list(env.tenant.id, None, 10).await.is_empty());
}

#[tokio::test]
async fn test_unknown_tenant_rejected() {
    let env = env();
    // Tenant never inserted.
    let response = env
        .router
        .clone()
        .oneshot(signed_request(&env, "products/update", r#"{"id": "P1"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "tenant_unavailable");
}
