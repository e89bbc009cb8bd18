//! 端到端：签发令牌、存储读取、HTTP 鉴权
//! End to end: issue a token, read it back, authorize HTTP calls with it

use std::sync::Arc;

use actix_web::{http::StatusCode, middleware::NormalizePath, test, App};
use serde_json::json;

use panoptes::bootstrap::{configure_api, Services, Stores};
use panoptes::comm::{HasherConfig, Verifier};
use panoptes::conf::{AppConfig, DbDriver};
use panoptes::error::NOT_AUTHORIZED_MESSAGE;
use panoptes::modules::users::access_tokens::NEVER_EXPIRES;
use panoptes::modules::users::models::{AccessToken, Role, SUPERUSER_ROLE};
use panoptes::modules::users::repo::AccessTokensRepo;
use panoptes::modules::users::{CreateUser, TokenDefinition};
use panoptes::repository::MemoryStore;

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.db.driver = DbDriver::Memory;
    config.auth.hasher = HasherConfig { work_factor: 4 };
    config
}

fn user(email: &str, role: &str) -> CreateUser {
    CreateUser {
        email: email.to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        password: "password".to_string(),
        roles: vec![role.to_string()],
    }
}

fn with_token(req: test::TestRequest, token: &AccessToken) -> test::TestRequest {
    req.insert_header(("X-Access-Key-ID", token.id.as_str()))
        .insert_header(("X-Access-Key-Token", token.secret.as_deref().unwrap_or("")))
}

#[actix_web::test]
async fn test_issue_store_verify() {
    let store = Arc::new(MemoryStore::new());
    let services = Services::with_stores(&config(), Stores::memory(store.clone())).unwrap();

    let owner = services
        .users
        .create(user("owner@example.com", SUPERUSER_ROLE))
        .await
        .unwrap();
    let token = services
        .access_tokens
        .create(TokenDefinition {
            expiry_days: 90,
            user_id: owner.id,
        })
        .await
        .unwrap();

    let stored = store.by_id(&token.id).await.unwrap().unwrap();
    assert_eq!(stored.user.id, owner.id);
    assert!(stored.user.has_role(SUPERUSER_ROLE));
    assert_eq!(stored.expire_at, token.expire_at);
    assert!(stored.secret.is_none());

    let secret = token.secret.clone().unwrap();
    assert!(services.hasher.verify(&stored.secret_hash, &secret));
    assert!(!services.hasher.verify(&stored.secret_hash, "not-the-secret"));
}

#[actix_web::test]
async fn test_http_flow() {
    let store = Arc::new(MemoryStore::new());
    store.insert_role(Role::new("collector").with_permission("ingest.github"));
    let services = Services::with_stores(&config(), Stores::memory(store.clone())).unwrap();

    let admin = services
        .users
        .create(user("admin@example.com", SUPERUSER_ROLE))
        .await
        .unwrap();
    let collector = services
        .users
        .create(user("collector@example.com", "collector"))
        .await
        .unwrap();

    let admin_token = services
        .access_tokens
        .create(TokenDefinition {
            expiry_days: NEVER_EXPIRES,
            user_id: admin.id,
        })
        .await
        .unwrap();
    let collector_token = services
        .access_tokens
        .create(TokenDefinition {
            expiry_days: 1,
            user_id: collector.id,
        })
        .await
        .unwrap();

    let app = test::init_service(
        App::new()
            .wrap(NormalizePath::trim())
            .configure(|cfg| configure_api(cfg, &services)),
    )
    .await;

    // 公开探针
    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/_probes/startup").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // superuser 可以读用户
    let req = with_token(
        test::TestRequest::get().uri(&format!("/api/v1/users/{}", collector.id)),
        &admin_token,
    )
    .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["email"], "collector@example.com");
    assert_eq!(body["roles"][0]["permissions"][0]["name"], "ingest.github");

    // 匹配的权限名不足以通过
    let req = with_token(
        test::TestRequest::post()
            .uri("/api/v1/ingestion/github")
            .insert_header(("X-GitHub-Event", "push"))
            .insert_header(("X-GitHub-Delivery", "abc-123"))
            .set_json(json!({"ref": "refs/heads/main"})),
        &collector_token,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["message"], NOT_AUTHORIZED_MESSAGE);
    assert!(store.webhooks().is_empty());

    let req = with_token(
        test::TestRequest::post()
            .uri("/api/v1/ingestion/github/")
            .insert_header(("X-GitHub-Event", "push"))
            .insert_header(("X-GitHub-Delivery", "abc-123"))
            .set_json(json!({"ref": "refs/heads/main"})),
        &admin_token,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(store.webhooks().len(), 1);

    // 错误的密钥
    let mut forged = admin_token.clone();
    forged.secret = Some("x".repeat(32));
    let req = with_token(
        test::TestRequest::get().uri(&format!("/api/v1/users/{}", admin.id)),
        &forged,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
