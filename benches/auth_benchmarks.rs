use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;
use uuid::Uuid;

use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue};
use panoptes::auth::{AuthorizationGate, RequiredScopes};
use panoptes::comm::{Bcrypter, HasherConfig};
use panoptes::modules::users::access_tokens::{generate_token_id, NEVER_EXPIRES};
use panoptes::modules::users::models::{Role, User, SUPERUSER_ROLE};
use panoptes::modules::users::repo::UsersRepo;
use panoptes::modules::users::{AccessTokensConfig, AccessTokensService, TokenDefinition};
use panoptes::repository::MemoryStore;

fn user_with(roles: Vec<Role>) -> User {
    User {
        id: Uuid::new_v4(),
        email: format!("{}@example.com", Uuid::new_v4()),
        first_name: "Bench".to_string(),
        last_name: "Mark".to_string(),
        password_hash: String::new(),
        roles,
    }
}

fn benchmark_capability_check(c: &mut Criterion) {
    let scopes = RequiredScopes::from(["users.get", "ingest.github"]);
    let superuser = user_with(vec![Role::new("viewer"), Role::new(SUPERUSER_ROLE)]);
    let viewer = user_with(vec![Role::new("viewer").with_permission("users.get")]);

    c.bench_function("user_can_superuser", |b| {
        b.iter(|| black_box(&superuser).can(black_box(&scopes)))
    });
    c.bench_function("user_can_viewer", |b| {
        b.iter(|| black_box(&viewer).can(black_box(&scopes)))
    });
    c.bench_function("generate_token_id", |b| b.iter(generate_token_id));
}

fn benchmark_gate(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = Arc::new(MemoryStore::new());

    for work_factor in [4u32, 10] {
        let bcrypter = Arc::new(Bcrypter::new(HasherConfig { work_factor }).unwrap());
        let user = user_with(vec![Role::new(SUPERUSER_ROLE)]);
        let token = rt.block_on(async {
            UsersRepo::create(store.as_ref(), &user).await.unwrap();
            AccessTokensService::new(
                bcrypter.clone(),
                store.clone(),
                store.clone(),
                AccessTokensConfig::default(),
            )
            .create(TokenDefinition {
                expiry_days: NEVER_EXPIRES,
                user_id: user.id,
            })
            .await
            .unwrap()
        });

        let gate = AuthorizationGate::new(store.clone(), bcrypter);
        let scopes = RequiredScopes::from(["users.get"]);
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-access-key-id"),
            HeaderValue::from_str(&token.id).unwrap(),
        );
        headers.insert(
            HeaderName::from_static("x-access-key-token"),
            HeaderValue::from_str(token.secret.as_deref().unwrap()).unwrap(),
        );

        c.bench_function(&format!("gate_authorize_cost_{}", work_factor), |b| {
            b.iter(|| {
                rt.block_on(async {
                    gate.authorize(black_box(&headers), black_box(&scopes))
                        .await
                        .unwrap()
                })
            })
        });
    }
}

criterion_group!(benches, benchmark_capability_check, benchmark_gate);
criterion_main!(benches);
