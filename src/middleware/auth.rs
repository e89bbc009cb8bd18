use actix_web::{
    body::BoxBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage, ResponseError,
};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use tracing::debug;

use crate::auth::{Access, AuthorizationGate, RequiredScopes};
use crate::error::AppError;

/// 权限范围中间件
///
/// Attach per resource or scope with the scopes that route requires. The
/// [`AuthorizationGate`] is taken from app data; on success the caller's
/// [`AuthenticatedUser`](crate::auth::AuthenticatedUser) is put into request extensions,
/// so handlers can take `web::ReqData<AuthenticatedUser>`.
#[derive(Debug, Clone)]
pub struct RequireScopes {
    scopes: Rc<RequiredScopes>,
}

impl RequireScopes {
    pub fn new(scopes: impl Into<RequiredScopes>) -> Self {
        Self {
            scopes: Rc::new(scopes.into()),
        }
    }
}

impl<S> Transform<S, ServiceRequest> for RequireScopes
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = RequireScopesService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireScopesService {
            service: Rc::new(service),
            scopes: self.scopes.clone(),
        }))
    }
}

pub struct RequireScopesService<S> {
    service: Rc<S>,
    scopes: Rc<RequiredScopes>,
}

impl<S> Service<ServiceRequest> for RequireScopesService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let scopes = self.scopes.clone();

        Box::pin(async move {
            let gate = match req.app_data::<web::Data<AuthorizationGate>>() {
                Some(gate) => gate.clone(),
                None => {
                    let err = AppError::Internal(anyhow::anyhow!(
                        "authorization gate not registered for {}",
                        req.path()
                    ));
                    return Ok(req.into_response(err.error_response()).map_into_boxed_body());
                }
            };

            debug!("鉴权检查: {} {} {}", req.method(), req.path(), scopes);

            let decision = gate.authorize(req.headers(), &scopes).await;
            match decision {
                Ok(Access::Public) => service.call(req).await,
                Ok(Access::Granted(user)) => {
                    req.extensions_mut().insert(user);
                    service.call(req).await
                }
                Err(err) => Ok(req.into_response(err.error_response()).map_into_boxed_body()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticatedUser;
    use crate::comm::{Bcrypter, HasherConfig};
    use crate::error::NOT_AUTHORIZED_MESSAGE;
    use crate::modules::users::access_tokens::{
        AccessTokensConfig, AccessTokensService, TokenDefinition, NEVER_EXPIRES,
    };
    use crate::modules::users::models::{AccessToken, AccessTokenRecord, Role, User, SUPERUSER_ROLE};
    use crate::modules::users::repo::{AccessTokensRepo, UsersRepo};
    use crate::repository::error::Result as StoreResult;
    use crate::repository::{MemoryStore, StoreError};
    use actix_web::{http::StatusCode, test, App, HttpResponse};
    use async_trait::async_trait;
    use std::sync::Arc;
    use uuid::Uuid;

    async fn whoami(user: web::ReqData<AuthenticatedUser>) -> HttpResponse {
        HttpResponse::Ok().json(serde_json::json!({ "user_id": user.user.id }))
    }

    async fn open() -> HttpResponse {
        HttpResponse::NoContent().finish()
    }

    struct Setup {
        gate: web::Data<AuthorizationGate>,
        superuser: (User, AccessToken),
        viewer: (User, AccessToken),
    }

    async fn setup() -> Setup {
        let store = Arc::new(MemoryStore::new());
        let bcrypter = Arc::new(Bcrypter::new(HasherConfig { work_factor: 4 }).unwrap());
        let issuer = AccessTokensService::new(
            bcrypter.clone(),
            store.clone(),
            store.clone(),
            AccessTokensConfig::default(),
        );

        let mut issued = Vec::new();
        for role in [
            Role::new(SUPERUSER_ROLE),
            Role::new("viewer").with_permission("users.get"),
        ] {
            let user = User {
                id: Uuid::new_v4(),
                email: format!("{}@example.com", role.name),
                first_name: "Barbara".to_string(),
                last_name: "Liskov".to_string(),
                password_hash: "x".to_string(),
                roles: vec![role],
            };
            UsersRepo::create(store.as_ref(), &user).await.unwrap();
            let token = issuer
                .create(TokenDefinition {
                    expiry_days: NEVER_EXPIRES,
                    user_id: user.id,
                })
                .await
                .unwrap();
            issued.push((user, token));
        }
        let viewer = issued.pop().unwrap();
        let superuser = issued.pop().unwrap();

        Setup {
            gate: web::Data::new(AuthorizationGate::new(store, bcrypter)),
            superuser,
            viewer,
        }
    }

    fn with_token(req: test::TestRequest, token: &AccessToken) -> test::TestRequest {
        req.insert_header(("X-Access-Key-ID", token.id.as_str()))
            .insert_header(("X-Access-Key-Token", token.secret.as_deref().unwrap_or("")))
    }

    #[actix_web::test]
    async fn test_granted_request_sees_user() {
        let s = setup().await;
        let app = test::init_service(
            App::new().app_data(s.gate.clone()).service(
                web::resource("/whoami")
                    .wrap(RequireScopes::new(["users.get"]))
                    .route(web::get().to(whoami)),
            ),
        )
        .await;

        let req = with_token(test::TestRequest::get().uri("/whoami"), &s.superuser.1).to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["user_id"], s.superuser.0.id.to_string());
    }

    #[actix_web::test]
    async fn test_public_route_needs_no_headers() {
        let s = setup().await;
        let app = test::init_service(
            App::new().app_data(s.gate.clone()).service(
                web::resource("/open")
                    .wrap(RequireScopes::new(RequiredScopes::public()))
                    .route(web::get().to(open)),
            ),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/open").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn test_authentication_and_authorization_look_identical() {
        let s = setup().await;
        let app = test::init_service(
            App::new().app_data(s.gate.clone()).service(
                web::resource("/whoami")
                    .wrap(RequireScopes::new(["users.get"]))
                    .route(web::get().to(whoami)),
            ),
        )
        .await;

        let strip = |mut v: serde_json::Value| {
            v.as_object_mut().unwrap().remove("timestamp");
            v
        };

        // 无凭证
        let resp = test::call_service(&app, test::TestRequest::get().uri("/whoami").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let unauthenticated = strip(test::read_body_json(resp).await);

        // 有效凭证但不是 superuser
        let req = with_token(test::TestRequest::get().uri("/whoami"), &s.viewer.1).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let unauthorized = strip(test::read_body_json(resp).await);

        assert_eq!(unauthenticated, unauthorized);
        assert_eq!(unauthorized["error"]["message"], NOT_AUTHORIZED_MESSAGE);
        assert_eq!(unauthorized["success"], false);
    }

    #[actix_web::test]
    async fn test_store_failure_is_500() {
        struct BrokenRepo;

        #[async_trait]
        impl AccessTokensRepo for BrokenRepo {
            async fn by_id(&self, _id: &str) -> StoreResult<Option<AccessToken>> {
                Err(StoreError::Sqlx(sqlx::Error::PoolClosed))
            }
            async fn create(&self, _record: &AccessTokenRecord) -> StoreResult<()> {
                Err(StoreError::Sqlx(sqlx::Error::PoolClosed))
            }
        }

        let bcrypter = Arc::new(Bcrypter::new(HasherConfig { work_factor: 4 }).unwrap());
        let gate = web::Data::new(AuthorizationGate::new(Arc::new(BrokenRepo), bcrypter));
        let app = test::init_service(
            App::new().app_data(gate).service(
                web::resource("/whoami")
                    .wrap(RequireScopes::new(["users.get"]))
                    .route(web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("X-Access-Key-ID", "PAT_aaaaaaaaaaaaaaaa"))
            .insert_header(("X-Access-Key-Token", "secret"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_missing_gate_is_500() {
        let app = test::init_service(
            App::new().service(
                web::resource("/whoami")
                    .wrap(RequireScopes::new(["users.get"]))
                    .route(web::get().to(whoami)),
            ),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/whoami").to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
