use actix_web::{web, HttpResponse};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::openapi::Components;
use utoipa::{Modify, OpenApi};

use crate::auth::{ACCESS_KEY_ID_HEADER, ACCESS_KEY_TOKEN_HEADER};
use crate::error::{ErrorBody, ErrorEnvelope};
use crate::modules::users::models::{Permission, Role, User};

/// Security scheme names referenced by `#[utoipa::path(security(..))]` on gated handlers.
pub const ACCESS_KEY_ID_SCHEME: &str = "access_key_id";
pub const ACCESS_KEY_TOKEN_SCHEME: &str = "access_key_token";

/// OpenAPI 文档聚合
#[derive(OpenApi)]
#[openapi(
    info(title = "Panoptes", description = "Development metrics collection API"),
    servers((url = "/api/v1")),
    paths(
        crate::modules::probes::startup,
        crate::modules::users::routes::get_user,
        crate::modules::ingestion::routes::ingest_github,
    ),
    components(schemas(User, Role, Permission, ErrorEnvelope, ErrorBody)),
    modifiers(&AccessKeySecurity),
    tags(
        (name = "probes", description = "编排探针"),
        (name = "users", description = "用户查询"),
        (name = "ingestion", description = "外部事件接入"),
    )
)]
pub struct ApiDoc;

/// 两个请求头一起构成访问凭证
struct AccessKeySecurity;

impl Modify for AccessKeySecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Components::default);
        components.add_security_scheme(
            ACCESS_KEY_ID_SCHEME,
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ACCESS_KEY_ID_HEADER))),
        );
        components.add_security_scheme(
            ACCESS_KEY_TOKEN_SCHEME,
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ACCESS_KEY_TOKEN_HEADER))),
        );
    }
}

pub async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Public, no scopes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/openapi.json", web::get().to(openapi_json));
}
