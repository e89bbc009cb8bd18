use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::models::User;
use super::service::UsersService;
use crate::error::{AppError, AppResult, ErrorEnvelope};
use crate::middleware::RequireScopes;

pub const USERS_GET_SCOPE: &str = "users.get";

/// 按 ID 查询用户
/// A malformed ID is reported the same way as an unknown one.
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "用户 ID")),
    responses(
        (status = 200, description = "User with roles and permissions", body = User),
        (status = 401, description = "Not authorized", body = ErrorEnvelope),
        (status = 404, description = "Unknown or malformed ID", body = ErrorEnvelope),
    ),
    security(("access_key_id" = [], "access_key_token" = []))
)]
pub async fn get_user(
    path: web::Path<String>,
    users: web::Data<UsersService>,
) -> AppResult<HttpResponse> {
    let raw = path.into_inner();
    let id = Uuid::parse_str(&raw).map_err(|_| AppError::not_found(format!("user {}", raw)))?;

    let user = users.get(id).await?;
    Ok(HttpResponse::Ok().json(user))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/users/{id}")
            .wrap(RequireScopes::new([USERS_GET_SCOPE]))
            .route(web::get().to(get_user)),
    );
}
