use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::Value;
use tracing::info;

use super::github::{GithubEvent, GithubIngestor};
use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult, ErrorEnvelope};
use crate::middleware::RequireScopes;

pub const INGEST_GITHUB_SCOPE: &str = "ingest.github";

pub const GITHUB_EVENT_HEADER: &str = "X-GitHub-Event";
pub const GITHUB_DELIVERY_HEADER: &str = "X-GitHub-Delivery";

fn required_header(req: &HttpRequest, name: &str) -> AppResult<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::validation(name, "header is required"))
}

/// 接收 GitHub webhook
#[utoipa::path(
    post,
    path = "/ingestion/github",
    tag = "ingestion",
    params(
        ("X-GitHub-Event" = String, Header, description = "GitHub 事件类型"),
        ("X-GitHub-Delivery" = String, Header, description = "GitHub 投递 ID"),
    ),
    request_body(content = Object, description = "Webhook payload, stored as is"),
    responses(
        (status = 204, description = "Payload stored"),
        (status = 400, description = "Missing GitHub header or malformed JSON", body = ErrorEnvelope),
        (status = 401, description = "Not authorized", body = ErrorEnvelope),
    ),
    security(("access_key_id" = [], "access_key_token" = []))
)]
pub async fn ingest_github(
    req: HttpRequest,
    body: web::Json<Value>,
    ingestor: web::Data<GithubIngestor>,
    caller: Option<web::ReqData<AuthenticatedUser>>,
) -> AppResult<HttpResponse> {
    let event = required_header(&req, GITHUB_EVENT_HEADER)?;
    let delivery_id = required_header(&req, GITHUB_DELIVERY_HEADER)?;

    let id = ingestor
        .process(GithubEvent {
            event,
            delivery_id,
            payload: body.into_inner(),
        })
        .await?;

    info!(
        webhook_id = %id,
        caller = ?caller.map(|c| c.user.id),
        "github webhook ingested"
    );
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/ingestion/github")
            .wrap(RequireScopes::new([INGEST_GITHUB_SCOPE]))
            .route(web::post().to(ingest_github)),
    );
}
