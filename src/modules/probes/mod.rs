//! 探针
//! Orchestrator probes; always public

use actix_web::{web, HttpResponse};

#[utoipa::path(
    get,
    path = "/_probes/startup",
    tag = "probes",
    responses((status = 204, description = "Process is up"))
)]
pub async fn startup() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/_probes/startup", web::get().to(startup));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_startup_is_204_without_credentials() {
        let app = test::init_service(App::new().configure(configure)).await;
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/_probes/startup").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
}
