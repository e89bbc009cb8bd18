//! 调试模式下在 500 响应中附带错误详情
//! Attaches the underlying error to 500 responses when `api.server.debug_errors_enabled`
//! is set. Denials are never touched.

use actix_web::{
    body::{BoxBody, EitherBody},
    dev::ServiceResponse,
    http::StatusCode,
    middleware::{ErrorHandlerResponse, ErrorHandlers},
    HttpResponse, Result,
};
use crate::error::{ErrorEnvelope, INTERNAL_ERROR_CODE, INTERNAL_ERROR_MESSAGE};

pub fn debug_errors<B: 'static>() -> ErrorHandlers<B> {
    ErrorHandlers::new().handler(StatusCode::INTERNAL_SERVER_ERROR, add_error_details)
}

fn add_error_details<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    let Some(details) = res.response().error().map(|e| e.to_string()) else {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    };

    let (req, res) = res.into_parts();
    let envelope =
        ErrorEnvelope::new(INTERNAL_ERROR_CODE, INTERNAL_ERROR_MESSAGE).with_details(details);
    let replacement: HttpResponse<BoxBody> = HttpResponse::build(res.status()).json(envelope);

    let res: ServiceResponse<EitherBody<B, BoxBody>> =
        ServiceResponse::new(req, replacement).map_into_right_body();
    Ok(ErrorHandlerResponse::Response(res))
}
