//! JSON error bodies for the ErrorHandlers middleware.

use actix_web::dev::ServiceResponse;
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::{HttpResponse, Result};

pub fn render_400<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    Ok(render_json(res, "bad request"))
}

pub fn render_404<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    Ok(render_json(res, "not found"))
}

pub fn render_500<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    Ok(render_json(res, "internal server error"))
}

fn render_json<B>(res: ServiceResponse<B>, message: &str) -> ErrorHandlerResponse<B> {
    let (req, res) = res.into_parts();
    let status = res.status();

    let body = serde_json::json!({
        "status": status.as_u16(),
        "error": message,
    })
    .to_string();

    let res = HttpResponse::build(status)
        .content_type("application/json")
        .body(body);

    ErrorHandlerResponse::Response(ServiceResponse::new(req, res).map_into_right_body())
}
