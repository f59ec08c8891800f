//! Service banner endpoint

use crate::app_config;
use actix_web::{get, HttpResponse, Responder};
use serde::Serialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_index);
}

#[derive(Serialize)]
struct Banner {
    name: String,
    description: String,
    version: &'static str,
}

#[get("/")]
async fn view_index() -> impl Responder {
    let site = app_config::site();

    HttpResponse::Ok().json(Banner {
        name: site.name,
        description: site.description,
        version: env!("CARGO_PKG_VERSION"),
    })
}
