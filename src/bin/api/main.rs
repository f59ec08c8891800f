use actix_web::http::header;
use actix_web::http::StatusCode;
use actix_web::middleware::{DefaultHeaders, ErrorHandlers, Logger};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use env_logger::Env;
use notestock::config::create_config;
use notestock::db::{get_db_pool, init_db};
use notestock::identity::{HttpIdentityProvider, IdentityProvider};
use notestock::middleware::ClientCtx;
use notestock::token::{TokenSource, UuidTokenSource};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_lib_mods();
    init_our_mods();
    init_db(std::env::var("DATABASE_URL").expect("DATABASE_URL must be set.")).await;

    // Load runtime settings and feature flags from the database
    let config = create_config();
    config
        .load_from_database(get_db_pool())
        .await
        .expect("Failed to load configuration from database");

    let identity_config = notestock::app_config::identity();
    let userinfo_url = url::Url::parse(&identity_config.userinfo_url)
        .expect("identity.userinfo_url must be a valid URL");
    let provider: Arc<dyn IdentityProvider> = Arc::new(HttpIdentityProvider::new(userinfo_url));

    let tokens: Arc<dyn TokenSource> = Arc::new(UuidTokenSource);

    let bind = notestock::app_config::server().bind;
    log::info!("Listening on {}", bind);

    HttpServer::new(move || {
        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        // However, services are read top->down, higher traffic routes should be
        // placed higher
        App::new()
            .app_data(Data::new(get_db_pool()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(provider.clone()))
            .app_data(Data::new(tokens.clone()))
            // Security headers - applied to all responses
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_FRAME_OPTIONS, "DENY"))
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin")),
            )
            .wrap(
                ErrorHandlers::new()
                    .handler(StatusCode::BAD_REQUEST, notestock::web::error::render_400)
                    .handler(StatusCode::NOT_FOUND, notestock::web::error::render_404)
                    .handler(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        notestock::web::error::render_500,
                    ),
            )
            .wrap(ClientCtx::default())
            .wrap(Logger::new("%a %{User-Agent}i"))
            .configure(notestock::web::configure)
    })
    .bind(&bind)?
    .run()
    .await
}

/// Initialize third party crates we rely on but don't have control over.
pub fn init_lib_mods() {
    // This should be calls to crates without any transformative work applied.
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}

/// Initialize all local mods.
/// Panics
pub fn init_our_mods() {
    // This should be a list of simple function calls.
    // Each module should work mostly independent of others.
    notestock::app_config::init();
}
