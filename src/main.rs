mod api;
mod config;
mod database;
mod middleware;
mod models;
mod seeds;
mod services;
mod utils;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http::header, middleware::Compress, middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::services::auth_service::TokenSigner;

const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        log::error!("❌ Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    log::info!("🚀 Starting Check-in Portal ({})...", config.environment);

    let store = database::connect(&config.database_url).await.map_err(|e| {
        log::error!("❌ Failed to open store: {}", e);
        std::io::Error::other(e.to_string())
    })?;
    log::info!("✅ Store ready");

    // 🌱 Bootstrap admin
    if let Some(seed) = &config.admin_seed {
        if let Err(e) = seeds::admin_seed::seed_admin(store.as_ref(), seed, BCRYPT_COST).await {
            log::error!("   ❌ Failed to seed admin {}: {}", seed.email, e);
        }
    }

    let signer = Arc::new(TokenSigner::new(&config.jwt_secret));
    let store_data: web::Data<dyn database::AttendanceStore> = web::Data::from(store);
    let signer_data = web::Data::from(signer.clone());
    let config_data = web::Data::new(config.clone());

    let address = config.server_address();
    log::info!("🌐 Server starting on {}", address);
    log::info!("📚 Swagger UI available at: http://{}/swagger-ui/", address);
    log::info!("📄 OpenAPI spec at: http://{}/api-docs/openapi.json", address);

    HttpServer::new(move || {
        let cors = config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
            .expose_headers(vec![header::CONTENT_DISPOSITION])
            .supports_credentials()
            .max_age(3600);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(store_data.clone())
            .app_data(signer_data.clone())
            .app_data(config_data.clone())
            .wrap(middleware::SessionGuard::new(signer.clone(), config.secure_cookies()))
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Compress::default())
            .wrap(Logger::default())
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
            .configure(api::configure)
    })
    .bind(address)?
    .run()
    .await
}
