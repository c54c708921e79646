pub mod auth;
pub mod check_in;
pub mod export;
pub mod health;
pub mod pages;
pub mod swagger;
pub mod users;

use actix_web::web;

use crate::services::auth_service::SessionClaims;
use crate::utils::{json_config, query_config};

/// Every route of the portal except the Swagger UI, which needs the
/// generated document and is mounted in `main`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        // Health check
        .route("/health", web::get().to(health::health_check))
        // Pages
        .route("/", web::get().to(pages::root))
        .route("/login", web::get().to(pages::login_page))
        .route("/dashboard", web::get().to(pages::dashboard_page))
        .route("/scan", web::get().to(pages::scan_page))
        .service(
            web::scope("/api")
                .route("/login", web::post().to(auth::login))
                .route("/logout", web::post().to(auth::logout))
                .service(
                    web::scope("/check-in")
                        .route("/barcode", web::post().to(check_in::barcode_check_in))
                        .route("/manual", web::post().to(check_in::manual_check_in))
                        .route("/stats", web::get().to(check_in::stats)),
                )
                .service(
                    web::scope("/users")
                        .route("/register", web::post().to(users::register))
                        .route("/history", web::get().to(users::history)),
                )
                .route("/export/csv", web::get().to(export::export_csv)),
        );
}

/// Email of the admin behind the request, for log lines.
pub(crate) fn acting_admin(claims: &Option<web::ReqData<SessionClaims>>) -> String {
    claims
        .as_ref()
        .map(|c| c.email.clone())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
macro_rules! test_app {
    ($store:expr) => {{
        let config = $crate::api::testing::config();
        let signer = std::sync::Arc::new($crate::services::auth_service::TokenSigner::new(&config.jwt_secret));
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::from($store))
                .app_data(actix_web::web::Data::from(signer.clone()))
                .app_data(actix_web::web::Data::new(config))
                .wrap($crate::middleware::SessionGuard::new(signer, false))
                .configure($crate::api::configure),
        )
        .await
    }};
}

#[cfg(test)]
pub(crate) use test_app;
