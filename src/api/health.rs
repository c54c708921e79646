use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::database::AttendanceStore;

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub store: String,
    pub timestamp: i64,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service and store are reachable", body = HealthResponse),
        (status = 503, description = "Store ping failed", body = HealthResponse)
    )
)]
pub async fn health_check(store: web::Data<dyn AttendanceStore>) -> HttpResponse {
    let (mut response, status, store_state) = match store.ping().await {
        Ok(()) => (HttpResponse::Ok(), "healthy", "ok"),
        Err(e) => {
            log::error!("❌ Health check: store unreachable - {}", e);
            (HttpResponse::ServiceUnavailable(), "unhealthy", "unreachable")
        }
    };

    response.json(HealthResponse {
        status: status.to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: store_state.to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
