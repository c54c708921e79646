use actix_web::{http::header, web, HttpResponse};
use chrono::Utc;

use crate::{
    api::acting_admin,
    database::AttendanceStore,
    services::{auth_service::SessionClaims, export_service},
    utils::AppError,
};

#[utoipa::path(
    get,
    path = "/api/export/csv",
    tag = "Export",
    responses(
        (status = 200, description = "Every check-in as CSV", content_type = "text/csv", body = String),
        (status = 404, description = "No check-in data available"),
        (status = 401, description = "No valid session")
    ),
    security(("admin_cookie" = []))
)]
pub async fn export_csv(
    store: web::Data<dyn AttendanceStore>,
    admin: Option<web::ReqData<SessionClaims>>,
) -> Result<HttpResponse, AppError> {
    log::info!("📄 GET /api/export/csv by {}", acting_admin(&admin));

    let csv = export_service::export_check_ins(store.get_ref()).await?;
    let filename = export_service::export_filename(Utc::now());

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(csv))
}
