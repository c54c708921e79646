use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::OpenApi;

use crate::services::auth_service::SESSION_COOKIE;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Check-in Portal API",
        version = "1.0.0",
        description = "Admin API for event check-in.\n\n**Authentication:** log in through `POST /api/login`; the `admin-token` cookie it sets authorizes every `/api/check-in`, `/api/users` and `/api/export` call.\n\nDates are calendar days in America/New_York."
    ),
    paths(
        // Auth
        crate::api::auth::login,
        crate::api::auth::logout,

        // Check-in
        crate::api::check_in::barcode_check_in,
        crate::api::check_in::manual_check_in,
        crate::api::check_in::stats,

        // Users
        crate::api::users::register,
        crate::api::users::history,

        // Export
        crate::api::export::export_csv,

        // Health
        crate::api::health::health_check,
    ),
    components(
        schemas(
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::LoginResponse,
            crate::models::AdminInfo,
            crate::models::UserSummary,
            crate::models::BarcodeCheckInRequest,
            crate::models::ManualCheckInRequest,
            crate::models::RegisterRequest,
            crate::api::check_in::CheckInStatus,
            crate::api::check_in::CheckInResponse,
            crate::api::users::RegistrationStatus,
            crate::api::users::RegistrationResponse,
            crate::services::stats_service::DashboardStats,
            crate::services::stats_service::RecentCheckInView,
            crate::services::history_service::AttendanceHistory,
            crate::services::history_service::AttendeeProfile,
            crate::services::history_service::HistoryEntry,
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Admin login and logout. Sessions live in an http-only cookie for 7 days."),
        (name = "Check-in", description = "Barcode and manual check-in, at most once per attendee per day, plus live dashboard statistics."),
        (name = "Users", description = "Attendee registration and attendance history."),
        (name = "Export", description = "CSV export of every check-in."),
        (name = "Health", description = "Liveness and store connectivity."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    SESSION_COOKIE,
                    "Session token issued by POST /api/login",
                ))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/login",
            "/api/logout",
            "/api/check-in/barcode",
            "/api/check-in/manual",
            "/api/check-in/stats",
            "/api/users/register",
            "/api/users/history",
            "/api/export/csv",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
        assert!(doc.components.unwrap().security_schemes.contains_key("admin_cookie"));
    }
}
