use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    api::acting_admin,
    config::Config,
    database::AttendanceStore,
    models::{AttendeeCheckIn, BarcodeCheckIn, BarcodeCheckInRequest, ManualCheckInRequest, UserSummary},
    services::{
        auth_service::SessionClaims,
        check_in_service::{self, CheckInOutcome},
        stats_service::{self, DashboardStats},
    },
    utils::{dates, AppError},
};

#[derive(Debug, Serialize, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckInStatus {
    CheckedIn,
    AlreadyCheckedIn,
    NewUserRequired,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CheckInResponse {
    pub success: bool,
    pub status: CheckInStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_time: Option<DateTime<Utc>>,
    /// Echoed back when the card must be registered first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode_id: Option<i64>,
    pub message: String,
}

impl From<CheckInOutcome> for CheckInResponse {
    fn from(outcome: CheckInOutcome) -> Self {
        match outcome {
            CheckInOutcome::Attended { user, attendance } => {
                let check_in_time = attendance.check_in().check_in_time;
                let (status, message) = if attendance.is_new() {
                    (CheckInStatus::CheckedIn, format!("Successfully checked in {}", user.label()))
                } else {
                    (
                        CheckInStatus::AlreadyCheckedIn,
                        format!("Already checked in today at {} ET", dates::display_time(check_in_time)),
                    )
                };

                CheckInResponse {
                    success: true,
                    status,
                    user: Some(UserSummary::from(&user)),
                    check_in_time: Some(check_in_time),
                    barcode_id: None,
                    message,
                }
            }
            CheckInOutcome::RegistrationRequired { barcode_id } => CheckInResponse {
                success: true,
                status: CheckInStatus::NewUserRequired,
                user: None,
                check_in_time: None,
                barcode_id: Some(barcode_id),
                message: "Please register this new user".to_string(),
            },
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/check-in/barcode",
    tag = "Check-in",
    request_body = BarcodeCheckInRequest,
    responses(
        (status = 200, description = "Checked in, already checked in, or registration required", body = CheckInResponse),
        (status = 400, description = "Missing or malformed barcode"),
        (status = 401, description = "No valid session")
    ),
    security(("admin_cookie" = []))
)]
pub async fn barcode_check_in(
    store: web::Data<dyn AttendanceStore>,
    admin: Option<web::ReqData<SessionClaims>>,
    request: web::Json<BarcodeCheckInRequest>,
) -> Result<HttpResponse, AppError> {
    let command = BarcodeCheckIn::try_from(&*request).inspect_err(|e| {
        log::warn!("❌ Barcode check-in rejected: {}", e);
    })?;
    log::info!(
        "📷 POST /api/check-in/barcode - barcode: {} by {}",
        command.barcode.value(),
        acting_admin(&admin)
    );

    let outcome = check_in_service::check_in_by_barcode(store.get_ref(), command, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(CheckInResponse::from(outcome)))
}

#[utoipa::path(
    post,
    path = "/api/check-in/manual",
    tag = "Check-in",
    request_body = ManualCheckInRequest,
    responses(
        (status = 200, description = "Checked in or already checked in", body = CheckInResponse),
        (status = 400, description = "Missing or invalid university ID"),
        (status = 401, description = "No valid session")
    ),
    security(("admin_cookie" = []))
)]
pub async fn manual_check_in(
    store: web::Data<dyn AttendanceStore>,
    admin: Option<web::ReqData<SessionClaims>>,
    request: web::Json<ManualCheckInRequest>,
) -> Result<HttpResponse, AppError> {
    let command = AttendeeCheckIn::try_from(&*request).inspect_err(|e| {
        log::warn!("❌ Manual check-in rejected: {}", e);
    })?;
    log::info!(
        "⌨️  POST /api/check-in/manual - university_id: {} by {}",
        command.university_id.as_str(),
        acting_admin(&admin)
    );

    let outcome = check_in_service::check_in_by_university_id(store.get_ref(), &command, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(CheckInResponse::from(outcome)))
}

#[utoipa::path(
    get,
    path = "/api/check-in/stats",
    tag = "Check-in",
    responses(
        (status = 200, description = "Today's statistics; zeroed with `error` set when the store fails", body = DashboardStats),
        (status = 401, description = "No valid session")
    ),
    security(("admin_cookie" = []))
)]
pub async fn stats(store: web::Data<dyn AttendanceStore>, config: web::Data<Config>) -> HttpResponse {
    let stats = stats_service::dashboard_stats(store.get_ref(), Utc::now(), config.stats_recent_limit).await;
    HttpResponse::Ok().json(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{test_app, testing::*};
    use crate::models::{CheckIn, User};
    use crate::services::check_in_service::Attendance;
    use actix_web::{http::StatusCode, test as actix_test};
    use chrono::{NaiveDate, TimeZone};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn user(name: Option<&str>) -> User {
        let at = Utc.with_ymd_and_hms(2025, 1, 15, 2, 30, 5).unwrap();
        User {
            id: "u1".to_string(),
            university_id: "123456789".to_string(),
            barcode_id: None,
            name: name.map(str::to_string),
            created_at: at,
            updated_at: at,
        }
    }

    fn check_in() -> CheckIn {
        CheckIn {
            id: "c1".to_string(),
            user_id: "u1".to_string(),
            check_in_date: NaiveDate::from_ymd_opt(2025, 1, 14).unwrap(),
            check_in_time: Utc.with_ymd_and_hms(2025, 1, 15, 2, 30, 5).unwrap(),
        }
    }

    #[test]
    fn messages_fall_back_to_university_id() {
        let response = CheckInResponse::from(CheckInOutcome::Attended {
            user: user(None),
            attendance: Attendance::Recorded(check_in()),
        });
        assert_eq!(response.status, CheckInStatus::CheckedIn);
        assert_eq!(response.message, "Successfully checked in 123456789");
    }

    #[test]
    fn repeat_message_shows_new_york_time() {
        let response = CheckInResponse::from(CheckInOutcome::Attended {
            user: user(Some("Ada")),
            attendance: Attendance::AlreadyRecorded(check_in()),
        });
        assert_eq!(response.status, CheckInStatus::AlreadyCheckedIn);
        assert_eq!(response.message, "Already checked in today at 9:30:05 PM ET");

        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["status"], "already_checked_in");
        assert_eq!(body["user"]["name"], "Ada");
        assert!(body.get("barcode_id").is_none());
    }

    #[actix_web::test]
    async fn invalid_barcodes_are_rejected() {
        let app = test_app!(memory_store());
        for (payload, error) in [
            (json!({}), "Barcode ID is required"),
            (json!({"barcode_id": "  "}), "Barcode ID is required"),
            (json!({"barcode_id": "12ab"}), "Invalid barcode format"),
        ] {
            let req = actix_test::TestRequest::post()
                .uri("/api/check-in/barcode")
                .cookie(session())
                .set_json(payload)
                .to_request();
            let res = actix_test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
            let body: Value = actix_test::read_body_json(res).await;
            assert_eq!(body["error"], error);
        }
    }

    #[actix_web::test]
    async fn manual_check_in_validates_university_id() {
        let app = test_app!(memory_store());
        let req = actix_test::TestRequest::post()
            .uri("/api/check-in/manual")
            .cookie(session())
            .set_json(json!({"university_id": "12345"}))
            .to_request();
        let res = actix_test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["error"], "University ID must be exactly 9 digits");
    }

    #[actix_web::test]
    async fn stats_degrade_when_store_fails() {
        let app = test_app!(Arc::new(FailingStore) as Arc<dyn AttendanceStore>);
        let req = actix_test::TestRequest::get().uri("/api/check-in/stats").cookie(session()).to_request();
        let res = actix_test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["totalCheckedIn"], 0);
        assert_eq!(body["attendanceRate"], "0");
        assert_eq!(body["error"], "Failed to fetch statistics");
    }
}
