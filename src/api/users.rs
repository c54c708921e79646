use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    api::acting_admin,
    database::AttendanceStore,
    models::{AttendeeCheckIn, RegisterRequest, UserSummary},
    services::{
        auth_service::SessionClaims,
        check_in_service::{self, RegistrationOutcome},
        history_service::{self, AttendanceHistory},
    },
    utils::{dates, AppError},
};

#[derive(Debug, Serialize, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Registered,
    UserUpdated,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RegistrationResponse {
    pub success: bool,
    pub status: RegistrationStatus,
    pub user: UserSummary,
    pub check_in_time: DateTime<Utc>,
    pub already_checked_in: bool,
    pub message: String,
}

impl From<RegistrationOutcome> for RegistrationResponse {
    fn from(outcome: RegistrationOutcome) -> Self {
        let check_in_time = outcome.attendance.check_in().check_in_time;
        let already_checked_in = !outcome.attendance.is_new();

        let (status, message) = match (outcome.created, already_checked_in) {
            (true, _) => (
                RegistrationStatus::Registered,
                format!("Successfully registered and checked in {}", outcome.user.label()),
            ),
            (false, false) => (RegistrationStatus::UserUpdated, "User updated and checked in".to_string()),
            (false, true) => (
                RegistrationStatus::UserUpdated,
                format!("User updated; already checked in today at {} ET", dates::display_time(check_in_time)),
            ),
        };

        RegistrationResponse {
            success: true,
            status,
            user: UserSummary::from(&outcome.user),
            check_in_time,
            already_checked_in,
            message,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Nine-digit university ID
    pub university_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/users/register",
    tag = "Users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "New attendee registered and checked in", body = RegistrationResponse),
        (status = 200, description = "Existing attendee updated and checked in", body = RegistrationResponse),
        (status = 400, description = "Invalid input or barcode owned by another attendee"),
        (status = 401, description = "No valid session")
    ),
    security(("admin_cookie" = []))
)]
pub async fn register(
    store: web::Data<dyn AttendanceStore>,
    admin: Option<web::ReqData<SessionClaims>>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let command = AttendeeCheckIn::try_from(&*request).inspect_err(|e| {
        log::warn!("❌ Registration rejected: {}", e);
    })?;
    log::info!(
        "📝 POST /api/users/register - university_id: {} by {}",
        command.university_id.as_str(),
        acting_admin(&admin)
    );

    let outcome = check_in_service::register(store.get_ref(), &command, Utc::now())
        .await
        .inspect_err(|e| log::warn!("❌ Registration failed for {}: {}", command.university_id.as_str(), e))?;

    let mut response = if outcome.created {
        HttpResponse::Created()
    } else {
        HttpResponse::Ok()
    };
    Ok(response.json(RegistrationResponse::from(outcome)))
}

#[utoipa::path(
    get,
    path = "/api/users/history",
    tag = "Users",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Attendee with every check-in, newest first", body = AttendanceHistory),
        (status = 400, description = "University ID missing"),
        (status = 404, description = "User not found"),
        (status = 401, description = "No valid session")
    ),
    security(("admin_cookie" = []))
)]
pub async fn history(
    store: web::Data<dyn AttendanceStore>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    log::info!("📜 GET /api/users/history - university_id: {:?}", query.university_id);

    let history = history_service::attendance_history(store.get_ref(), query.university_id.as_deref()).await?;
    Ok(HttpResponse::Ok().json(history))
}

#[cfg(test)]
mod tests {
    use crate::api::{test_app, testing::*};
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    fn register(payload: Value) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/users/register")
            .cookie(session())
            .set_json(payload)
    }

    #[actix_web::test]
    async fn second_registration_updates_in_place() {
        let app = test_app!(memory_store());

        let res = test::call_service(&app, register(json!({"university_id": "123456789"})).to_request()).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(res).await;
        assert_eq!(created["status"], "registered");
        assert_eq!(created["already_checked_in"], false);

        let res = test::call_service(
            &app,
            register(json!({"university_id": "123456789", "barcode_id": 777, "name": "Ada"})).to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let updated: Value = test::read_body_json(res).await;
        assert_eq!(updated["status"], "user_updated");
        assert_eq!(updated["already_checked_in"], true);
        let message = updated["message"].as_str().unwrap();
        assert!(message.starts_with("User updated; already checked in today at "));
        assert!(message.ends_with(" ET"));
        assert_eq!(updated["user"]["id"], created["user"]["id"]);
        assert_eq!(updated["user"]["name"], "Ada");
        assert_eq!(updated["check_in_time"], created["check_in_time"]);

        let history = test::TestRequest::get()
            .uri("/api/users/history?university_id=123456789")
            .cookie(session())
            .to_request();
        let history: Value = test::call_and_read_body_json(&app, history).await;
        assert_eq!(history["user"]["barcodeId"], 777);
        assert_eq!(history["totalCheckIns"], 1);
    }

    #[actix_web::test]
    async fn barcode_owned_by_someone_else_is_rejected() {
        let app = test_app!(memory_store());

        let res = test::call_service(&app, register(json!({"university_id": "111111111", "barcode_id": "555"})).to_request()).await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = test::call_service(&app, register(json!({"university_id": "222222222", "barcode_id": "555"})).to_request()).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "This barcode is already registered to another user");

        let lookup = test::TestRequest::get()
            .uri("/api/users/history?university_id=222222222")
            .cookie(session())
            .to_request();
        let res = test::call_service(&app, lookup).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn history_requires_university_id() {
        let app = test_app!(memory_store());
        let req = test::TestRequest::get().uri("/api/users/history").cookie(session()).to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "University ID is required");
    }
}
