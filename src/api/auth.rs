use actix_web::{web, HttpResponse};

use crate::{
    config::Config,
    database::AttendanceStore,
    services::auth_service::{self, expired_session_cookie, session_cookie, LoginRequest, LoginResponse, TokenSigner},
    utils::AppError,
};

#[utoipa::path(
    post,
    path = "/api/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful; sets the admin-token cookie", body = LoginResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    store: web::Data<dyn AttendanceStore>,
    signer: web::Data<TokenSigner>,
    config: web::Data<Config>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let email = request.email.as_deref().unwrap_or("N/A");
    log::info!("🔐 POST /api/login - email: {}", email);

    match auth_service::login(store.get_ref(), &signer, &request).await {
        Ok(outcome) => {
            log::info!("✅ Login successful: {}", outcome.admin.email);
            Ok(HttpResponse::Ok()
                .cookie(session_cookie(outcome.token, config.secure_cookies()))
                .json(LoginResponse {
                    success: true,
                    admin: outcome.admin,
                }))
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", email, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Session cookie cleared")
    )
)]
pub async fn logout(config: web::Data<Config>) -> HttpResponse {
    log::info!("👋 POST /api/logout");

    HttpResponse::Ok()
        .cookie(expired_session_cookie(config.secure_cookies()))
        .json(serde_json::json!({
            "success": true,
            "message": "Logged out successfully"
        }))
}

#[cfg(test)]
mod tests {
    use crate::api::{test_app, testing::*};
    use crate::database::{AttendanceStore, MemoryStore};
    use crate::services::auth_service::SESSION_COOKIE;
    use actix_web::{cookie::Cookie, http::header, http::StatusCode, test};
    use serde_json::{json, Value};
    use std::sync::Arc;

    async fn store_with_admin() -> Arc<dyn AttendanceStore> {
        let store = MemoryStore::default();
        let hash = bcrypt::hash("hunter22", 4).unwrap();
        store.insert_admin("staff@example.edu", &hash).await.unwrap();
        Arc::new(store)
    }

    #[actix_web::test]
    async fn login_sets_a_cookie_that_opens_the_dashboard() {
        let app = test_app!(store_with_admin().await);

        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(json!({"email": "staff@example.edu", "password": "hunter22"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let cookie = res
            .response()
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .map(|c| Cookie::new(SESSION_COOKIE, c.value().to_string()))
            .unwrap();
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["admin"]["email"], "staff@example.edu");

        let req = test::TestRequest::get().uri("/dashboard").cookie(cookie.clone()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/login").cookie(cookie).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/dashboard");
    }

    #[actix_web::test]
    async fn bad_credentials_are_401_and_set_no_cookie() {
        let app = test_app!(store_with_admin().await);

        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(json!({"email": "staff@example.edu", "password": "wrong"}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(res.response().cookies().next().is_none());
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "Invalid credentials");

        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(json!({"email": "staff@example.edu"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn logout_expires_the_cookie() {
        let app = test_app!(memory_store());
        let req = test::TestRequest::post().uri("/api/logout").cookie(session()).to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        let cleared = res.response().cookies().find(|c| c.name() == SESSION_COOKIE).unwrap();
        assert_eq!(cleared.value(), "");
        assert_eq!(cleared.max_age(), Some(actix_web::cookie::time::Duration::ZERO));
    }
}
