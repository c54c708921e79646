use actix_web::{http::header, HttpResponse};

use crate::middleware::auth::LANDING_PAGE;

const LOGIN_HTML: &str = include_str!("../../static/login.html");
const DASHBOARD_HTML: &str = include_str!("../../static/dashboard.html");
const SCAN_HTML: &str = include_str!("../../static/scan.html");

fn html(page: &'static str) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(page)
}

pub async fn root() -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, LANDING_PAGE))
        .finish()
}

pub async fn login_page() -> HttpResponse {
    html(LOGIN_HTML)
}

pub async fn dashboard_page() -> HttpResponse {
    html(DASHBOARD_HTML)
}

pub async fn scan_page() -> HttpResponse {
    html(SCAN_HTML)
}
