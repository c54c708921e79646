use std::future::{ready, Ready};
use std::sync::Arc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;

use crate::services::auth_service::{expired_session_cookie, TokenSigner, SESSION_COOKIE};

pub const LOGIN_PAGE: &str = "/login";
pub const LANDING_PAGE: &str = "/dashboard";

const PROTECTED_PAGES: [&str; 3] = ["/", "/dashboard", "/scan"];
// /api/login and /api/logout stay public so a session can be opened and closed
const PROTECTED_API: [&str; 3] = ["/api/check-in", "/api/users", "/api/export"];
const AUTH_PAGES: [&str; 1] = [LOGIN_PAGE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Public,
    ProtectedPage,
    ProtectedApi,
    AuthPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Missing,
    /// Present but tampered, expired or signed with another secret.
    Invalid,
    Valid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectToLogin { clear_cookie: bool },
    Unauthorized,
    RedirectToLanding,
}

/// `path` equals `prefix` or continues it with `/`. Root only matches itself.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return path == "/";
    }
    path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

pub fn classify_path(path: &str) -> RouteKind {
    let matches_any = |prefixes: &[&str]| prefixes.iter().any(|prefix| matches_prefix(path, prefix));

    if matches_any(&PROTECTED_API) {
        RouteKind::ProtectedApi
    } else if matches_any(&AUTH_PAGES) {
        RouteKind::AuthPage
    } else if matches_any(&PROTECTED_PAGES) {
        RouteKind::ProtectedPage
    } else {
        RouteKind::Public
    }
}

pub fn decide(kind: RouteKind, token: TokenState) -> GuardDecision {
    match (kind, token) {
        (RouteKind::ProtectedPage, TokenState::Missing) => GuardDecision::RedirectToLogin { clear_cookie: false },
        (RouteKind::ProtectedPage, TokenState::Invalid) => GuardDecision::RedirectToLogin { clear_cookie: true },
        (RouteKind::ProtectedApi, TokenState::Missing | TokenState::Invalid) => GuardDecision::Unauthorized,
        (RouteKind::AuthPage, TokenState::Valid) => GuardDecision::RedirectToLanding,
        _ => GuardDecision::Allow,
    }
}

/// Cookie-based session guard. Pages redirect to the login form; API routes
/// answer 401 JSON. Valid claims are attached to the request extensions.
pub struct SessionGuard {
    signer: Arc<TokenSigner>,
    secure_cookies: bool,
}

impl SessionGuard {
    pub fn new(signer: Arc<TokenSigner>, secure_cookies: bool) -> Self {
        Self { signer, secure_cookies }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionGuardService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGuardService {
            service,
            signer: self.signer.clone(),
            secure_cookies: self.secure_cookies,
        }))
    }
}

pub struct SessionGuardService<S> {
    service: S,
    signer: Arc<TokenSigner>,
    secure_cookies: bool,
}

impl<S, B> Service<ServiceRequest> for SessionGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Routing matches the decoded path, so classification must too
        let kind = classify_path(req.match_info().path());

        let claims = req
            .cookie(SESSION_COOKIE)
            .map(|cookie| self.signer.verify(cookie.value()));
        let token = match &claims {
            None => TokenState::Missing,
            Some(None) => TokenState::Invalid,
            Some(Some(_)) => TokenState::Valid,
        };

        let response = match decide(kind, token) {
            GuardDecision::Allow => {
                if let Some(Some(claims)) = claims {
                    req.extensions_mut().insert(claims);
                }
                let fut = self.service.call(req);
                return Box::pin(async move {
                    let res = fut.await?;
                    Ok(res.map_into_left_body())
                });
            }
            GuardDecision::RedirectToLogin { clear_cookie } => {
                log::info!("🔒 {} {} - redirecting to login", req.method(), req.path());
                let mut builder = HttpResponse::Found();
                builder.insert_header((header::LOCATION, LOGIN_PAGE));
                if clear_cookie {
                    builder.cookie(expired_session_cookie(self.secure_cookies));
                }
                builder.finish()
            }
            GuardDecision::Unauthorized => {
                log::warn!("🔒 {} {} - missing or invalid session", req.method(), req.path());
                HttpResponse::Unauthorized().json(serde_json::json!({
                    "success": false,
                    "error": "Unauthorized"
                }))
            }
            GuardDecision::RedirectToLanding => HttpResponse::Found()
                .insert_header((header::LOCATION, LANDING_PAGE))
                .finish(),
        };

        let res = req.into_response(response).map_into_right_body();
        Box::pin(async move { Ok(res) })
    }
}
