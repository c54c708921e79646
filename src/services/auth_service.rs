use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use bcrypt::verify;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    database::AttendanceStore,
    models::{Admin, AdminInfo},
    utils::AppError,
};

pub const SESSION_COOKIE: &str = "admin-token";
pub const SESSION_TTL_DAYS: i64 = 7;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub admin_id: String,
    pub email: String,
    pub iat: i64, // issued at
    pub exp: i64, // expiration
    pub jti: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub admin: AdminInfo,
}

/// Signs and verifies session tokens with the server secret.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, admin: &Admin) -> Result<String, AppError> {
        self.issue_at(admin, Utc::now())
    }

    pub fn issue_at(&self, admin: &Admin, now: DateTime<Utc>) -> Result<String, AppError> {
        let claims = SessionClaims {
            admin_id: admin.id.clone(),
            email: admin.email.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::days(SESSION_TTL_DAYS)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Claims of a correctly signed, unexpired token. Every failure is `None`.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        match decode::<SessionClaims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                log::debug!("Rejected session token: {}", e);
                None
            }
        }
    }
}

pub struct LoginOutcome {
    pub token: String,
    pub admin: AdminInfo,
}

// Admin login
pub async fn login(
    store: &dyn AttendanceStore,
    signer: &TokenSigner,
    request: &LoginRequest,
) -> Result<LoginOutcome, AppError> {
    let email = request.email.as_deref().map(str::trim).unwrap_or_default();
    let password = request.password.as_deref().unwrap_or_default();

    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation("Email and password are required".to_string()));
    }

    let invalid = || AppError::Auth("Invalid credentials".to_string());

    let admin = store.find_admin_by_email(email).await?.ok_or_else(invalid)?;

    let valid = verify(password, &admin.password_hash).unwrap_or_else(|e| {
        log::warn!("⚠️  Unreadable password hash for {}: {}", admin.email, e);
        false
    });
    if !valid {
        return Err(invalid());
    }

    Ok(LoginOutcome {
        token: signer.issue(&admin)?,
        admin: AdminInfo::from(&admin),
    })
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::days(SESSION_TTL_DAYS))
        .finish()
}

/// Same cookie with an empty value and zero max-age, so browsers drop it.
pub fn expired_session_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = session_cookie(String::new(), secure);
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn admin() -> Admin {
        Admin {
            id: "a1".to_string(),
            email: "staff@example.edu".to_string(),
            password_hash: bcrypt::hash("hunter22", 4).unwrap(),
        }
    }

    #[test]
    fn issued_tokens_verify() {
        let signer = TokenSigner::new("secret-one");
        let token = signer.issue(&admin()).unwrap();
        let claims = signer.verify(&token).unwrap();

        assert_eq!(claims.admin_id, "a1");
        assert_eq!(claims.email, "staff@example.edu");
        assert_eq!(claims.exp - claims.iat, SESSION_TTL_DAYS * 24 * 60 * 60);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = TokenSigner::new("secret-one").issue(&admin()).unwrap();
        assert_eq!(TokenSigner::new("secret-two").verify(&token), None);
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = TokenSigner::new("secret-one");
        let token = signer.issue_at(&admin(), Utc::now() - Duration::days(8)).unwrap();
        assert_eq!(signer.verify(&token), None);
    }

    #[test]
    fn tampered_or_garbage_tokens_are_rejected() {
        let signer = TokenSigner::new("secret-one");
        let token = signer.issue(&admin()).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = "eyJhZG1pbklkIjoiZXZpbCIsImVtYWlsIjoiZXZpbEBleGFtcGxlLmVkdSIsImlhdCI6MCwiZXhwIjo5OTk5OTk5OTk5LCJqdGkiOiJ4In0";
        parts[1] = forged_payload;
        assert_eq!(signer.verify(&parts.join(".")), None);

        assert_eq!(signer.verify(""), None);
        assert_eq!(signer.verify("not.a.jwt"), None);
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("t".to_string(), true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(CookieDuration::days(7)));

        let removal = expired_session_cookie(false);
        assert_eq!(removal.value(), "");
        assert_eq!(removal.max_age(), Some(CookieDuration::ZERO));
    }

    #[tokio::test]
    async fn login_checks_password() {
        let store = MemoryStore::default();
        let hash = bcrypt::hash("hunter22", 4).unwrap();
        store.insert_admin("staff@example.edu", &hash).await.unwrap();
        let signer = TokenSigner::new("secret-one");

        let ok = LoginRequest {
            email: Some("staff@example.edu".to_string()),
            password: Some("hunter22".to_string()),
        };
        let outcome = login(&store, &signer, &ok).await.unwrap();
        assert_eq!(outcome.admin.email, "staff@example.edu");
        assert!(signer.verify(&outcome.token).is_some());

        let wrong = LoginRequest {
            email: Some("staff@example.edu".to_string()),
            password: Some("nope".to_string()),
        };
        assert!(matches!(login(&store, &signer, &wrong).await, Err(AppError::Auth(_))));

        let unknown = LoginRequest {
            email: Some("ghost@example.edu".to_string()),
            password: Some("hunter22".to_string()),
        };
        assert!(matches!(login(&store, &signer, &unknown).await, Err(AppError::Auth(_))));

        let missing = LoginRequest { email: None, password: None };
        assert!(matches!(login(&store, &signer, &missing).await, Err(AppError::Validation(_))));
    }
}
