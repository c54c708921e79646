use serde::Serialize;

/// Staff account. Provisioned out-of-band; the portal only reads it at login.
#[derive(Debug, Clone)]
pub struct Admin {
    pub id: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Serialize, Clone, utoipa::ToSchema)]
pub struct AdminInfo {
    pub id: String,
    pub email: String,
}

impl From<&Admin> for AdminInfo {
    fn from(admin: &Admin) -> Self {
        Self {
            id: admin.id.clone(),
            email: admin.email.clone(),
        }
    }
}
