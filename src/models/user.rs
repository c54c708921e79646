use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attendee. `university_id` is the durable identity; `barcode_id` is bound on first scan.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub university_id: String,
    pub barcode_id: Option<i64>,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name shown to operators, falling back to the university ID.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.university_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub university_id: String,
    pub barcode_id: Option<i64>,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields to `$set` on an existing attendee; `None` leaves the field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub barcode_id: Option<i64>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.barcode_id.is_none()
    }
}

#[derive(Debug, Serialize, Clone, utoipa::ToSchema)]
pub struct UserSummary {
    pub id: String,
    pub name: Option<String>,
    pub university_id: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            university_id: user.university_id.clone(),
        }
    }
}
