pub mod memory;
pub mod mongo;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::models::{Admin, CheckIn, ExportRow, NewUser, RecentCheckIn, User, UserPatch};

pub use memory::MemoryStore;
pub use mongo::MongoDB;

/// `DATABASE_URL` value selecting the in-process store.
pub const MEMORY_URL: &str = "memory://";

/// Uniqueness constraints the store enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    AdminEmail,
    UniversityId,
    Barcode,
    CheckInDay,
}

impl UniqueKey {
    pub const ALL: [UniqueKey; 4] = [
        UniqueKey::AdminEmail,
        UniqueKey::UniversityId,
        UniqueKey::Barcode,
        UniqueKey::CheckInDay,
    ];

    pub fn index_name(self) -> &'static str {
        match self {
            UniqueKey::AdminEmail => "admins_email_unique",
            UniqueKey::UniversityId => "users_university_id_unique",
            UniqueKey::Barcode => "users_barcode_id_unique",
            UniqueKey::CheckInDay => "check_ins_user_day_unique",
        }
    }
}

impl fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.index_name())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key on {0}")]
    Duplicate(UniqueKey),
    #[error("{0}")]
    Backend(String),
}

/// Persistence for admins, attendees and check-ins.
///
/// Implementations must enforce every [`UniqueKey`] and report a violation
/// as [`StoreError::Duplicate`] so callers can resolve races without
/// read-then-write checks.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, StoreError>;

    async fn insert_admin(&self, email: &str, password_hash: &str) -> Result<Admin, StoreError>;

    async fn find_user_by_barcode(&self, barcode_id: i64) -> Result<Option<User>, StoreError>;

    async fn find_user_by_university_id(&self, university_id: &str) -> Result<Option<User>, StoreError>;

    async fn insert_user(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Applies `patch` and returns the updated attendee.
    async fn update_user(&self, user_id: &str, patch: &UserPatch, at: DateTime<Utc>) -> Result<User, StoreError>;

    async fn insert_check_in(&self, user_id: &str, date: NaiveDate, at: DateTime<Utc>) -> Result<CheckIn, StoreError>;

    async fn find_check_in(&self, user_id: &str, date: NaiveDate) -> Result<Option<CheckIn>, StoreError>;

    async fn count_check_ins_on(&self, date: NaiveDate) -> Result<u64, StoreError>;

    async fn count_users(&self) -> Result<u64, StoreError>;

    /// Newest first, at most `limit`.
    async fn recent_check_ins(&self, date: NaiveDate, limit: usize) -> Result<Vec<RecentCheckIn>, StoreError>;

    /// Newest date first.
    async fn check_ins_for_user(&self, user_id: &str) -> Result<Vec<CheckIn>, StoreError>;

    /// Every check-in with its attendee's university ID, newest first.
    async fn export_rows(&self) -> Result<Vec<ExportRow>, StoreError>;
}

/// Opens the store named by `database_url`.
pub async fn connect(database_url: &str) -> Result<Arc<dyn AttendanceStore>, StoreError> {
    if database_url == MEMORY_URL {
        log::warn!("⚠️  Using in-memory store; data is lost on restart");
        return Ok(Arc::new(MemoryStore::default()));
    }

    let db = MongoDB::new(database_url).await?;
    Ok(Arc::new(db))
}
