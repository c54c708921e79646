use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AttendanceStore, StoreError, UniqueKey};
use crate::models::{Admin, CheckIn, ExportRow, NewUser, RecentCheckIn, User, UserPatch};

/// In-process store for tests and `DATABASE_URL=memory://` demo runs.
/// Enforces the same unique keys as the MongoDB indexes.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    admins: Vec<Admin>,
    users: Vec<User>,
    check_ins: Vec<CheckIn>,
}

impl MemoryState {
    fn user(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == user_id)
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, StoreError> {
        let state = self.state.read().await;
        Ok(state.admins.iter().find(|a| a.email == email).cloned())
    }

    async fn insert_admin(&self, email: &str, password_hash: &str) -> Result<Admin, StoreError> {
        let mut state = self.state.write().await;
        if state.admins.iter().any(|a| a.email == email) {
            return Err(StoreError::Duplicate(UniqueKey::AdminEmail));
        }

        let admin = Admin {
            id: new_id(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        };
        state.admins.push(admin.clone());
        Ok(admin)
    }

    async fn find_user_by_barcode(&self, barcode_id: i64) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.barcode_id == Some(barcode_id)).cloned())
    }

    async fn find_user_by_university_id(&self, university_id: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.university_id == university_id).cloned())
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut state = self.state.write().await;
        if state.users.iter().any(|u| u.university_id == new_user.university_id) {
            return Err(StoreError::Duplicate(UniqueKey::UniversityId));
        }
        if new_user.barcode_id.is_some() && state.users.iter().any(|u| u.barcode_id == new_user.barcode_id) {
            return Err(StoreError::Duplicate(UniqueKey::Barcode));
        }

        let user = User {
            id: new_id(),
            university_id: new_user.university_id,
            barcode_id: new_user.barcode_id,
            name: new_user.name,
            created_at: new_user.created_at,
            updated_at: new_user.created_at,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, user_id: &str, patch: &UserPatch, at: DateTime<Utc>) -> Result<User, StoreError> {
        let mut state = self.state.write().await;
        if let Some(barcode_id) = patch.barcode_id {
            if state.users.iter().any(|u| u.id != user_id && u.barcode_id == Some(barcode_id)) {
                return Err(StoreError::Duplicate(UniqueKey::Barcode));
            }
        }

        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StoreError::Backend(format!("user {} not found", user_id)))?;

        if let Some(name) = &patch.name {
            user.name = Some(name.clone());
        }
        if let Some(barcode_id) = patch.barcode_id {
            user.barcode_id = Some(barcode_id);
        }
        user.updated_at = at;

        Ok(user.clone())
    }

    async fn insert_check_in(&self, user_id: &str, date: NaiveDate, at: DateTime<Utc>) -> Result<CheckIn, StoreError> {
        let mut state = self.state.write().await;
        if state.user(user_id).is_none() {
            return Err(StoreError::Backend(format!("user {} not found", user_id)));
        }
        if state
            .check_ins
            .iter()
            .any(|c| c.user_id == user_id && c.check_in_date == date)
        {
            return Err(StoreError::Duplicate(UniqueKey::CheckInDay));
        }

        let check_in = CheckIn {
            id: new_id(),
            user_id: user_id.to_string(),
            check_in_date: date,
            check_in_time: at,
        };
        state.check_ins.push(check_in.clone());
        Ok(check_in)
    }

    async fn find_check_in(&self, user_id: &str, date: NaiveDate) -> Result<Option<CheckIn>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .check_ins
            .iter()
            .find(|c| c.user_id == user_id && c.check_in_date == date)
            .cloned())
    }

    async fn count_check_ins_on(&self, date: NaiveDate) -> Result<u64, StoreError> {
        let state = self.state.read().await;
        Ok(state.check_ins.iter().filter(|c| c.check_in_date == date).count() as u64)
    }

    async fn count_users(&self) -> Result<u64, StoreError> {
        Ok(self.state.read().await.users.len() as u64)
    }

    async fn recent_check_ins(&self, date: NaiveDate, limit: usize) -> Result<Vec<RecentCheckIn>, StoreError> {
        let state = self.state.read().await;
        let mut today: Vec<&CheckIn> = state.check_ins.iter().filter(|c| c.check_in_date == date).collect();
        today.sort_by(|a, b| b.check_in_time.cmp(&a.check_in_time));

        Ok(today
            .into_iter()
            .take(limit)
            .map(|check_in| RecentCheckIn {
                check_in: check_in.clone(),
                user_name: state.user(&check_in.user_id).and_then(|u| u.name.clone()),
            })
            .collect())
    }

    async fn check_ins_for_user(&self, user_id: &str) -> Result<Vec<CheckIn>, StoreError> {
        let state = self.state.read().await;
        let mut check_ins: Vec<CheckIn> = state.check_ins.iter().filter(|c| c.user_id == user_id).cloned().collect();
        check_ins.sort_by(|a, b| {
            b.check_in_date
                .cmp(&a.check_in_date)
                .then(b.check_in_time.cmp(&a.check_in_time))
        });
        Ok(check_ins)
    }

    async fn export_rows(&self) -> Result<Vec<ExportRow>, StoreError> {
        let state = self.state.read().await;
        let university_ids: HashMap<&str, &str> = state
            .users
            .iter()
            .map(|u| (u.id.as_str(), u.university_id.as_str()))
            .collect();

        let mut rows: Vec<ExportRow> = state
            .check_ins
            .iter()
            .filter_map(|c| {
                university_ids.get(c.user_id.as_str()).map(|uid| ExportRow {
                    university_id: uid.to_string(),
                    check_in_date: c.check_in_date,
                    check_in_time: c.check_in_time,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.check_in_date
                .cmp(&a.check_in_date)
                .then(b.check_in_time.cmp(&a.check_in_time))
        });
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_user(uid: &str, barcode_id: Option<i64>) -> NewUser {
        NewUser {
            university_id: uid.to_string(),
            barcode_id,
            name: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn enforces_unique_university_id_and_barcode() {
        let store = MemoryStore::default();
        store.insert_user(new_user("123456789", Some(7))).await.unwrap();

        let err = store.insert_user(new_user("123456789", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(UniqueKey::UniversityId)));

        let err = store.insert_user(new_user("987654321", Some(7))).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(UniqueKey::Barcode)));

        // Several attendees may have no barcode at all
        store.insert_user(new_user("111111111", None)).await.unwrap();
        store.insert_user(new_user("222222222", None)).await.unwrap();
        assert_eq!(store.count_users().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn enforces_one_check_in_per_day() {
        let store = MemoryStore::default();
        let user = store.insert_user(new_user("123456789", None)).await.unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap();

        store.insert_check_in(&user.id, day, at).await.unwrap();
        let err = store.insert_check_in(&user.id, day, at).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(UniqueKey::CheckInDay)));

        let next_day = day.succ_opt().unwrap();
        store.insert_check_in(&user.id, next_day, at).await.unwrap();
        assert_eq!(store.check_ins_for_user(&user.id).await.unwrap()[0].check_in_date, next_day);
    }

    #[tokio::test]
    async fn barcode_update_cannot_steal_another_users_barcode() {
        let store = MemoryStore::default();
        store.insert_user(new_user("123456789", Some(7))).await.unwrap();
        let other = store.insert_user(new_user("987654321", None)).await.unwrap();

        let patch = UserPatch { name: None, barcode_id: Some(7) };
        let err = store.update_user(&other.id, &patch, Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(UniqueKey::Barcode)));
        assert_eq!(store.find_user_by_university_id("987654321").await.unwrap().unwrap().barcode_id, None);
    }
}
