use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{database::AttendanceStore, utils::{dates, AppError}};

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeProfile {
    pub id: String,
    pub name: Option<String>,
    pub university_id: String,
    pub barcode_id: Option<i64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub date: String,
    /// Raw timestamp; clients format it for display.
    pub time: DateTime<Utc>,
    pub date_time: DateTime<Utc>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceHistory {
    pub user: AttendeeProfile,
    pub check_ins: Vec<HistoryEntry>,
    pub total_check_ins: usize,
}

/// Every check-in of one attendee, newest first.
pub async fn attendance_history(
    store: &dyn AttendanceStore,
    university_id: Option<&str>,
) -> Result<AttendanceHistory, AppError> {
    let university_id = university_id.map(str::trim).unwrap_or_default();
    if university_id.is_empty() {
        return Err(AppError::Validation("University ID is required".to_string()));
    }

    let user = store
        .find_user_by_university_id(university_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let check_ins: Vec<HistoryEntry> = store
        .check_ins_for_user(&user.id)
        .await?
        .into_iter()
        .map(|c| HistoryEntry {
            id: c.id,
            date: dates::format_date(c.check_in_date),
            time: c.check_in_time,
            date_time: c.check_in_time,
        })
        .collect();

    Ok(AttendanceHistory {
        total_check_ins: check_ins.len(),
        check_ins,
        user: AttendeeProfile {
            id: user.id,
            name: user.name,
            university_id: user.university_id,
            barcode_id: user.barcode_id,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::models::NewUser;
    use chrono::{Duration, TimeZone};

    #[tokio::test]
    async fn history_lists_newest_first() {
        let store = MemoryStore::default();
        let first_day = Utc.with_ymd_and_hms(2025, 9, 8, 16, 0, 0).unwrap();
        let user = store
            .insert_user(NewUser {
                university_id: "123456789".to_string(),
                barcode_id: Some(9),
                name: Some("Ada".to_string()),
                created_at: first_day,
            })
            .await
            .unwrap();
        for day in 0..3 {
            let at = first_day + Duration::days(day);
            store.insert_check_in(&user.id, dates::event_date(at), at).await.unwrap();
        }

        let history = attendance_history(&store, Some(" 123456789 ")).await.unwrap();

        assert_eq!(history.total_check_ins, 3);
        assert_eq!(history.user.barcode_id, Some(9));
        let days: Vec<&str> = history.check_ins.iter().map(|c| c.date.as_str()).collect();
        assert_eq!(days, vec!["2025-09-10", "2025-09-09", "2025-09-08"]);
    }

    #[tokio::test]
    async fn missing_and_unknown_ids_are_client_errors() {
        let store = MemoryStore::default();
        assert!(matches!(attendance_history(&store, None).await, Err(AppError::Validation(_))));
        assert!(matches!(attendance_history(&store, Some("  ")).await, Err(AppError::Validation(_))));
        assert!(matches!(attendance_history(&store, Some("999999999")).await, Err(AppError::NotFound(_))));
    }
}
