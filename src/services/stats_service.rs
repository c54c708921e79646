use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::{
    database::{AttendanceStore, StoreError},
    utils::dates,
};

pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Name shown for attendees who never gave one.
const ANONYMOUS_NAME: &str = "Student";

#[derive(Debug, Serialize, Clone, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub date: String,
    pub total_checked_in: u64,
    pub total_registered: u64,
    pub attendance_rate: String,
    pub recent_check_ins: Vec<RecentCheckInView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DashboardStats {
    fn zeroed(date: NaiveDate) -> Self {
        Self {
            date: dates::format_date(date),
            total_checked_in: 0,
            total_registered: 0,
            attendance_rate: attendance_rate(0, 0),
            recent_check_ins: Vec::new(),
            error: Some("Failed to fetch statistics".to_string()),
        }
    }
}

/// Recent check-in without the university ID.
#[derive(Debug, Serialize, Clone, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecentCheckInView {
    pub id: String,
    pub time: String,
    pub time_stamp: DateTime<Utc>,
    pub user_name: String,
}

/// Percentage with one decimal, or `"0"` when nobody is registered.
pub fn attendance_rate(checked_in: u64, registered: u64) -> String {
    if registered == 0 {
        return "0".to_string();
    }
    format!("{:.1}", checked_in as f64 / registered as f64 * 100.0)
}

pub async fn collect_stats(
    store: &dyn AttendanceStore,
    now: DateTime<Utc>,
    recent_limit: usize,
) -> Result<DashboardStats, StoreError> {
    let today = dates::event_date(now);

    let total_checked_in = store.count_check_ins_on(today).await?;
    let total_registered = store.count_users().await?;
    let recent_check_ins = store
        .recent_check_ins(today, recent_limit)
        .await?
        .into_iter()
        .map(|recent| RecentCheckInView {
            id: recent.check_in.id,
            time: dates::display_time(recent.check_in.check_in_time),
            time_stamp: recent.check_in.check_in_time,
            user_name: recent.user_name.unwrap_or_else(|| ANONYMOUS_NAME.to_string()),
        })
        .collect();

    Ok(DashboardStats {
        date: dates::format_date(today),
        total_checked_in,
        total_registered,
        attendance_rate: attendance_rate(total_checked_in, total_registered),
        recent_check_ins,
        error: None,
    })
}

/// Dashboard stats that never fail: store errors are logged and a zeroed
/// payload is returned so the polling dashboard keeps rendering.
pub async fn dashboard_stats(
    store: &dyn AttendanceStore,
    now: DateTime<Utc>,
    recent_limit: usize,
) -> DashboardStats {
    match collect_stats(store, now, recent_limit).await {
        Ok(stats) => stats,
        Err(e) => {
            log::error!("❌ Failed to fetch statistics: {}", e);
            DashboardStats::zeroed(dates::event_date(now))
        }
    }
}
