use chrono::{DateTime, Utc};

use crate::{
    database::AttendanceStore,
    models::ExportRow,
    utils::{dates, AppError},
};

const HEADER: [&str; 3] = ["University ID", "Check-in Date", "Check-in Time"];

pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("check-ins-export-{}.csv", now.format(dates::DATE_FORMAT))
}

pub fn render_csv(rows: &[ExportRow]) -> Result<String, AppError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let to_internal = |e: csv::Error| AppError::Internal(format!("CSV write failed: {}", e));

    writer.write_record(HEADER).map_err(to_internal)?;
    for row in rows {
        let date = dates::format_date(row.check_in_date);
        let time = dates::export_time(row.check_in_time);
        writer
            .write_record([row.university_id.as_str(), date.as_str(), time.as_str()])
            .map_err(to_internal)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV is not UTF-8: {}", e)))
}

/// All check-ins as CSV; `NotFound` when there is nothing to export.
pub async fn export_check_ins(store: &dyn AttendanceStore) -> Result<String, AppError> {
    let rows = store.export_rows().await?;
    if rows.is_empty() {
        return Err(AppError::NotFound("No check-in data available".to_string()));
    }

    log::info!("📄 Exporting {} check-ins", rows.len());
    render_csv(&rows)
}
