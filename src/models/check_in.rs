use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{normalize_name, AppError, Barcode, BarcodeInput, UniversityId};

/// One attendance record. At most one per `(user_id, check_in_date)`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CheckIn {
    pub id: String,
    pub user_id: String,
    pub check_in_date: NaiveDate,
    pub check_in_time: DateTime<Utc>,
}

/// Today's check-in joined with the attendee's display name.
#[derive(Debug, Clone)]
pub struct RecentCheckIn {
    pub check_in: CheckIn,
    pub user_name: Option<String>,
}

/// Check-in joined with the attendee's university ID, for the CSV export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub university_id: String,
    pub check_in_date: NaiveDate,
    pub check_in_time: DateTime<Utc>,
}

// ==================== REQUEST BODIES ====================

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct BarcodeCheckInRequest {
    #[schema(value_type = Option<String>, example = "40012345")]
    pub barcode_id: Option<BarcodeInput>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ManualCheckInRequest {
    #[schema(example = "123456789")]
    pub university_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    #[schema(value_type = Option<String>, example = "40012345")]
    pub barcode_id: Option<BarcodeInput>,
    #[schema(example = "123456789")]
    pub university_id: Option<String>,
    pub name: Option<String>,
}

// ==================== TYPED COMMANDS ====================

/// Scan from a physical card.
#[derive(Debug, Clone, Copy)]
pub struct BarcodeCheckIn {
    pub barcode: Barcode,
}

impl TryFrom<&BarcodeCheckInRequest> for BarcodeCheckIn {
    type Error = AppError;

    fn try_from(request: &BarcodeCheckInRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            barcode: Barcode::parse(request.barcode_id.as_ref())?,
        })
    }
}

/// Attendee identified by university ID, from the manual form or a registration.
#[derive(Debug, Clone)]
pub struct AttendeeCheckIn {
    pub university_id: UniversityId,
    pub name: Option<String>,
    pub barcode: Option<Barcode>,
}

impl TryFrom<&ManualCheckInRequest> for AttendeeCheckIn {
    type Error = AppError;

    fn try_from(request: &ManualCheckInRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            university_id: UniversityId::parse(request.university_id.as_deref())?,
            name: normalize_name(request.name.as_deref()),
            barcode: None,
        })
    }
}

impl TryFrom<&RegisterRequest> for AttendeeCheckIn {
    type Error = AppError;

    fn try_from(request: &RegisterRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            university_id: UniversityId::parse(request.university_id.as_deref())?,
            name: normalize_name(request.name.as_deref()),
            barcode: Barcode::parse_optional(request.barcode_id.as_ref())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_body_parses_into_command() {
        let request: RegisterRequest = serde_json::from_str(
            r#"{"barcode_id": "40012345", "university_id": " 123456789 ", "name": "  Ada "}"#,
        )
        .unwrap();
        let command = AttendeeCheckIn::try_from(&request).unwrap();

        assert_eq!(command.university_id.as_str(), "123456789");
        assert_eq!(command.name.as_deref(), Some("Ada"));
        assert_eq!(command.barcode.map(Barcode::value), Some(40012345));
    }

    #[test]
    fn manual_body_requires_university_id() {
        let request: ManualCheckInRequest = serde_json::from_str(r#"{"name": "Ada"}"#).unwrap();
        let err = AttendeeCheckIn::try_from(&request).unwrap_err();
        assert_eq!(err.to_string(), "University ID is required");
    }

    #[test]
    fn barcode_body_rejects_non_numeric() {
        let request: BarcodeCheckInRequest = serde_json::from_str(r#"{"barcode_id": "A-17"}"#).unwrap();
        assert!(BarcodeCheckIn::try_from(&request).is_err());
    }
}
