use serde::Deserialize;

use super::error::AppError;

const UNIVERSITY_ID_LEN: usize = 9;

/// True when the trimmed input is exactly nine ASCII digits.
pub fn is_valid_university_id(uid: &str) -> bool {
    let trimmed = uid.trim();
    trimmed.len() == UNIVERSITY_ID_LEN && trimmed.bytes().all(|b| b.is_ascii_digit())
}

/// Operator-facing explanation of why `uid` was rejected.
pub fn university_id_error(uid: &str) -> &'static str {
    let trimmed = uid.trim();

    if trimmed.is_empty() {
        return "University ID is required";
    }

    if trimmed.chars().count() != UNIVERSITY_ID_LEN {
        return "University ID must be exactly 9 digits";
    }

    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return "University ID can only contain numbers";
    }

    "University ID must be exactly 9 digits"
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniversityId(String);

impl UniversityId {
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        let raw = raw.unwrap_or_default();
        if !is_valid_university_id(raw) {
            return Err(AppError::Validation(university_id_error(raw).to_string()));
        }
        Ok(Self(raw.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Barcode as it arrives over the wire: scanners post numbers, forms post strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BarcodeInput {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Barcode(i64);

impl Barcode {
    pub fn parse(raw: Option<&BarcodeInput>) -> Result<Self, AppError> {
        Self::parse_optional(raw)?
            .ok_or_else(|| AppError::Validation("Barcode ID is required".to_string()))
    }

    /// Absent or blank input is `None`; anything else must be a non-negative integer.
    pub fn parse_optional(raw: Option<&BarcodeInput>) -> Result<Option<Self>, AppError> {
        let invalid = || AppError::Validation("Invalid barcode format".to_string());

        match raw {
            None => Ok(None),
            Some(BarcodeInput::Number(n)) if *n >= 0 => Ok(Some(Self(*n))),
            Some(BarcodeInput::Number(_)) => Err(invalid()),
            Some(BarcodeInput::Text(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(None);
                }
                if !text.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                text.parse::<i64>().map(|n| Some(Self(n))).map_err(|_| invalid())
            }
        }
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

/// Trims a display name; blank names count as absent.
pub fn normalize_name(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_nine_digit_ids() {
        for uid in ["123456789", "000000000", " 987654321 ", "555555555\n"] {
            assert!(is_valid_university_id(uid), "{uid:?} should be valid");
        }
    }

    #[test]
    fn rejects_everything_else() {
        for uid in ["", "   ", "12345678", "1234567890", "12345678a", "１２３４５６７８９", "123 45678", "-12345678"] {
            assert!(!is_valid_university_id(uid), "{uid:?} should be invalid");
        }
    }

    #[test]
    fn error_messages_explain_the_problem() {
        assert_eq!(university_id_error("  "), "University ID is required");
        assert_eq!(university_id_error("1234"), "University ID must be exactly 9 digits");
        assert_eq!(university_id_error("12345678x"), "University ID can only contain numbers");
    }

    #[test]
    fn university_id_is_trimmed() {
        let uid = UniversityId::parse(Some(" 123456789 ")).unwrap();
        assert_eq!(uid.as_str(), "123456789");
        assert!(UniversityId::parse(None).is_err());
    }

    #[test]
    fn barcode_accepts_numbers_and_numeric_strings() {
        assert_eq!(Barcode::parse(Some(&BarcodeInput::Number(42))).unwrap().value(), 42);
        assert_eq!(Barcode::parse(Some(&BarcodeInput::Text(" 0042 ".into()))).unwrap().value(), 42);
    }

    #[test]
    fn barcode_rejects_garbage() {
        for raw in ["12ab", "abc", "-5", "1.5", "99999999999999999999999"] {
            let err = Barcode::parse(Some(&BarcodeInput::Text(raw.into()))).unwrap_err();
            assert_eq!(err.to_string(), "Invalid barcode format", "{raw:?}");
        }
        assert!(Barcode::parse(Some(&BarcodeInput::Number(-1))).is_err());
    }

    #[test]
    fn missing_barcode_is_required_only_when_mandatory() {
        let err = Barcode::parse(Some(&BarcodeInput::Text("  ".into()))).unwrap_err();
        assert_eq!(err.to_string(), "Barcode ID is required");
        assert_eq!(Barcode::parse_optional(None).unwrap(), None);
    }

    #[test]
    fn barcode_input_deserializes_both_shapes() {
        let n: BarcodeInput = serde_json::from_str("123").unwrap();
        let s: BarcodeInput = serde_json::from_str("\"123\"").unwrap();
        assert!(matches!(n, BarcodeInput::Number(123)));
        assert!(matches!(s, BarcodeInput::Text(ref t) if t == "123"));
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(normalize_name(Some("  Ada ")), Some("Ada".to_string()));
        assert_eq!(normalize_name(Some("   ")), None);
        assert_eq!(normalize_name(None), None);
    }
}
