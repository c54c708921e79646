//! Check-in reconciliation: resolves an attendee from a barcode or university
//! ID and records at most one check-in per attendee per New York day.
//!
//! Uniqueness is enforced by the store. A duplicate insert is the signal for
//! "already checked in" or "identifier taken", so concurrent scans cannot
//! produce two rows for the same day.

use chrono::{DateTime, Utc};

use crate::{
    database::{AttendanceStore, StoreError, UniqueKey},
    models::{AttendeeCheckIn, BarcodeCheckIn, CheckIn, NewUser, User, UserPatch},
    utils::{dates, AppError, Barcode},
};

pub const BARCODE_TAKEN: &str = "This barcode is already registered to another user";

#[derive(Debug, Clone, PartialEq)]
pub enum Attendance {
    /// A new row was written for today.
    Recorded(CheckIn),
    /// Today's row already existed; carries the original.
    AlreadyRecorded(CheckIn),
}

impl Attendance {
    pub fn check_in(&self) -> &CheckIn {
        match self {
            Attendance::Recorded(c) | Attendance::AlreadyRecorded(c) => c,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Attendance::Recorded(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckInOutcome {
    Attended { user: User, attendance: Attendance },
    /// Card exists physically but is unknown here; nothing was written.
    RegistrationRequired { barcode_id: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationOutcome {
    pub user: User,
    /// False when the university ID already existed and was updated in place.
    pub created: bool,
    pub attendance: Attendance,
}

/// Scan path. Unknown barcodes are never auto-registered.
pub async fn check_in_by_barcode(
    store: &dyn AttendanceStore,
    command: BarcodeCheckIn,
    now: DateTime<Utc>,
) -> Result<CheckInOutcome, AppError> {
    let barcode_id = command.barcode.value();

    let Some(user) = store.find_user_by_barcode(barcode_id).await? else {
        log::info!("🆕 Unknown barcode {}, registration required", barcode_id);
        return Ok(CheckInOutcome::RegistrationRequired { barcode_id });
    };

    let attendance = record_attendance(store, &user, now).await?;
    Ok(CheckInOutcome::Attended { user, attendance })
}

/// Manual path. A typed university ID with no match is registered on the spot.
pub async fn check_in_by_university_id(
    store: &dyn AttendanceStore,
    command: &AttendeeCheckIn,
    now: DateTime<Utc>,
) -> Result<CheckInOutcome, AppError> {
    let (user, _) = resolve_attendee(store, command, now).await?;
    let attendance = record_attendance(store, &user, now).await?;
    Ok(CheckInOutcome::Attended { user, attendance })
}

/// Registration form, usually submitted after a `RegistrationRequired` scan.
pub async fn register(
    store: &dyn AttendanceStore,
    command: &AttendeeCheckIn,
    now: DateTime<Utc>,
) -> Result<RegistrationOutcome, AppError> {
    let (user, created) = resolve_attendee(store, command, now).await?;
    let attendance = record_attendance(store, &user, now).await?;
    Ok(RegistrationOutcome {
        user,
        created,
        attendance,
    })
}

/// Finds or creates the attendee, backfilling name and barcode.
async fn resolve_attendee(
    store: &dyn AttendanceStore,
    command: &AttendeeCheckIn,
    now: DateTime<Utc>,
) -> Result<(User, bool), AppError> {
    let university_id = command.university_id.as_str();

    if let Some(existing) = store.find_user_by_university_id(university_id).await? {
        let user = update_existing(store, existing, command, now).await?;
        return Ok((user, false));
    }

    if let Some(barcode) = command.barcode {
        ensure_barcode_free(store, barcode, None).await?;
    }

    let new_user = NewUser {
        university_id: university_id.to_string(),
        barcode_id: command.barcode.map(Barcode::value),
        name: command.name.clone(),
        created_at: now,
    };

    match store.insert_user(new_user).await {
        Ok(user) => {
            log::info!("✅ Registered attendee {}", user.university_id);
            Ok((user, true))
        }
        Err(StoreError::Duplicate(UniqueKey::UniversityId)) => {
            // Lost a race with a concurrent registration of the same ID
            let existing = store
                .find_user_by_university_id(university_id)
                .await?
                .ok_or_else(|| StoreError::Backend(format!("user {} vanished after duplicate insert", university_id)))?;
            let user = update_existing(store, existing, command, now).await?;
            Ok((user, false))
        }
        Err(StoreError::Duplicate(UniqueKey::Barcode)) => Err(AppError::Conflict(BARCODE_TAKEN.to_string())),
        Err(e) => Err(e.into()),
    }
}

async fn update_existing(
    store: &dyn AttendanceStore,
    user: User,
    command: &AttendeeCheckIn,
    now: DateTime<Utc>,
) -> Result<User, AppError> {
    let mut patch = UserPatch::default();

    if user.name.is_none() {
        patch.name = command.name.clone();
    }

    if let Some(barcode) = command.barcode {
        if user.barcode_id != Some(barcode.value()) {
            ensure_barcode_free(store, barcode, Some(&user.id)).await?;
            patch.barcode_id = Some(barcode.value());
        }
    }

    if patch.is_empty() {
        return Ok(user);
    }

    match store.update_user(&user.id, &patch, now).await {
        Ok(updated) => {
            log::info!("✏️  Updated attendee {}", updated.university_id);
            Ok(updated)
        }
        Err(StoreError::Duplicate(UniqueKey::Barcode)) => Err(AppError::Conflict(BARCODE_TAKEN.to_string())),
        Err(e) => Err(e.into()),
    }
}

async fn ensure_barcode_free(
    store: &dyn AttendanceStore,
    barcode: Barcode,
    owner_id: Option<&str>,
) -> Result<(), AppError> {
    match store.find_user_by_barcode(barcode.value()).await? {
        Some(holder) if Some(holder.id.as_str()) != owner_id => {
            log::warn!(
                "⚠️  Barcode {} already belongs to {}",
                barcode.value(),
                holder.university_id
            );
            Err(AppError::Conflict(BARCODE_TAKEN.to_string()))
        }
        _ => Ok(()),
    }
}

/// Inserts today's check-in; a duplicate means the attendee was already here.
pub async fn record_attendance(
    store: &dyn AttendanceStore,
    user: &User,
    now: DateTime<Utc>,
) -> Result<Attendance, AppError> {
    let today = dates::event_date(now);

    match store.insert_check_in(&user.id, today, now).await {
        Ok(check_in) => {
            log::info!("✅ Checked in {} for {}", user.university_id, today);
            Ok(Attendance::Recorded(check_in))
        }
        Err(StoreError::Duplicate(UniqueKey::CheckInDay)) => {
            let existing = store.find_check_in(&user.id, today).await?.ok_or_else(|| {
                StoreError::Backend(format!("check-in for {} on {} vanished after duplicate insert", user.id, today))
            })?;
            log::info!("ℹ️  {} already checked in for {}", user.university_id, today);
            Ok(Attendance::AlreadyRecorded(existing))
        }
        Err(e) => Err(e.into()),
    }
}
