use crate::config::AdminSeed;
use crate::database::{AttendanceStore, StoreError, UniqueKey};
use crate::utils::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Created,
    AlreadyPresent,
}

/// Inserts the bootstrap admin unless one with the same email exists.
/// An existing admin is never updated, so rotating ADMIN_PASSWORD has no effect.
pub async fn seed_admin(store: &dyn AttendanceStore, seed: &AdminSeed, cost: u32) -> Result<SeedOutcome, AppError> {
    if store.find_admin_by_email(&seed.email).await?.is_some() {
        log::info!("👤 Admin seed: {} already exists, skipping", seed.email);
        return Ok(SeedOutcome::AlreadyPresent);
    }

    let hash = bcrypt::hash(&seed.password, cost)
        .map_err(|e| AppError::Internal(format!("Failed to hash admin password: {}", e)))?;

    match store.insert_admin(&seed.email, &hash).await {
        Ok(admin) => {
            log::info!("   ✅ Seeded admin {}", admin.email);
            Ok(SeedOutcome::Created)
        }
        // Another instance seeded it first
        Err(StoreError::Duplicate(UniqueKey::AdminEmail)) => Ok(SeedOutcome::AlreadyPresent),
        Err(e) => Err(e.into()),
    }
}
