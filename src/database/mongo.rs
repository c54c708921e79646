use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use super::{AttendanceStore, StoreError, UniqueKey};
use crate::models::{Admin, CheckIn, ExportRow, NewUser, RecentCheckIn, User, UserPatch};
use crate::utils::dates;

const ADMINS: &str = "admins";
const USERS: &str = "users";
const CHECK_INS: &str = "check_ins";
const DEFAULT_DB_NAME: &str = "checkin_portal";
const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, StoreError> {
        let mut client_options = ClientOptions::parse(uri).await.map_err(map_error)?;

        // One scanning station plus a dashboard; a small pool is plenty
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(Duration::from_secs(300));
        client_options.connect_timeout = Some(Duration::from_secs(5));
        client_options.server_selection_timeout = Some(Duration::from_secs(5));
        client_options.app_name = Some("checkin-portal".to_string());

        let client = Client::with_options(client_options).map_err(map_error)?;
        let db = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DB_NAME));

        db.list_collection_names().await.map_err(map_error)?;
        log::info!("✅ MongoDB connected: {}", db.name());

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the unique indexes the reconciler relies on, plus lookup indexes.
    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        log::info!("🔧 Creating database indexes...");

        let unique = |key: UniqueKey| {
            IndexOptions::builder()
                .name(key.index_name().to_string())
                .unique(true)
                .build()
        };

        self.admins()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique(UniqueKey::AdminEmail))
                    .build(),
            )
            .await
            .map_err(map_error)?;
        log::info!("   ✅ Index ready: admins(email)");

        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "university_id": 1 })
                    .options(unique(UniqueKey::UniversityId))
                    .build(),
            )
            .await
            .map_err(map_error)?;
        log::info!("   ✅ Index ready: users(university_id)");

        // Sparse: attendees without a barcode are not indexed
        let barcode_options = IndexOptions::builder()
            .name(UniqueKey::Barcode.index_name().to_string())
            .unique(true)
            .sparse(true)
            .build();
        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "barcode_id": 1 })
                    .options(barcode_options)
                    .build(),
            )
            .await
            .map_err(map_error)?;
        log::info!("   ✅ Index ready: users(barcode_id)");

        self.check_ins()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "user_id": 1, "check_in_date": 1 })
                    .options(unique(UniqueKey::CheckInDay))
                    .build(),
            )
            .await
            .map_err(map_error)?;
        log::info!("   ✅ Index ready: check_ins(user_id, check_in_date)");

        self.check_ins()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "check_in_date": -1, "check_in_time": -1 })
                    .build(),
            )
            .await
            .map_err(map_error)?;
        log::info!("   ✅ Index ready: check_ins(check_in_date, check_in_time)");

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    fn admins(&self) -> Collection<AdminDocument> {
        self.collection(ADMINS)
    }

    fn users(&self) -> Collection<UserDocument> {
        self.collection(USERS)
    }

    fn check_ins(&self) -> Collection<CheckInDocument> {
        self.collection(CHECK_INS)
    }
}

#[async_trait]
impl AttendanceStore for MongoDB {
    async fn ping(&self) -> Result<(), StoreError> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(map_error)
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, StoreError> {
        let admin = self
            .admins()
            .find_one(doc! { "email": email })
            .await
            .map_err(map_error)?;
        Ok(admin.map(Admin::from))
    }

    async fn insert_admin(&self, email: &str, password_hash: &str) -> Result<Admin, StoreError> {
        let document = AdminDocument {
            id: ObjectId::new(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        };
        self.admins().insert_one(&document).await.map_err(map_error)?;
        Ok(document.into())
    }

    async fn find_user_by_barcode(&self, barcode_id: i64) -> Result<Option<User>, StoreError> {
        let user = self
            .users()
            .find_one(doc! { "barcode_id": barcode_id })
            .await
            .map_err(map_error)?;
        Ok(user.map(User::from))
    }

    async fn find_user_by_university_id(&self, university_id: &str) -> Result<Option<User>, StoreError> {
        let user = self
            .users()
            .find_one(doc! { "university_id": university_id })
            .await
            .map_err(map_error)?;
        Ok(user.map(User::from))
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let created_at = to_bson_time(new_user.created_at);
        let document = UserDocument {
            id: ObjectId::new(),
            university_id: new_user.university_id,
            barcode_id: new_user.barcode_id,
            name: new_user.name,
            created_at,
            updated_at: created_at,
        };
        self.users().insert_one(&document).await.map_err(map_error)?;
        Ok(document.into())
    }

    async fn update_user(&self, user_id: &str, patch: &UserPatch, at: DateTime<Utc>) -> Result<User, StoreError> {
        let mut set = doc! { "updated_at": to_bson_time(at) };
        if let Some(name) = &patch.name {
            set.insert("name", name.clone());
        }
        if let Some(barcode_id) = patch.barcode_id {
            set.insert("barcode_id", barcode_id);
        }

        self.users()
            .find_one_and_update(doc! { "_id": parse_object_id(user_id)? }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await
            .map_err(map_error)?
            .map(User::from)
            .ok_or_else(|| StoreError::Backend(format!("user {} not found", user_id)))
    }

    async fn insert_check_in(&self, user_id: &str, date: NaiveDate, at: DateTime<Utc>) -> Result<CheckIn, StoreError> {
        let document = CheckInDocument {
            id: ObjectId::new(),
            user_id: parse_object_id(user_id)?,
            check_in_date: dates::format_date(date),
            check_in_time: to_bson_time(at),
        };
        self.check_ins().insert_one(&document).await.map_err(map_error)?;
        CheckIn::try_from(document)
    }

    async fn find_check_in(&self, user_id: &str, date: NaiveDate) -> Result<Option<CheckIn>, StoreError> {
        let filter = doc! {
            "user_id": parse_object_id(user_id)?,
            "check_in_date": dates::format_date(date),
        };
        self.check_ins()
            .find_one(filter)
            .await
            .map_err(map_error)?
            .map(CheckIn::try_from)
            .transpose()
    }

    async fn count_check_ins_on(&self, date: NaiveDate) -> Result<u64, StoreError> {
        self.check_ins()
            .count_documents(doc! { "check_in_date": dates::format_date(date) })
            .await
            .map_err(map_error)
    }

    async fn count_users(&self) -> Result<u64, StoreError> {
        self.users().count_documents(doc! {}).await.map_err(map_error)
    }

    async fn recent_check_ins(&self, date: NaiveDate, limit: usize) -> Result<Vec<RecentCheckIn>, StoreError> {
        // The server reads a zero limit as "no limit"
        if limit == 0 {
            return Ok(Vec::new());
        }

        let check_ins: Vec<CheckInDocument> = self
            .check_ins()
            .find(doc! { "check_in_date": dates::format_date(date) })
            .sort(doc! { "check_in_time": -1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await
            .map_err(map_error)?
            .try_collect()
            .await
            .map_err(map_error)?;

        if check_ins.is_empty() {
            return Ok(Vec::new());
        }

        let user_ids: Vec<ObjectId> = check_ins.iter().map(|c| c.user_id).collect();
        let names: HashMap<ObjectId, Option<String>> = self
            .users()
            .find(doc! { "_id": { "$in": user_ids } })
            .await
            .map_err(map_error)?
            .try_collect::<Vec<UserDocument>>()
            .await
            .map_err(map_error)?
            .into_iter()
            .map(|user| (user.id, user.name))
            .collect();

        check_ins
            .into_iter()
            .map(|document| {
                let user_name = names.get(&document.user_id).cloned().flatten();
                Ok(RecentCheckIn {
                    check_in: CheckIn::try_from(document)?,
                    user_name,
                })
            })
            .collect()
    }

    async fn check_ins_for_user(&self, user_id: &str) -> Result<Vec<CheckIn>, StoreError> {
        let documents: Vec<CheckInDocument> = self
            .check_ins()
            .find(doc! { "user_id": parse_object_id(user_id)? })
            .sort(doc! { "check_in_date": -1, "check_in_time": -1 })
            .await
            .map_err(map_error)?
            .try_collect()
            .await
            .map_err(map_error)?;

        documents.into_iter().map(CheckIn::try_from).collect()
    }

    async fn export_rows(&self) -> Result<Vec<ExportRow>, StoreError> {
        let pipeline = vec![
            doc! { "$sort": { "check_in_date": -1, "check_in_time": -1 } },
            doc! { "$lookup": {
                "from": USERS,
                "localField": "user_id",
                "foreignField": "_id",
                "as": "user",
            } },
            doc! { "$unwind": "$user" },
            doc! { "$project": {
                "_id": 0,
                "university_id": "$user.university_id",
                "check_in_date": 1,
                "check_in_time": 1,
            } },
        ];

        let rows: Vec<ExportDocument> = self
            .check_ins()
            .aggregate(pipeline)
            .await
            .map_err(map_error)?
            .with_type::<ExportDocument>()
            .try_collect()
            .await
            .map_err(map_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(ExportRow {
                    university_id: row.university_id,
                    check_in_date: parse_date(&row.check_in_date)?,
                    check_in_time: from_bson_time(row.check_in_time),
                })
            })
            .collect()
    }
}

// ==================== DOCUMENTS ====================

#[derive(Debug, Serialize, Deserialize)]
struct AdminDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    email: String,
    password_hash: String,
}

impl From<AdminDocument> for Admin {
    fn from(document: AdminDocument) -> Self {
        Self {
            id: document.id.to_hex(),
            email: document.email,
            password_hash: document.password_hash,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    university_id: String,
    // Left out entirely when unset so the sparse unique index skips it
    #[serde(skip_serializing_if = "Option::is_none", default)]
    barcode_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    name: Option<String>,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

impl From<UserDocument> for User {
    fn from(document: UserDocument) -> Self {
        Self {
            id: document.id.to_hex(),
            university_id: document.university_id,
            barcode_id: document.barcode_id,
            name: document.name,
            created_at: from_bson_time(document.created_at),
            updated_at: from_bson_time(document.updated_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CheckInDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    user_id: ObjectId,
    /// `YYYY-MM-DD` in America/New_York.
    check_in_date: String,
    check_in_time: BsonDateTime,
}

impl TryFrom<CheckInDocument> for CheckIn {
    type Error = StoreError;

    fn try_from(document: CheckInDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: document.id.to_hex(),
            user_id: document.user_id.to_hex(),
            check_in_date: parse_date(&document.check_in_date)?,
            check_in_time: from_bson_time(document.check_in_time),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ExportDocument {
    university_id: String,
    check_in_date: String,
    check_in_time: BsonDateTime,
}

// ==================== HELPERS ====================

fn to_bson_time(at: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(at.timestamp_millis())
}

fn from_bson_time(at: BsonDateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or_default()
}

fn parse_object_id(id: &str) -> Result<ObjectId, StoreError> {
    ObjectId::parse_str(id).map_err(|e| StoreError::Backend(format!("invalid object id {}: {}", id, e)))
}

fn parse_date(raw: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw, dates::DATE_FORMAT)
        .map_err(|e| StoreError::Backend(format!("invalid check_in_date {}: {}", raw, e)))
}

/// Server error message for E11000 names the index that collided.
fn duplicate_key_from_message(message: &str) -> Option<UniqueKey> {
    UniqueKey::ALL
        .into_iter()
        .find(|key| message.contains(key.index_name()))
}

fn map_error(err: MongoError) -> StoreError {
    let duplicate_message = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY_CODE => {
            Some(write_error.message.as_str())
        }
        ErrorKind::Command(command_error) if command_error.code == DUPLICATE_KEY_CODE => {
            Some(command_error.message.as_str())
        }
        _ => None,
    };

    match duplicate_message.and_then(duplicate_key_from_message) {
        Some(key) => StoreError::Duplicate(key),
        None => StoreError::Backend(err.to_string()),
    }
}
