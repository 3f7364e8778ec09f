use async_trait::async_trait;
use chrono::NaiveDate;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{self, doc, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOptions, IndexOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

use crate::models::{midnight_utc, EntryKind, EntryPatch, LedgerEntry, Role, User, UserStatus};
use crate::services::authorization::RoleLookup;
use crate::services::error::ROLE_EXISTS;
use crate::services::summary::RecordStore;

const DUPLICATE_KEY: i32 = 11000;

/// Every read outside registration goes through this filter.
fn live() -> Document {
    doc! { "deleted": { "$ne": true } }
}

fn live_with(mut filter: Document) -> Document {
    filter.insert("deleted", doc! { "$ne": true });
    filter
}

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for finance-service");

        // Unique across soft-deleted users too, so a deleted identity is never reused
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_email_unique".to_string())
                    .unique(true)
                    .build(),
            )
            .build();
        self.users()
            .create_index(email_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create email index on users collection: {}", e);
                AppError::from(e)
            })?;

        // Only live roles are indexed, so a soft-deleted name can be reused
        let role_name_index = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(
                IndexOptions::builder()
                    .name("role_name_unique".to_string())
                    .unique(true)
                    .partial_filter_expression(doc! { "deleted": false })
                    .build(),
            )
            .build();
        self.roles()
            .create_index(role_name_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create name index on roles collection: {}", e);
                AppError::from(e)
            })?;

        for kind in [EntryKind::Income, EntryKind::Expense] {
            let date_index = IndexModel::builder()
                .keys(doc! { "date": 1 })
                .options(
                    IndexOptions::builder()
                        .name(format!("{}_date_lookup", kind))
                        .build(),
                )
                .build();
            self.entries(kind)
                .create_index(date_index, None)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to create date index on {} collection: {}",
                        kind.collection(),
                        e
                    );
                    AppError::from(e)
                })?;
        }

        tracing::info!("MongoDB indexes ready");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    pub fn roles(&self) -> Collection<Role> {
        self.db.collection("roles")
    }

    pub fn entries(&self, kind: EntryKind) -> Collection<LedgerEntry> {
        self.db.collection(kind.collection())
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // Users

    /// Looks up an email among live and soft-deleted users alike.
    pub async fn find_user_by_email_including_deleted(
        &self,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        Ok(self.users().find_one(doc! { "email": email }, None).await?)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users()
            .find_one(live_with(doc! { "email": email }), None)
            .await?)
    }

    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users()
            .find_one(live_with(doc! { "_id": id }), None)
            .await?)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let options = FindOptions::builder().sort(doc! { "created_at": 1 }).build();
        let cursor = self.users().find(live(), options).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        self.users().insert_one(user, None).await?;
        Ok(())
    }

    /// Returns false when no live user has `email`.
    pub async fn set_user_status(&self, email: &str, status: UserStatus) -> Result<bool, AppError> {
        let result = self
            .users()
            .update_one(
                live_with(doc! { "email": email }),
                doc! { "$set": {
                    "status": status.as_str(),
                    "updated_at": bson::DateTime::now()
                } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    /// Assigns `role_id` and activates the user.
    pub async fn approve_user(&self, email: &str, role_id: &str) -> Result<bool, AppError> {
        let result = self
            .users()
            .update_one(
                live_with(doc! { "email": email }),
                doc! { "$set": {
                    "role_id": role_id,
                    "status": UserStatus::Active.as_str(),
                    "updated_at": bson::DateTime::now()
                } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn soft_delete_user(&self, id: &str) -> Result<bool, AppError> {
        soft_delete(&self.users(), id).await
    }

    // Roles

    pub async fn list_roles(&self) -> Result<Vec<Role>, AppError> {
        let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
        let cursor = self.roles().find(live(), options).await?;
        Ok(cursor.try_collect().await?)
    }

    /// Fails with `Conflict` when a live role already has this name.
    pub async fn insert_role(&self, role: &Role) -> Result<(), AppError> {
        match self.roles().insert_one(role, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => {
                tracing::info!(role = %role.name, "Rejected duplicate role name");
                Err(AppError::Conflict(anyhow::anyhow!(ROLE_EXISTS)))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn soft_delete_role(&self, id: &str) -> Result<bool, AppError> {
        soft_delete(&self.roles(), id).await
    }

    // Ledger entries

    pub async fn list_entries(&self, kind: EntryKind) -> Result<Vec<LedgerEntry>, AppError> {
        let options = FindOptions::builder().sort(doc! { "date": -1 }).build();
        let cursor = self.entries(kind).find(live(), options).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn find_entry(&self, kind: EntryKind, id: &str) -> Result<Option<LedgerEntry>, AppError> {
        Ok(self
            .entries(kind)
            .find_one(live_with(doc! { "_id": id }), None)
            .await?)
    }

    pub async fn insert_entry(&self, kind: EntryKind, entry: &LedgerEntry) -> Result<(), AppError> {
        self.entries(kind).insert_one(entry, None).await?;
        Ok(())
    }

    /// Applies the present fields of `patch`. Returns false when `id` does not
    /// name a live entry.
    pub async fn update_entry(
        &self,
        kind: EntryKind,
        id: &str,
        patch: &EntryPatch,
    ) -> Result<bool, AppError> {
        let mut set = doc! { "updated_at": bson::DateTime::now() };
        if let Some(label) = &patch.label {
            set.insert("label", label.as_str());
        }
        if let Some(date) = patch.date {
            set.insert("date", bson::DateTime::from_chrono(midnight_utc(date)));
        }
        if let Some(amount) = patch.amount {
            set.insert("amount", amount);
        }

        let result = self
            .entries(kind)
            .update_one(live_with(doc! { "_id": id }), doc! { "$set": set }, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn soft_delete_entry(&self, kind: EntryKind, id: &str) -> Result<bool, AppError> {
        soft_delete(&self.entries(kind), id).await
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

async fn soft_delete<T: Send + Sync>(collection: &Collection<T>, id: &str) -> Result<bool, AppError> {
    let now = bson::DateTime::now();
    let result = collection
        .update_one(
            live_with(doc! { "_id": id }),
            doc! { "$set": { "deleted": true, "deleted_at": now, "updated_at": now } },
            None,
        )
        .await?;
    Ok(result.matched_count > 0)
}

#[async_trait]
impl RoleLookup for MongoDb {
    async fn find_role_by_id(&self, id: &str) -> Result<Option<Role>, anyhow::Error> {
        self.roles()
            .find_one(live_with(doc! { "_id": id }), None)
            .await
            .map_err(anyhow::Error::new)
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, anyhow::Error> {
        self.roles()
            .find_one(live_with(doc! { "name": name }), None)
            .await
            .map_err(anyhow::Error::new)
    }
}

#[async_trait]
impl RecordStore for MongoDb {
    async fn find_entries_since(
        &self,
        kind: EntryKind,
        since: NaiveDate,
    ) -> Result<Vec<LedgerEntry>, anyhow::Error> {
        let filter = live_with(doc! {
            "date": { "$gte": bson::DateTime::from_chrono(midnight_utc(since)) }
        });
        let options = FindOptions::builder().sort(doc! { "date": 1 }).build();
        let cursor = self.entries(kind).find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }
}
