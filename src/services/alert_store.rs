use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson},
    Collection, Database,
};

use crate::{
    error::StoreError,
    models::{Alert, FirePatch, Frequency, User},
};

pub const ALERTS: &str = "alerts";
pub const USERS: &str = "users";

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn find_active(&self) -> Result<Vec<Alert>, StoreError>;

    /// Applies `patch` only if the alert still exists for `owner_id`, is
    /// still active, and still carries the `last_triggered_at` and
    /// `frequency` the caller saw. Returns whether anything was updated.
    async fn conditional_update(
        &self,
        alert_id: ObjectId,
        owner_id: ObjectId,
        patch: &FirePatch,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    async fn find_owner(&self, owner_id: ObjectId) -> Result<Option<User>, StoreError>;
}

#[derive(Clone)]
pub struct MongoAlertStore {
    db: Database,
}

impl MongoAlertStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn alerts(&self) -> Collection<Alert> {
        self.db.collection::<Alert>(ALERTS)
    }
}

fn opt_ts(v: Option<i64>) -> Bson {
    v.map(Bson::Int64).unwrap_or(Bson::Null)
}

// documents without a frequency deserialize as `once`
fn frequency_filter(f: Frequency) -> Bson {
    match f {
        Frequency::Once => Bson::Document(doc! { "$in": ["once", Bson::Null] }),
        other => Bson::String(other.as_str().to_string()),
    }
}

#[async_trait]
impl AlertStore for MongoAlertStore {
    async fn find_active(&self) -> Result<Vec<Alert>, StoreError> {
        let mut cursor = self.alerts().find(doc! { "is_active": true }, None).await?;

        let mut items = Vec::new();
        while let Some(item) = cursor.next().await {
            items.push(item?);
        }

        Ok(items)
    }

    async fn conditional_update(
        &self,
        alert_id: ObjectId,
        owner_id: ObjectId,
        patch: &FirePatch,
    ) -> Result<bool, StoreError> {
        // `null` also matches documents where the field is missing
        let filter = doc! {
            "_id": alert_id,
            "user_id": owner_id,
            "is_active": true,
            "last_triggered_at": opt_ts(patch.expected_last_triggered_at),
            "frequency": frequency_filter(patch.expected_frequency),
        };
        let update = doc! {
            "$set": {
                "is_triggered": patch.is_triggered,
                "last_triggered_at": patch.last_triggered_at,
                "is_active": patch.is_active,
            }
        };

        let res = self.alerts().update_one(filter, update, None).await?;
        Ok(res.matched_count > 0)
    }
}

#[async_trait]
impl OwnerDirectory for MongoAlertStore {
    async fn find_owner(&self, owner_id: ObjectId) -> Result<Option<User>, StoreError> {
        let users = self.db.collection::<User>(USERS);
        Ok(users.find_one(doc! { "_id": owner_id }, None).await?)
    }
}
