//! In-process alert store with the same compare-and-set rules as the Mongo
//! one. Used for dry runs and by the monitor tests.

use std::collections::HashMap;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use crate::{
    error::StoreError,
    models::{Alert, FirePatch, User},
};

use super::alert_store::{AlertStore, OwnerDirectory};

#[derive(Default)]
pub struct MemoryAlertStore {
    alerts: RwLock<HashMap<ObjectId, Alert>>,
    users: RwLock<HashMap<ObjectId, User>>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_alert(&self, alert: Alert) {
        self.alerts.write().await.insert(alert.id, alert);
    }

    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn get(&self, id: ObjectId) -> Option<Alert> {
        self.alerts.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: ObjectId) -> Option<Alert> {
        self.alerts.write().await.remove(&id)
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn find_active(&self) -> Result<Vec<Alert>, StoreError> {
        let alerts = self.alerts.read().await;
        let mut items: Vec<Alert> = alerts.values().filter(|a| a.is_active).cloned().collect();
        items.sort_by_key(|a| a.created_at);
        Ok(items)
    }

    async fn conditional_update(
        &self,
        alert_id: ObjectId,
        owner_id: ObjectId,
        patch: &FirePatch,
    ) -> Result<bool, StoreError> {
        let mut alerts = self.alerts.write().await;

        let Some(alert) = alerts.get_mut(&alert_id) else {
            return Ok(false);
        };
        if alert.user_id != owner_id
            || !alert.is_active
            || alert.last_triggered_at != patch.expected_last_triggered_at
            || alert.frequency != patch.expected_frequency
        {
            return Ok(false);
        }

        alert.is_triggered = patch.is_triggered;
        alert.last_triggered_at = Some(patch.last_triggered_at);
        alert.is_active = patch.is_active;
        Ok(true)
    }
}

#[async_trait]
impl OwnerDirectory for MemoryAlertStore {
    async fn find_owner(&self, owner_id: ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&owner_id).cloned())
    }
}
