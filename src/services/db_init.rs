use mongodb::{
    bson::doc,
    options::IndexOptions,
    Database, IndexModel,
};

use crate::error::StoreError;

use super::alert_store::{ALERTS, USERS};

pub async fn ensure_indexes(db: &Database) -> Result<(), StoreError> {
    // users: unique email
    {
        let col = db.collection::<mongodb::bson::Document>(USERS);
        let model = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None).await?;
    }

    // alerts: monitor scan (is_active + symbol)
    {
        let col = db.collection::<mongodb::bson::Document>(ALERTS);
        let model = IndexModel::builder()
            .keys(doc! { "is_active": 1, "symbol": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    // alerts: per-user listing, newest first
    {
        let col = db.collection::<mongodb::bson::Document>(ALERTS);
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .build();

        col.create_index(model, None).await?;
    }

    Ok(())
}
