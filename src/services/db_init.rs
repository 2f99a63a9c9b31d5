use mongodb::{
    bson::doc,
    options::IndexOptions,
    Database, IndexModel,
};

use super::store::Collection;
use crate::error::StoreError;

pub async fn ensure_indexes(db: &Database) -> Result<(), StoreError> {
    // every logical collection: unique per (user_id, doc_id); catalog owner is null
    for c in [Collection::Products, Collection::Cart, Collection::Orders, Collection::CheckoutIntents] {
        let col = db.collection::<mongodb::bson::Document>(c.name());
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "doc_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None).await?;
    }

    // orders: history is read oldest first
    {
        let col = db.collection::<mongodb::bson::Document>(Collection::Orders.name());
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    Ok(())
}
