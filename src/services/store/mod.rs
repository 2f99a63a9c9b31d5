//! Document store abstraction the checkout core talks to.
//!
//! Documents are addressed the way the mobile backend laid them out:
//! `users/{uid}/{collection}/{id}` for per-user data and `products/{id}` for
//! the shared catalog. A path carries its owner, if it has one.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

use crate::{error::StoreError, models::UserId};

pub mod intent_log;
pub mod memory;
pub mod mongo;

pub use intent_log::IntentLogged;
pub use memory::{Failure, MemoryStore};
pub use mongo::MongoStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Products,
    Cart,
    Orders,
    CheckoutIntents,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Cart => "cart",
            Collection::Orders => "orders",
            Collection::CheckoutIntents => "checkout_intents",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionRef {
    /// `None` for collections shared by every user.
    pub owner: Option<UserId>,
    pub collection: Collection,
}

impl CollectionRef {
    pub fn new(user_id: &UserId, collection: Collection) -> Self {
        CollectionRef {
            owner: Some(user_id.clone()),
            collection,
        }
    }

    pub fn products() -> Self {
        CollectionRef {
            owner: None,
            collection: Collection::Products,
        }
    }

    pub fn cart(user_id: &UserId) -> Self {
        Self::new(user_id, Collection::Cart)
    }

    pub fn orders(user_id: &UserId) -> Self {
        Self::new(user_id, Collection::Orders)
    }

    pub fn intents(user_id: &UserId) -> Self {
        Self::new(user_id, Collection::CheckoutIntents)
    }

    pub fn doc(&self, id: impl Into<String>) -> DocRef {
        DocRef {
            parent: self.clone(),
            id: id.into(),
        }
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(user_id) => write!(f, "users/{}/{}", user_id, self.collection.name()),
            None => f.write_str(self.collection.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocRef {
    pub parent: CollectionRef,
    pub id: String,
}

impl fmt::Display for DocRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.parent, self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDoc {
    pub id: String,
    pub fields: Document,
}

/// One staged mutation of an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Must target an id that does not exist yet.
    Create { target: DocRef, fields: Document },
    /// Must target a document that exists.
    Delete { target: DocRef },
}

impl WriteOp {
    pub fn target(&self) -> &DocRef {
        match self {
            WriteOp::Create { target, .. } | WriteOp::Delete { target } => target,
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self, collection: &CollectionRef) -> Result<Vec<StoredDoc>, StoreError>;

    async fn get(&self, target: &DocRef) -> Result<Option<Document>, StoreError>;

    /// Creates or overwrites a single document.
    async fn set(&self, target: &DocRef, fields: Document) -> Result<(), StoreError>;

    /// Deleting a missing document is not an error.
    async fn delete(&self, target: &DocRef) -> Result<(), StoreError>;

    /// Applies every op or none of them.
    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;

    /// Settles batches a previous process left half-applied for this user.
    /// Returns how many were rolled back.
    async fn recover(&self, _user_id: &UserId) -> Result<usize, StoreError> {
        Ok(0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    async fn list(&self, collection: &CollectionRef) -> Result<Vec<StoredDoc>, StoreError> {
        (**self).list(collection).await
    }

    async fn get(&self, target: &DocRef) -> Result<Option<Document>, StoreError> {
        (**self).get(target).await
    }

    async fn set(&self, target: &DocRef, fields: Document) -> Result<(), StoreError> {
        (**self).set(target, fields).await
    }

    async fn delete(&self, target: &DocRef) -> Result<(), StoreError> {
        (**self).delete(target).await
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        (**self).batch_write(ops).await
    }

    async fn recover(&self, user_id: &UserId) -> Result<usize, StoreError> {
        (**self).recover(user_id).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        (**self).ping().await
    }
}
