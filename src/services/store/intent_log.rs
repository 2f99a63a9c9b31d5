//! Atomic batches over a store that only guarantees single-document writes.
//!
//! A batch first persists an intent record holding enough to undo every op
//! (the prior content of each deleted document). The ops are then applied one
//! by one and the intent is flipped to `committed`; that flip is the commit
//! point. If an op fails the applied prefix is undone in reverse order. An
//! intent still `pending` when [`DocumentStore::recover`] runs is rolled back,
//! a `committed` one is simply dropped. Intents of batches still running in
//! this process are left alone; an unreadable intent record is skipped.

use std::{
    collections::HashSet,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::{self, oid::ObjectId, Document};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::{Collection, CollectionRef, DocRef, DocumentStore, StoredDoc, WriteOp};
use crate::{error::StoreError, models::UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum IntentStatus {
    Pending,
    Committed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum UndoStep {
    // undo: delete the created document
    Created { collection: Collection, id: String },
    // undo: put the prior document back
    Deleted { collection: Collection, id: String, prior: Document },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IntentRecord {
    status: IntentStatus,
    opened_at: i64,
    steps: Vec<UndoStep>,
}

/// Marks an intent id as owned by a running batch until dropped.
struct LiveIntent<'a> {
    live: &'a Mutex<HashSet<String>>,
    id: String,
}

impl<'a> LiveIntent<'a> {
    fn claim(live: &'a Mutex<HashSet<String>>, id: String) -> Self {
        live.lock().unwrap_or_else(PoisonError::into_inner).insert(id.clone());
        LiveIntent { live, id }
    }
}

impl Drop for LiveIntent<'_> {
    fn drop(&mut self) {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Wraps a store so that [`DocumentStore::batch_write`] is all-or-nothing.
#[derive(Debug)]
pub struct IntentLogged<S> {
    inner: S,
    live: Mutex<HashSet<String>>,
}

impl<S: DocumentStore> IntentLogged<S> {
    pub fn new(inner: S) -> Self {
        IntentLogged {
            inner,
            live: Mutex::new(HashSet::new()),
        }
    }

    fn is_live(&self, intent_id: &str) -> bool {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(intent_id)
    }

    async fn apply(&self, op: &WriteOp) -> Result<(), StoreError> {
        match op {
            WriteOp::Create { target, fields } => self.inner.set(target, fields.clone()).await,
            WriteOp::Delete { target } => self.inner.delete(target).await,
        }
    }

    /// Undoes `steps` newest first. Every undo is idempotent, so a rollback
    /// can be repeated after a partial one.
    async fn roll_back(&self, user_id: &UserId, steps: &[UndoStep]) -> Result<(), StoreError> {
        for step in steps.iter().rev() {
            match step {
                UndoStep::Created { collection, id } => {
                    let target = CollectionRef::new(user_id, *collection).doc(id.clone());
                    self.inner.delete(&target).await?;
                }
                UndoStep::Deleted { collection, id, prior } => {
                    let target = CollectionRef::new(user_id, *collection).doc(id.clone());
                    self.inner.set(&target, prior.clone()).await?;
                }
            }
        }
        Ok(())
    }

    async fn write_intent(&self, target: &DocRef, record: &IntentRecord) -> Result<(), StoreError> {
        let fields = bson::to_document(record)?;
        self.inner.set(target, fields).await
    }

    /// Checks preconditions and captures what is needed to undo each op.
    async fn plan(&self, ops: &[WriteOp]) -> Result<Vec<UndoStep>, StoreError> {
        let mut steps = Vec::with_capacity(ops.len());
        for op in ops {
            match op {
                WriteOp::Create { target, .. } => {
                    if self.inner.get(target).await?.is_some() {
                        return Err(StoreError::Rejected(format!("{target} already exists")));
                    }
                    steps.push(UndoStep::Created {
                        collection: target.parent.collection,
                        id: target.id.clone(),
                    });
                }
                WriteOp::Delete { target } => {
                    let Some(prior) = self.inner.get(target).await? else {
                        return Err(StoreError::Rejected(format!("{target} does not exist")));
                    };
                    steps.push(UndoStep::Deleted {
                        collection: target.parent.collection,
                        id: target.id.clone(),
                        prior,
                    });
                }
            }
        }
        Ok(steps)
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for IntentLogged<S> {
    async fn list(&self, collection: &CollectionRef) -> Result<Vec<StoredDoc>, StoreError> {
        self.inner.list(collection).await
    }

    async fn get(&self, target: &DocRef) -> Result<Option<Document>, StoreError> {
        self.inner.get(target).await
    }

    async fn set(&self, target: &DocRef, fields: Document) -> Result<(), StoreError> {
        self.inner.set(target, fields).await
    }

    async fn delete(&self, target: &DocRef) -> Result<(), StoreError> {
        self.inner.delete(target).await
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let Some(first) = ops.first() else {
            return Ok(());
        };
        let Some(user_id) = first.target().parent.owner.clone() else {
            return Err(StoreError::Rejected("catalog documents cannot join a batch".into()));
        };
        if ops
            .iter()
            .any(|op| op.target().parent.owner.as_ref() != Some(&user_id))
        {
            return Err(StoreError::Rejected("a batch may only touch one user's documents".into()));
        }

        let steps = self.plan(&ops).await?;
        let intent = CollectionRef::intents(&user_id).doc(ObjectId::new().to_hex());
        let _live = LiveIntent::claim(&self.live, intent.id.clone());
        let mut record = IntentRecord {
            status: IntentStatus::Pending,
            opened_at: Utc::now().timestamp_millis(),
            steps,
        };
        self.write_intent(&intent, &record).await?;

        let mut failure = None;
        for (applied, op) in ops.iter().enumerate() {
            if let Err(e) = self.apply(op).await {
                failure = Some((applied, e));
                break;
            }
        }

        let failure = match failure {
            Some(f) => Some(f),
            None => {
                record.status = IntentStatus::Committed;
                match self.write_intent(&intent, &record).await {
                    Ok(()) => None,
                    Err(e) => Some((ops.len(), e)),
                }
            }
        };

        if let Some((applied, e)) = failure {
            warn!(%intent, applied, error = %e, "batch failed, compensating");
            if let Err(undo) = self.roll_back(&user_id, &record.steps[..applied]).await {
                // intent stays pending; recover() finishes the rollback later
                error!(%intent, error = %undo, "compensation failed");
                return Err(e);
            }
            if let Err(cleanup) = self.inner.delete(&intent).await {
                warn!(%intent, error = %cleanup, "could not drop rolled back intent");
            }
            return Err(e);
        }

        if let Err(e) = self.inner.delete(&intent).await {
            // committed intents are harmless, recover() drops them
            warn!(%intent, error = %e, "could not drop committed intent");
        }
        Ok(())
    }

    async fn recover(&self, user_id: &UserId) -> Result<usize, StoreError> {
        let intents = self.inner.list(&CollectionRef::intents(user_id)).await?;
        let mut rolled_back = 0;

        for stored in intents {
            let target = CollectionRef::intents(user_id).doc(stored.id.clone());
            if self.is_live(&stored.id) {
                debug!(intent = %target, "batch still running, leaving intent alone");
                continue;
            }

            let record: IntentRecord = match bson::from_document(stored.fields) {
                Ok(record) => record,
                Err(e) => {
                    warn!(intent = %target, error = %e, "skipping unreadable intent record");
                    continue;
                }
            };

            if record.status == IntentStatus::Pending {
                self.roll_back(user_id, &record.steps).await?;
                rolled_back += 1;
                info!(intent = %target, steps = record.steps.len(), "rolled back unfinished batch");
            }
            self.inner.delete(&target).await?;
        }

        Ok(rolled_back)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}
