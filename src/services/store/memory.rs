use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use mongodb::bson::Document;

use super::{CollectionRef, DocRef, DocumentStore, StoredDoc, WriteOp};
use crate::error::StoreError;

/// Injected misbehaviour, for exercising error paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Every call fails.
    Offline,
    /// Batches are refused; single reads and writes still work.
    RejectBatches(String),
    /// Only the n-th write (counting from zero, batches included) fails.
    FailNthWrite(usize),
    /// The first n writes succeed, after that every call fails.
    OfflineAfterWrites(usize),
}

#[derive(Debug, Default)]
struct Inner {
    collections: BTreeMap<CollectionRef, BTreeMap<String, Document>>,
    failure: Option<Failure>,
    writes: usize,
}

impl Inner {
    fn check_read(&self) -> Result<(), StoreError> {
        match self.failure {
            Some(Failure::Offline) => Err(StoreError::Unavailable("store offline".into())),
            Some(Failure::OfflineAfterWrites(n)) if self.writes >= n => {
                Err(StoreError::Unavailable("store offline".into()))
            }
            _ => Ok(()),
        }
    }

    fn check_write(&mut self) -> Result<(), StoreError> {
        self.check_read()?;

        let idx = self.writes;
        self.writes += 1;

        match self.failure {
            Some(Failure::FailNthWrite(n)) if idx == n => {
                Err(StoreError::Unavailable(format!("injected failure on write #{idx}")))
            }
            Some(Failure::OfflineAfterWrites(n)) if idx >= n => {
                Err(StoreError::Unavailable("store offline".into()))
            }
            _ => Ok(()),
        }
    }
}

/// Process-local store. Used by the dev server and by the tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Installs a failure mode and restarts the write counter.
    pub fn fail_with(&self, failure: Failure) {
        let mut inner = self.lock();
        inner.failure = Some(failure);
        inner.writes = 0;
    }

    pub fn heal(&self) {
        let mut inner = self.lock();
        inner.failure = None;
        inner.writes = 0;
    }

    /// Seeds a document, bypassing failure injection.
    pub fn insert(&self, target: &DocRef, fields: Document) {
        self.lock()
            .collections
            .entry(target.parent.clone())
            .or_default()
            .insert(target.id.clone(), fields);
    }

    /// Reads a document, bypassing failure injection.
    pub fn document(&self, target: &DocRef) -> Option<Document> {
        self.lock()
            .collections
            .get(&target.parent)
            .and_then(|docs| docs.get(&target.id))
            .cloned()
    }

    /// Lists a collection, bypassing failure injection.
    pub fn documents(&self, collection: &CollectionRef) -> Vec<StoredDoc> {
        snapshot(&self.lock(), collection)
    }
}

fn snapshot(inner: &Inner, collection: &CollectionRef) -> Vec<StoredDoc> {
    inner
        .collections
        .get(collection)
        .map(|docs| {
            docs.iter()
                .map(|(id, fields)| StoredDoc {
                    id: id.clone(),
                    fields: fields.clone(),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: &CollectionRef) -> Result<Vec<StoredDoc>, StoreError> {
        let inner = self.lock();
        inner.check_read()?;
        Ok(snapshot(&inner, collection))
    }

    async fn get(&self, target: &DocRef) -> Result<Option<Document>, StoreError> {
        let inner = self.lock();
        inner.check_read()?;
        Ok(inner
            .collections
            .get(&target.parent)
            .and_then(|docs| docs.get(&target.id))
            .cloned())
    }

    async fn set(&self, target: &DocRef, fields: Document) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.check_write()?;
        inner
            .collections
            .entry(target.parent.clone())
            .or_default()
            .insert(target.id.clone(), fields);
        Ok(())
    }

    async fn delete(&self, target: &DocRef) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.check_write()?;
        if let Some(docs) = inner.collections.get_mut(&target.parent) {
            docs.remove(&target.id);
        }
        Ok(())
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.check_write()?;
        if let Some(Failure::RejectBatches(reason)) = &inner.failure {
            return Err(StoreError::Rejected(reason.clone()));
        }

        // stage on a copy, publish only if every op applies
        let mut staged = inner.collections.clone();
        for op in ops {
            match op {
                WriteOp::Create { target, fields } => {
                    let docs = staged.entry(target.parent.clone()).or_default();
                    if docs.contains_key(&target.id) {
                        return Err(StoreError::Rejected(format!("{target} already exists")));
                    }
                    docs.insert(target.id, fields);
                }
                WriteOp::Delete { target } => {
                    let removed = staged
                        .get_mut(&target.parent)
                        .and_then(|docs| docs.remove(&target.id));
                    if removed.is_none() {
                        return Err(StoreError::Rejected(format!("{target} does not exist")));
                    }
                }
            }
        }

        inner.collections = staged;
        Ok(())
    }
}
