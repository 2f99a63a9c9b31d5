use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::{FindOptions, ReplaceOptions},
    Client, ClientSession, Database,
};
use tracing::warn;

use super::{Collection, CollectionRef, DocRef, DocumentStore, StoredDoc, WriteOp};
use crate::error::StoreError;

const OWNER: &str = "user_id";
const DOC_ID: &str = "doc_id";

/// Each logical collection maps to one Mongo collection; the owner (null for
/// the catalog) and the document id are stored alongside the fields.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub fn new(client: Client, db: Database) -> Self {
        MongoStore { client, db }
    }

    fn collection(&self, c: Collection) -> mongodb::Collection<Document> {
        self.db.collection::<Document>(c.name())
    }

    fn owner(collection: &CollectionRef) -> Bson {
        match &collection.owner {
            Some(user_id) => Bson::String(user_id.as_str().to_string()),
            None => Bson::Null,
        }
    }

    fn filter(target: &DocRef) -> Document {
        doc! { "user_id": Self::owner(&target.parent), "doc_id": target.id.as_str() }
    }

    fn stored(target: &DocRef, mut fields: Document) -> Document {
        fields.insert(OWNER, Self::owner(&target.parent));
        fields.insert(DOC_ID, target.id.as_str());
        fields
    }

    fn strip(mut raw: Document) -> StoredDoc {
        raw.remove("_id");
        raw.remove(OWNER);
        let id = match raw.remove(DOC_ID) {
            Some(Bson::String(s)) => s,
            _ => String::new(),
        };
        StoredDoc { id, fields: raw }
    }

    async fn apply_in_session(&self, session: &mut ClientSession, ops: &[WriteOp]) -> Result<(), StoreError> {
        for op in ops {
            let target = op.target();
            let col = self.collection(target.parent.collection);
            match op {
                WriteOp::Create { fields, .. } => {
                    // the (user_id, doc_id) unique index turns a reused id into an error
                    col.insert_one_with_session(Self::stored(target, fields.clone()), None, session)
                        .await?;
                }
                WriteOp::Delete { .. } => {
                    let res = col
                        .delete_one_with_session(Self::filter(target), None, session)
                        .await?;
                    if res.deleted_count == 0 {
                        return Err(StoreError::Rejected(format!("{target} does not exist")));
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn list(&self, collection: &CollectionRef) -> Result<Vec<StoredDoc>, StoreError> {
        let col = self.collection(collection.collection);
        let find_opts = FindOptions::builder().sort(doc! { "doc_id": 1 }).build();

        let mut cursor = col
            .find(doc! { "user_id": Self::owner(collection) }, find_opts)
            .await?;

        let mut out: Vec<StoredDoc> = vec![];
        while let Some(res) = cursor.next().await {
            out.push(Self::strip(res?));
        }
        Ok(out)
    }

    async fn get(&self, target: &DocRef) -> Result<Option<Document>, StoreError> {
        let col = self.collection(target.parent.collection);
        let found = col.find_one(Self::filter(target), None).await?;
        Ok(found.map(|raw| Self::strip(raw).fields))
    }

    async fn set(&self, target: &DocRef, fields: Document) -> Result<(), StoreError> {
        let col = self.collection(target.parent.collection);
        col.replace_one(
            Self::filter(target),
            Self::stored(target, fields),
            ReplaceOptions::builder().upsert(true).build(),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, target: &DocRef) -> Result<(), StoreError> {
        let col = self.collection(target.parent.collection);
        col.delete_one(Self::filter(target), None).await?;
        Ok(())
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        if ops.is_empty() {
            return Ok(());
        }

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        match self.apply_in_session(&mut session, &ops).await {
            Ok(()) => {
                session.commit_transaction().await?;
                Ok(())
            }
            Err(e) => {
                if let Err(abort) = session.abort_transaction().await {
                    warn!(error = %abort, "abort_transaction failed");
                }
                Err(e)
            }
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}
