use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use tokio::sync::Notify;

use closetmarket::{
    error::{CheckoutError, StoreError},
    models::{Selection, UserId},
    services::{
        cart_service, checkout_service,
        store::{
            Collection, CollectionRef, DocRef, DocumentStore, Failure, IntentLogged, MemoryStore, StoredDoc, WriteOp,
        },
    },
};

fn user() -> UserId {
    UserId::new("shopper-7")
}

fn setup() -> (Arc<MemoryStore>, IntentLogged<Arc<MemoryStore>>) {
    let mem = Arc::new(MemoryStore::new());
    let cart = CollectionRef::cart(&user());
    mem.insert(
        &cart.doc("1"),
        doc! { "productId": "prod-a", "name": "Silk scarf", "price": 12.5, "imageUrl": "a.jpg" },
    );
    mem.insert(
        &cart.doc("2"),
        doc! { "productId": "prod-b", "name": "Leather belt", "price": 30.0, "imageUrl": "b.jpg" },
    );
    let store = IntentLogged::new(mem.clone());
    (mem, store)
}

fn ids(mem: &MemoryStore, col: &CollectionRef) -> Vec<String> {
    mem.documents(col).into_iter().map(|d| d.id).collect()
}

async fn commit_all(store: &dyn DocumentStore) -> Result<checkout_service::CommitReceipt, CheckoutError> {
    let items = cart_service::load_cart(store, Some(&user())).await?;
    let sel: Selection = items.iter().map(|it| it.entry_id.clone()).collect();
    checkout_service::commit(store, Some(&user()), &items, &sel).await
}

#[tokio::test]
async fn successful_batch_leaves_no_intent_behind() {
    let (mem, store) = setup();

    let receipt = commit_all(&store).await.unwrap();
    assert_eq!(receipt.orders.len(), 2);

    assert!(ids(&mem, &CollectionRef::cart(&user())).is_empty());
    assert_eq!(ids(&mem, &CollectionRef::orders(&user())).len(), 2);
    assert!(ids(&mem, &CollectionRef::intents(&user())).is_empty());
}

#[tokio::test]
async fn mid_batch_failure_is_compensated() {
    let (mem, store) = setup();
    let items = cart_service::load_cart(&store, Some(&user())).await.unwrap();
    let sel: Selection = ["1", "2"].into_iter().collect();

    // writes: #0 intent, #1 create, #2 delete, #3 create <- fails
    mem.fail_with(Failure::FailNthWrite(3));
    let err = checkout_service::commit(&store, Some(&user()), &items, &sel)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Commit(StoreError::Unavailable(_))));

    let cart = CollectionRef::cart(&user());
    assert_eq!(ids(&mem, &cart), vec!["1", "2"]);
    let restored = mem.document(&cart.doc("1")).unwrap();
    assert_eq!(restored.get_str("name").unwrap(), "Silk scarf");
    assert_eq!(restored.get_f64("price").unwrap(), 12.5);

    assert!(ids(&mem, &CollectionRef::orders(&user())).is_empty());
    assert!(ids(&mem, &CollectionRef::intents(&user())).is_empty());
}

#[tokio::test]
async fn failed_commit_mark_rolls_back_everything() {
    let (mem, store) = setup();
    let items = cart_service::load_cart(&store, Some(&user())).await.unwrap();
    let sel: Selection = ["1"].into_iter().collect();

    // writes: #0 intent, #1 create, #2 delete, #3 committed mark <- fails
    mem.fail_with(Failure::FailNthWrite(3));
    assert!(checkout_service::commit(&store, Some(&user()), &items, &sel).await.is_err());

    assert_eq!(ids(&mem, &CollectionRef::cart(&user())), vec!["1", "2"]);
    assert!(ids(&mem, &CollectionRef::orders(&user())).is_empty());
}

#[tokio::test]
async fn crash_mid_batch_is_rolled_back_on_next_load() {
    let (mem, store) = setup();
    let items = cart_service::load_cart(&store, Some(&user())).await.unwrap();
    let sel: Selection = ["1", "2"].into_iter().collect();

    // connection drops after the first order and cart delete landed
    mem.fail_with(Failure::OfflineAfterWrites(3));
    assert!(checkout_service::commit(&store, Some(&user()), &items, &sel).await.is_err());

    mem.heal();
    assert_eq!(ids(&mem, &CollectionRef::cart(&user())), vec!["2"]);
    assert_eq!(ids(&mem, &CollectionRef::orders(&user())).len(), 1);
    assert_eq!(ids(&mem, &CollectionRef::intents(&user())).len(), 1);

    let reloaded = cart_service::load_cart(&store, Some(&user())).await.unwrap();
    let entry_ids: Vec<_> = reloaded.iter().map(|it| it.entry_id.as_str()).collect();
    assert_eq!(entry_ids, vec!["1", "2"]);

    assert!(ids(&mem, &CollectionRef::orders(&user())).is_empty());
    assert!(ids(&mem, &CollectionRef::intents(&user())).is_empty());
}

#[tokio::test]
async fn committed_intent_is_only_cleaned_up() {
    let (mem, store) = setup();
    let items = cart_service::load_cart(&store, Some(&user())).await.unwrap();
    let sel: Selection = ["1"].into_iter().collect();

    // writes: #0 intent, #1 create, #2 delete, #3 committed mark, #4 drop intent <- fails
    mem.fail_with(Failure::FailNthWrite(4));
    checkout_service::commit(&store, Some(&user()), &items, &sel).await.unwrap();
    assert_eq!(ids(&mem, &CollectionRef::intents(&user())).len(), 1);

    mem.heal();
    let rolled_back = store.recover(&user()).await.unwrap();
    assert_eq!(rolled_back, 0);

    assert_eq!(ids(&mem, &CollectionRef::cart(&user())), vec!["2"]);
    assert_eq!(ids(&mem, &CollectionRef::orders(&user())).len(), 1);
    assert!(ids(&mem, &CollectionRef::intents(&user())).is_empty());
}

#[tokio::test]
async fn batch_spanning_users_is_refused() {
    let (mem, store) = setup();
    let other = UserId::new("someone-else");
    mem.insert(&CollectionRef::cart(&other).doc("x"), doc! {});

    let ops = vec![
        WriteOp::Delete { target: CollectionRef::cart(&user()).doc("1") },
        WriteOp::Delete { target: CollectionRef::cart(&other).doc("x") },
    ];
    let err = store.batch_write(ops).await.unwrap_err();
    assert!(matches!(err, StoreError::Rejected(_)));
    assert_eq!(ids(&mem, &CollectionRef::cart(&user())), vec!["1", "2"]);
}

#[tokio::test]
async fn unreadable_intent_does_not_block_loading() {
    let (mem, store) = setup();
    let intents = CollectionRef::intents(&user());
    mem.insert(&intents.doc("garbled"), doc! { "status": 5, "steps": "nope" });

    let items = cart_service::load_cart(&store, Some(&user())).await.unwrap();
    let entry_ids: Vec<_> = items.iter().map(|it| it.entry_id.as_str()).collect();
    assert_eq!(entry_ids, vec!["1", "2"]);

    // left in place for inspection
    assert_eq!(ids(&mem, &intents), vec!["garbled"]);
}

#[tokio::test]
async fn catalog_writes_cannot_join_a_batch() {
    let (mem, store) = setup();
    let listing = CollectionRef::products().doc("p-1");
    mem.insert(&listing, doc! { "name": "Scarf" });

    let err = store
        .batch_write(vec![WriteOp::Delete { target: listing.clone() }])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Rejected(_)));
    assert!(mem.document(&listing).is_some());
}

/// Holds the first cart delete until `resume` fires.
struct GatedStore {
    inner: Arc<MemoryStore>,
    gated: AtomicBool,
    reached: Notify,
    resume: Notify,
}

impl GatedStore {
    fn new(inner: Arc<MemoryStore>) -> Self {
        GatedStore {
            inner,
            gated: AtomicBool::new(true),
            reached: Notify::new(),
            resume: Notify::new(),
        }
    }
}

#[async_trait]
impl DocumentStore for GatedStore {
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
        if target.parent.collection == Collection::Cart && self.gated.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.resume.notified().await;
        }
        self.inner.delete(target).await
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        self.inner.batch_write(ops).await
    }
}

#[tokio::test]
async fn loading_during_a_running_batch_leaves_it_alone() {
    let mem = Arc::new(MemoryStore::new());
    let cart = CollectionRef::cart(&user());
    mem.insert(&cart.doc("1"), doc! { "productId": "prod-a", "name": "Silk scarf", "price": 12.5 });
    mem.insert(&cart.doc("2"), doc! { "productId": "prod-b", "name": "Leather belt", "price": 30.0 });

    let gate = Arc::new(GatedStore::new(mem.clone()));
    let store = Arc::new(IntentLogged::new(gate.clone()));

    let items = cart_service::load_cart(store.as_ref(), Some(&user())).await.unwrap();
    let sel: Selection = ["1"].into_iter().collect();

    let running = tokio::spawn({
        let store = store.clone();
        async move {
            let u = user();
            checkout_service::commit(store.as_ref(), Some(&u), &items, &sel).await
        }
    });

    // batch has written its intent and the order, and is parked before the cart delete
    gate.reached.notified().await;
    assert_eq!(ids(&mem, &CollectionRef::intents(&user())).len(), 1);

    let during = cart_service::load_cart(store.as_ref(), Some(&user())).await.unwrap();
    assert_eq!(during.len(), 2);
    assert_eq!(ids(&mem, &CollectionRef::orders(&user())).len(), 1);

    gate.resume.notify_one();
    let receipt = running.await.unwrap().unwrap();
    assert_eq!(receipt.committed_entries, vec!["1".to_string()]);

    assert_eq!(ids(&mem, &cart), vec!["2"]);
    let orders = mem.documents(&CollectionRef::orders(&user()));
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].fields.get_str("productId").unwrap(), "prod-a");
    assert!(ids(&mem, &CollectionRef::intents(&user())).is_empty());
}
