use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use tracing::{info, warn};

use super::{
    cart_service::authenticated,
    store::{CollectionRef, DocumentStore, WriteOp},
};
use crate::{
    error::{CheckoutError, Result},
    models::{LineItem, OrderRecord, Selection, UserId},
};

/// Everything one checkout writes, ready to hand to the store.
#[derive(Debug, Clone)]
pub struct CheckoutBatch {
    pub orders: Vec<OrderRecord>,
    pub committed_entries: Vec<String>,
    pub ops: Vec<WriteOp>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitReceipt {
    pub orders: Vec<OrderRecord>,
    pub committed_entries: Vec<String>,
}

/// Stages an order create followed by a cart delete for every selected line,
/// in cart order. Lines are copied as loaded; prices are not re-checked.
pub fn stage_checkout(
    user_id: &UserId,
    items: &[LineItem],
    selection: &Selection,
    created_at: i64,
) -> CheckoutBatch {
    let orders_col = CollectionRef::orders(user_id);
    let cart_col = CollectionRef::cart(user_id);

    let mut batch = CheckoutBatch {
        orders: vec![],
        committed_entries: vec![],
        ops: vec![],
    };

    for item in items.iter().filter(|it| selection.contains(&it.entry_id)) {
        let order = OrderRecord::from_line_item(ObjectId::new().to_hex(), item, created_at);

        batch.ops.push(WriteOp::Create {
            target: orders_col.doc(order.order_id.clone()),
            fields: order.to_document(),
        });
        batch.ops.push(WriteOp::Delete {
            target: cart_col.doc(item.entry_id.clone()),
        });

        batch.committed_entries.push(item.entry_id.clone());
        batch.orders.push(order);
    }

    batch
}

/// Moves the selected lines from the cart into the order history in one
/// atomic batch. On error nothing has been written.
pub async fn commit(
    store: &dyn DocumentStore,
    user_id: Option<&UserId>,
    items: &[LineItem],
    selection: &Selection,
) -> Result<CommitReceipt> {
    let user_id = authenticated(user_id)?;

    let batch = stage_checkout(user_id, items, selection, Utc::now().timestamp_millis());
    if batch.orders.is_empty() {
        return Err(CheckoutError::NothingSelected);
    }

    if let Err(e) = store.batch_write(batch.ops).await {
        warn!(user = %user_id, lines = batch.orders.len(), error = %e, "checkout batch failed");
        return Err(CheckoutError::Commit(e));
    }

    info!(user = %user_id, lines = batch.orders.len(), "checkout committed");
    Ok(CommitReceipt {
        orders: batch.orders,
        committed_entries: batch.committed_entries,
    })
}
