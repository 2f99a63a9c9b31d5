use super::{cart_service::authenticated, store::{CollectionRef, DocumentStore}};
use crate::{
    error::{CheckoutError, Result},
    models::{OrderRecord, UserId},
};

/// Order history, oldest first.
pub async fn list_orders(store: &dyn DocumentStore, user_id: Option<&UserId>) -> Result<Vec<OrderRecord>> {
    let user_id = authenticated(user_id)?;

    let docs = store
        .list(&CollectionRef::orders(user_id))
        .await
        .map_err(CheckoutError::Load)?;

    let mut out: Vec<OrderRecord> = docs
        .iter()
        .map(|d| OrderRecord::from_document(d.id.clone(), &d.fields))
        .collect();
    out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.order_id.cmp(&b.order_id)));
    Ok(out)
}
