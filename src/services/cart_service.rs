use tracing::{info, warn};

use super::{
    catalog_service,
    store::{CollectionRef, DocumentStore},
};
use crate::{
    error::{CheckoutError, Result},
    models::{LineItem, UserId},
};

pub(crate) fn authenticated(user_id: Option<&UserId>) -> Result<&UserId> {
    user_id.ok_or(CheckoutError::NotAuthenticated)
}

/// Reads the user's whole cart. Malformed documents load with defaults
/// instead of failing the read.
pub async fn load_cart(store: &dyn DocumentStore, user_id: Option<&UserId>) -> Result<Vec<LineItem>> {
    let user_id = authenticated(user_id)?;

    let recovered = store.recover(user_id).await.map_err(CheckoutError::Load)?;
    if recovered > 0 {
        warn!(user = %user_id, recovered, "rolled back unfinished checkouts before loading cart");
    }

    let docs = store
        .list(&CollectionRef::cart(user_id))
        .await
        .map_err(CheckoutError::Load)?;

    Ok(docs
        .iter()
        .map(|d| LineItem::from_document(d.id.clone(), &d.fields))
        .collect())
}

/// Removes one cart document. Removing an entry that is already gone succeeds.
pub async fn delete_entry(store: &dyn DocumentStore, user_id: Option<&UserId>, entry_id: &str) -> Result<()> {
    let user_id = authenticated(user_id)?;

    store
        .delete(&CollectionRef::cart(user_id).doc(entry_id))
        .await
        .map_err(|source| CheckoutError::Delete {
            entry_id: entry_id.to_string(),
            source,
        })?;

    info!(user = %user_id, entry_id, "cart entry deleted");
    Ok(())
}

/// Reads the product from the catalog and copies its current name, price and
/// image into the cart, keyed by product id.
pub async fn add_to_cart(store: &dyn DocumentStore, user_id: Option<&UserId>, product_id: &str) -> Result<LineItem> {
    let user_id = authenticated(user_id)?;
    let product = catalog_service::get_product(store, product_id).await?;

    let item = product.to_line_item();
    store
        .set(&CollectionRef::cart(user_id).doc(item.entry_id.clone()), item.to_document())
        .await
        .map_err(CheckoutError::AddToCart)?;

    info!(user = %user_id, product_id = %item.product_id, "added to cart");
    Ok(item)
}
