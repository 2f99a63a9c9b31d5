use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use tracing::info;

use super::store::{CollectionRef, DocumentStore};
use crate::{
    error::{CheckoutError, Result},
    models::{CurrentUser, NewProduct, Product},
};

/// Query string of `GET /products`. Both filters are optional and combine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
}

/// Lists the catalog, filtered in-process by name/brand text and brand.
pub async fn list_products(store: &dyn DocumentStore, query: &CatalogQuery) -> Result<Vec<Product>> {
    let docs = store
        .list(&CollectionRef::products())
        .await
        .map_err(CheckoutError::Load)?;

    Ok(docs
        .iter()
        .map(|d| Product::from_document(d.id.clone(), &d.fields))
        .filter(|p| query.q.as_deref().is_none_or(|q| p.matches_query(q)))
        .filter(|p| query.brand.as_deref().is_none_or(|b| p.has_brand(b)))
        .collect())
}

/// Reads one listing fresh from the store.
pub async fn get_product(store: &dyn DocumentStore, product_id: &str) -> Result<Product> {
    if product_id.trim().is_empty() {
        return Err(CheckoutError::InvalidProduct("missing product id".into()));
    }

    let found = store
        .get(&CollectionRef::products().doc(product_id))
        .await
        .map_err(CheckoutError::Load)?;

    found
        .map(|fields| Product::from_document(product_id, &fields))
        .ok_or_else(|| CheckoutError::ProductNotFound(product_id.to_string()))
}

pub async fn create_product(
    store: &dyn DocumentStore,
    user: Option<&CurrentUser>,
    input: NewProduct,
) -> Result<Product> {
    let user = user.ok_or(CheckoutError::NotAuthenticated)?;
    input.validate()?;

    let product = input.into_product(ObjectId::new().to_hex());
    store
        .set(&CollectionRef::products().doc(product.id.clone()), product.to_document())
        .await
        .map_err(CheckoutError::CatalogWrite)?;

    info!(user = %user.id, product_id = %product.id, "product listed");
    Ok(product)
}

/// Admin-only. Carts that already hold the product keep their snapshot.
pub async fn delete_product(store: &dyn DocumentStore, user: Option<&CurrentUser>, product_id: &str) -> Result<()> {
    let user = user.ok_or(CheckoutError::NotAuthenticated)?;
    if !user.is_admin {
        return Err(CheckoutError::Forbidden);
    }

    store
        .delete(&CollectionRef::products().doc(product_id))
        .await
        .map_err(CheckoutError::CatalogWrite)?;

    info!(user = %user.id, product_id, "product removed");
    Ok(())
}
