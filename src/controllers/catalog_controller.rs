use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use super::cart_controller::require_user;
use crate::{
    error::Result,
    models::{CurrentUser, NewProduct},
    services::catalog_service::{self, CatalogQuery},
    AppState,
};

// GET /products?q=&brand=
pub async fn get_products(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Value>> {
    require_user(user)?;
    let products = catalog_service::list_products(state.store.as_ref(), &query).await?;
    Ok(Json(json!({ "products": products })))
}

// GET /products/:product_id
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Json<Value>> {
    require_user(user)?;
    let product = catalog_service::get_product(state.store.as_ref(), &product_id).await?;
    Ok(Json(json!({ "product": product })))
}

// POST /products
pub async fn post_product(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(input): Json<NewProduct>,
) -> Result<impl IntoResponse> {
    let u = require_user(user)?;
    let product = catalog_service::create_product(state.store.as_ref(), Some(&u), input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "product": product }))))
}

// DELETE /products/:product_id
pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Json<Value>> {
    let u = require_user(user)?;
    catalog_service::delete_product(state.store.as_ref(), Some(&u), &product_id).await?;
    Ok(Json(json!({ "deleted": product_id })))
}
