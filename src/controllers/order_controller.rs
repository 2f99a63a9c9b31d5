use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};

use super::cart_controller::require_user;
use crate::{error::Result, models::CurrentUser, services::order_service, AppState};

// GET /orders
pub async fn get_orders(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Json<Value>> {
    let u = require_user(user)?;
    let orders = order_service::list_orders(state.store.as_ref(), Some(&u.id)).await?;
    Ok(Json(json!({ "orders": orders })))
}
