use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};

use super::cart_controller::require_user;
use crate::{
    error::Result,
    events::{self, CART_UPDATED, ORDERS_UPDATED},
    models::CurrentUser,
    AppState,
};

// POST /checkout
pub async fn post_checkout(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Json<Value>> {
    let u = require_user(user)?;

    let Some(receipt) = state.sessions.commit(state.store.as_ref(), &u.id).await? else {
        return Ok(Json(json!({ "committed": false })));
    };
    events::notify(&state, &u.id, &[CART_UPDATED, ORDERS_UPDATED]);

    Ok(Json(json!({
        "committed": true,
        "orders": receipt.orders,
        "committed_entries": receipt.committed_entries,
    })))
}
