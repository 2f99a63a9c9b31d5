use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{CheckoutError, Result},
    events::{self, CART_UPDATED},
    models::CurrentUser,
    services::{cart_service, checkout_session::CheckoutSession},
    AppState,
};

/// Body of `POST /cart`. Name, price and image come from the catalog.
#[derive(Debug, Deserialize)]
pub struct AddToCart {
    pub product_id: String,
}

pub(crate) fn require_user(user: Option<Extension<CurrentUser>>) -> Result<CurrentUser> {
    user.map(|Extension(u)| u).ok_or(CheckoutError::NotAuthenticated)
}

pub(crate) fn cart_view(session: &CheckoutSession) -> Value {
    json!({
        "state": session.state(),
        "items": session.items(),
        "selected": session.selection().iter().collect::<Vec<_>>(),
        "can_commit": session.can_commit(),
        "last_error": session.last_error(),
    })
}

// GET /cart
// Entering the cart screen: fresh load, fresh selection.
pub async fn get_cart(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Json<Value>> {
    let u = require_user(user)?;

    let session = state.sessions.load(state.store.as_ref(), &u.id).await?;
    Ok(Json(cart_view(&session)))
}

// POST /cart
pub async fn post_cart(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<AddToCart>,
) -> Result<impl IntoResponse> {
    let u = require_user(user)?;

    let item = cart_service::add_to_cart(state.store.as_ref(), Some(&u.id), &body.product_id).await?;
    events::notify(&state, &u.id, &[CART_UPDATED]);

    Ok((StatusCode::CREATED, Json(json!({ "item": item }))))
}

// DELETE /cart/:entry_id
pub async fn delete_cart_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Json<Value>> {
    let u = require_user(user)?;

    let session = state.sessions.delete(state.store.as_ref(), &u.id, &entry_id).await?;
    events::notify(&state, &u.id, &[CART_UPDATED]);

    Ok(Json(cart_view(&session)))
}

// POST /cart/:entry_id/toggle
pub async fn post_toggle(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Json<Value>> {
    let u = require_user(user)?;

    let (selected, can_commit) = state
        .sessions
        .update(&u.id, |s| Ok((s.toggle(&entry_id)?, s.can_commit())))
        .await?;

    Ok(Json(json!({
        "entry_id": entry_id,
        "selected": selected,
        "can_commit": can_commit,
    })))
}

// POST /selection/clear
pub async fn post_clear_selection(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Json<Value>> {
    let u = require_user(user)?;

    let view = state
        .sessions
        .update(&u.id, |s| {
            s.clear_selection()?;
            Ok(cart_view(s))
        })
        .await?;

    Ok(Json(view))
}
