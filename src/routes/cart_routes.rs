use axum::{Router, routing::{delete, get, post}};

use crate::{AppState, controllers::cart_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/cart", get(cart_controller::get_cart).post(cart_controller::post_cart))
        .route("/selection/clear", post(cart_controller::post_clear_selection))
        .route("/cart/:entry_id", delete(cart_controller::delete_cart_entry))
        .route("/cart/:entry_id/toggle", post(cart_controller::post_toggle))
}
