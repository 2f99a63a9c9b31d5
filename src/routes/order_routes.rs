use axum::{Router, routing::get};

use crate::{AppState, controllers::order_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/orders", get(order_controller::get_orders))
}
