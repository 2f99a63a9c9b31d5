use axum::{Router, routing::post};

use crate::{AppState, controllers::checkout_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/checkout", post(checkout_controller::post_checkout))
}
