use axum::{Router, routing::get};

use crate::{AppState, controllers::catalog_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/products",
            get(catalog_controller::get_products).post(catalog_controller::post_product),
        )
        .route(
            "/products/:product_id",
            get(catalog_controller::get_product).delete(catalog_controller::delete_product),
        )
}
