pub mod store;
pub mod db_init;

pub mod catalog_service;
pub mod cart_service;
pub mod checkout_service;
pub mod checkout_session;
pub mod order_service;
