pub mod user;
pub mod line_item;
pub mod order;
pub mod product;
pub mod selection;

pub use user::{CurrentUser, UserId};
pub use line_item::LineItem;
pub use order::OrderRecord;
pub use product::{NewProduct, Product};
pub use selection::Selection;
