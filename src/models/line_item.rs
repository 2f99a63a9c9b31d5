use mongodb::bson::{doc, Bson, Document};
use serde::{Deserialize, Serialize};

// field names shared by cart and order documents
pub(crate) const PRODUCT_ID: &str = "productId";
pub(crate) const NAME: &str = "name";
pub(crate) const PRICE: &str = "price";
pub(crate) const IMAGE_URL: &str = "imageUrl";

pub(crate) fn str_field(doc: &Document, key: &str) -> String {
    doc.get_str(key).map(str::to_string).unwrap_or_default()
}

/// Reads a price, widening integers. Anything negative, non-finite or
/// non-numeric reads as zero.
pub(crate) fn price_field(doc: &Document, key: &str) -> f64 {
    let raw = match doc.get(key) {
        Some(Bson::Double(v)) => *v,
        Some(Bson::Int32(v)) => f64::from(*v),
        Some(Bson::Int64(v)) => *v as f64,
        _ => 0.0,
    };

    if raw.is_finite() && raw >= 0.0 { raw } else { 0.0 }
}

/// A cart entry as loaded for one checkout session.
///
/// `name`, `price` and `image_url` are the snapshot taken when the product
/// was added to the cart; they are never refreshed from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub entry_id: String,
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub image_url: String,
}

impl LineItem {
    /// Maps a raw cart document. Missing fields fall back to defaults so a
    /// partial document still loads.
    pub fn from_document(entry_id: impl Into<String>, doc: &Document) -> Self {
        LineItem {
            entry_id: entry_id.into(),
            product_id: str_field(doc, PRODUCT_ID),
            name: str_field(doc, NAME),
            price: price_field(doc, PRICE),
            image_url: str_field(doc, IMAGE_URL),
        }
    }

    pub fn to_document(&self) -> Document {
        doc! {
            "productId": self.product_id.clone(),
            "name": self.name.clone(),
            "price": self.price,
            "imageUrl": self.image_url.clone(),
        }
    }
}
