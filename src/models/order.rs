use mongodb::bson::{doc, Bson, Document};
use serde::{Deserialize, Serialize};

use super::line_item::{price_field, str_field, IMAGE_URL, NAME, PRICE, PRODUCT_ID};
use super::LineItem;

pub(crate) const CREATED_AT: &str = "created_at";
// written by the mobile app before orders carried `created_at`
const LEGACY_TIMESTAMP: &str = "timestamp";

fn millis_field(doc: &Document, key: &str) -> Option<i64> {
    match doc.get(key)? {
        Bson::Int64(v) => Some(*v),
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::DateTime(v) => Some(v.timestamp_millis()),
        _ => None,
    }
}

/// One purchased line in a user's order history. Never modified once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub image_url: String,
    // unix millis, client clock
    pub created_at: i64,
}

impl OrderRecord {
    pub fn from_line_item(order_id: impl Into<String>, item: &LineItem, created_at: i64) -> Self {
        OrderRecord {
            order_id: order_id.into(),
            product_id: item.product_id.clone(),
            name: item.name.clone(),
            price: item.price,
            image_url: item.image_url.clone(),
            created_at,
        }
    }

    pub fn from_document(order_id: impl Into<String>, doc: &Document) -> Self {
        let created_at = millis_field(doc, CREATED_AT)
            .or_else(|| millis_field(doc, LEGACY_TIMESTAMP))
            .unwrap_or(0);

        OrderRecord {
            order_id: order_id.into(),
            product_id: str_field(doc, PRODUCT_ID),
            name: str_field(doc, NAME),
            price: price_field(doc, PRICE),
            image_url: str_field(doc, IMAGE_URL),
            created_at,
        }
    }

    pub fn to_document(&self) -> Document {
        doc! {
            "productId": self.product_id.clone(),
            "name": self.name.clone(),
            "price": self.price,
            "imageUrl": self.image_url.clone(),
            "created_at": self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::DateTime;

    use super::*;

    #[test]
    fn legacy_timestamp_is_read_when_created_at_is_missing() {
        let legacy = doc! { "name": "Denim jacket", "timestamp": DateTime::from_millis(1_700_000_000_000) };
        assert_eq!(OrderRecord::from_document("o1", &legacy).created_at, 1_700_000_000_000);

        let both = doc! { "created_at": 5_i64, "timestamp": DateTime::from_millis(9) };
        assert_eq!(OrderRecord::from_document("o2", &both).created_at, 5);

        let neither = doc! { "name": "x" };
        assert_eq!(OrderRecord::from_document("o3", &neither).created_at, 0);
    }
}
