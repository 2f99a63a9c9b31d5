use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};

use crate::error::CheckoutError;

use super::line_item::{price_field, str_field, IMAGE_URL, NAME, PRICE};
use super::LineItem;

const BRAND: &str = "brand";
const SIZE: &str = "size";
const DESCRIPTION: &str = "description";

/// A catalog listing as stored under `products/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub size: String,
    pub description: String,
    pub price: f64,
    pub image_url: String,
}

impl Product {
    /// Same tolerance as cart documents: missing fields read as defaults.
    pub fn from_document(id: impl Into<String>, doc: &Document) -> Self {
        Product {
            id: id.into(),
            name: str_field(doc, NAME),
            brand: str_field(doc, BRAND),
            size: str_field(doc, SIZE),
            description: str_field(doc, DESCRIPTION),
            price: price_field(doc, PRICE),
            image_url: str_field(doc, IMAGE_URL),
        }
    }

    pub fn to_document(&self) -> Document {
        doc! {
            "name": self.name.clone(),
            "brand": self.brand.clone(),
            "size": self.size.clone(),
            "description": self.description.clone(),
            "price": self.price,
            "imageUrl": self.image_url.clone(),
        }
    }

    /// Free-text match on name or brand, ignoring case. A blank query
    /// matches everything.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.name.to_lowercase().contains(&query)
            || self.brand.to_lowercase().contains(&query)
    }

    pub fn has_brand(&self, brand: &str) -> bool {
        self.brand.to_lowercase() == brand.trim().to_lowercase()
    }

    /// Cart entries are keyed by product, so re-adding overwrites.
    pub fn to_line_item(&self) -> LineItem {
        LineItem {
            entry_id: self.id.clone(),
            product_id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            image_url: self.image_url.clone(),
        }
    }
}

/// Body of `POST /products`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub brand: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub image_url: String,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), CheckoutError> {
        if self.name.trim().is_empty() || self.brand.trim().is_empty() || self.image_url.trim().is_empty() {
            return Err(CheckoutError::InvalidProduct("name, brand and image are required".into()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(CheckoutError::InvalidProduct("price must be a non-negative number".into()));
        }
        Ok(())
    }

    pub fn into_product(self, id: impl Into<String>) -> Product {
        Product {
            id: id.into(),
            name: self.name.trim().to_string(),
            brand: self.brand.trim().to_string(),
            size: self.size,
            description: self.description,
            price: self.price,
            image_url: self.image_url,
        }
    }
}
