use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure reported by a document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the write (precondition, validation, aborted batch).
    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("document codec error: {0}")]
    Codec(String),

    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

impl From<mongodb::bson::ser::Error> for StoreError {
    fn from(e: mongodb::bson::ser::Error) -> Self {
        StoreError::Codec(e.to_string())
    }
}

impl From<mongodb::bson::de::Error> for StoreError {
    fn from(e: mongodb::bson::de::Error) -> Self {
        StoreError::Codec(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("could not load: {0}")]
    Load(#[source] StoreError),

    #[error("could not delete cart entry {entry_id}: {source}")]
    Delete {
        entry_id: String,
        #[source]
        source: StoreError,
    },

    #[error("checkout failed: {0}")]
    Commit(#[source] StoreError),

    #[error("could not add to cart: {0}")]
    AddToCart(#[source] StoreError),

    #[error("invalid product: {0}")]
    InvalidProduct(String),

    #[error("product {0} not found")]
    ProductNotFound(String),

    #[error("could not update catalog: {0}")]
    CatalogWrite(#[source] StoreError),

    #[error("only catalog admins may do that")]
    Forbidden,

    #[error("nothing selected")]
    NothingSelected,

    #[error("unknown cart entry {0}")]
    UnknownEntry(String),

    #[error("cart is not loaded")]
    NotLoaded,

    #[error("a checkout is already in progress")]
    CommitInFlight,
}

impl CheckoutError {
    pub fn status(&self) -> StatusCode {
        match self {
            CheckoutError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            CheckoutError::Load(_)
            | CheckoutError::Delete { .. }
            | CheckoutError::Commit(_)
            | CheckoutError::AddToCart(_)
            | CheckoutError::CatalogWrite(_) => StatusCode::BAD_GATEWAY,
            CheckoutError::InvalidProduct(_) | CheckoutError::NothingSelected => StatusCode::BAD_REQUEST,
            CheckoutError::Forbidden => StatusCode::FORBIDDEN,
            CheckoutError::UnknownEntry(_) | CheckoutError::ProductNotFound(_) => StatusCode::NOT_FOUND,
            CheckoutError::NotLoaded | CheckoutError::CommitInFlight => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request refused");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T, E = CheckoutError> = std::result::Result<T, E>;
