use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

/// How a checkout batch is made atomic on the Mongo backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    // multi-document transaction (needs a replica set)
    Transaction,
    // intent record + compensation, works on a standalone server
    IntentLog,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub jwt_secret: String,
    pub jwt_cookie_name: String,

    pub store_backend: StoreBackend,
    pub batch_mode: BatchMode,
}

fn parse_backend(raw: &str) -> Option<StoreBackend> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "mongo" | "mongodb" => Some(StoreBackend::Mongo),
        "memory" | "mem" => Some(StoreBackend::Memory),
        _ => None,
    }
}

fn parse_batch_mode(raw: &str) -> Option<BatchMode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "transaction" | "tx" => Some(BatchMode::Transaction),
        "intent-log" | "intent_log" | "intents" => Some(BatchMode::IntentLog),
        _ => None,
    }
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let mongodb_uri = env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

    let mongodb_db = env::var("MONGODB_DB")
        .unwrap_or_else(|_| "closetmarket".to_string());

    let host = env::var("HOST")
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port = env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "change-me-dev-secret".to_string());
    let jwt_cookie_name = env::var("JWT_COOKIE_NAME").unwrap_or_else(|_| "auth".to_string());

    let store_backend = env::var("STORE_BACKEND")
        .ok()
        .and_then(|s| parse_backend(&s))
        .unwrap_or(StoreBackend::Mongo);

    let batch_mode = env::var("CHECKOUT_BATCH_MODE")
        .ok()
        .and_then(|s| parse_batch_mode(&s))
        .unwrap_or(BatchMode::Transaction);

    Settings {
        mongodb_uri,
        mongodb_db,
        host,
        port,
        jwt_secret,
        jwt_cookie_name,
        store_backend,
        batch_mode,
    }
}
