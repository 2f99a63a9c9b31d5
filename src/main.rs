use std::{net::SocketAddr, sync::Arc};

use mongodb::Client;

use closetmarket::{
    config::{self, BatchMode, StoreBackend},
    routes,
    services::{
        db_init,
        store::{DocumentStore, IntentLogged, MemoryStore, MongoStore},
    },
    AppState,
};

async fn build_store(settings: &config::Settings) -> Arc<dyn DocumentStore> {
    match settings.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, data is lost on exit");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Mongo => {
            let client = Client::with_uri_str(&settings.mongodb_uri)
                .await
                .expect("Failed to connect to MongoDB");
            let db = client.database(&settings.mongodb_db);

            if let Err(e) = db_init::ensure_indexes(&db).await {
                tracing::warn!(error = %e, "could not ensure indexes");
            }

            let mongo = MongoStore::new(client, db);
            let store: Arc<dyn DocumentStore> = match settings.batch_mode {
                BatchMode::Transaction => Arc::new(mongo),
                BatchMode::IntentLog => Arc::new(IntentLogged::new(mongo)),
            };
            store
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::load();
    let store = build_store(&settings).await;

    tracing::info!(
        backend = ?settings.store_backend,
        batch_mode = ?settings.batch_mode,
        "store ready"
    );

    let state = AppState::new(store, settings.clone());
    let app = routes::app(state);

    let ip = settings
        .host
        .parse::<std::net::IpAddr>()
        .expect("HOST must be an IP address");
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind");
    axum::serve(listener, app).await.expect("server error");
}
