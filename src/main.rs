// src/main.rs
use std::{net::SocketAddr, sync::Arc};

use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use poll_backend::{
    app,
    config::Config,
    db,
    store::{MemoryStore, PgStore, Store},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok(); // Load environment variables from .env file

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("poll_backend=info,tower_http=info")),
        )
        .init();

    let config = Config::load()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(PgStore::new(db::create_pool(url, config.max_connections).await?)),
        None => {
            warn!("DATABASE_URL not set, polls are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let routes = app(AppState::new(store, config));

    info!("listening on {addr}");
    axum_server::bind(addr)
        .serve(routes.into_make_service())
        .await?;

    Ok(())
}
