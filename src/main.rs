// src/main.rs
use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use timepoll_backend::config::Config;
use timepoll_backend::db::{create_pool, PgStore};
use timepoll_backend::routes::create_router;
use timepoll_backend::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok(); // Load environment variables from .env file

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    let state = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url)
                .await
                .expect("Failed to connect to the database");
            AppState::new(Arc::new(PgStore::new(pool)))
        }
        None => {
            tracing::warn!(
                "DATABASE_URL is not set; API requests will report a configuration error"
            );
            AppState::unconfigured()
        }
    };

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {addr}");
    axum_server::bind(addr)
        .serve(app.into_make_service())
        .await
        .expect("server failed");
}
