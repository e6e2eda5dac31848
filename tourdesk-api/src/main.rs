use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tourdesk_api::{app, AppState};
use tourdesk_core::{GoogleVerifier, StaticGoogleVerifier};
use tourdesk_store::{
    Config, DbClient, HttpGoogleVerifier, MediaStore, MemoryStore, StoreBookingRepository,
    StorePackageRepository, StoreUserRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tourdesk_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Tourdesk API on port {}", config.server.port);

    let media = MediaStore::new(&config.uploads, &config.server.public_url);
    tokio::fs::create_dir_all(media.root().join("package"))
        .await
        .context("Failed to create upload directories")?;

    let google: Arc<dyn GoogleVerifier> = match &config.auth.google_client_id {
        Some(client_id) => Arc::new(HttpGoogleVerifier::new(client_id.clone())),
        None => {
            tracing::warn!("No Google client id configured, Google sign-in is disabled");
            Arc::new(StaticGoogleVerifier::new())
        }
    };

    let app_state = if config.database.is_memory() {
        tracing::warn!("Using in-memory storage, data is lost on shutdown");
        AppState::in_memory(MemoryStore::new(), google, media, config.auth.clone())
    } else {
        let db = DbClient::new(config.database.url.expose(), config.database.max_connections)
            .await
            .context("Failed to connect to Postgres")?;
        db.migrate().await.context("Failed to run migrations")?;

        AppState::new(
            Arc::new(StoreUserRepository::new(db.pool.clone())),
            Arc::new(StorePackageRepository::new(db.pool.clone())),
            Arc::new(StoreBookingRepository::new(db.pool.clone())),
            google,
            media,
            config.auth.clone(),
        )
    };

    let app = app(app_state);

    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid server host '{}'", config.server.host))?;
    let addr = SocketAddr::from((host, config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
