//! snapvault API server entry point.

use std::sync::Arc;

use snapvault_api::config::AppConfig;
use snapvault_api::error::AppError;
use snapvault_api::state::AppState;
use snapvault_core::clock::SystemClock;
use snapvault_core::commit::SnapshotCommitter;
use snapvault_core::event::DomainEvent;
use snapvault_core::manifest::AggregateManifest;
use snapvault_core::store::SnapshotStore;
use snapvault_inventory::domain::aggregates::Inventory;
use snapvault_inventory::domain::events::InventoryEvent;
use snapvault_repository::{AggregateRepository, ChangeSubscription};
use snapvault_store::schema::create_schema;
use snapvault_store::{
    ChannelEventPublisher, InMemoryManifest, InMemorySnapshotStore, PgAggregateManifest,
    PgSnapshotCommitter, PgSnapshotStore,
};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

struct Backends {
    store: Arc<dyn SnapshotStore>,
    manifest: Arc<dyn AggregateManifest>,
    committer: Option<Arc<dyn SnapshotCommitter>>,
}

async fn backends(config: &AppConfig) -> Result<Backends, AppError> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set; snapshots are kept in memory only");
        return Ok(Backends {
            store: Arc::new(InMemorySnapshotStore::new()),
            manifest: Arc::new(InMemoryManifest::new()),
            committer: None,
        });
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    create_schema(&pool).await?;
    tracing::info!("connected to PostgreSQL");

    Ok(Backends {
        store: Arc::new(PgSnapshotStore::new(pool.clone())),
        manifest: Arc::new(PgAggregateManifest::new(pool.clone())),
        committer: Some(Arc::new(PgSnapshotCommitter::new(pool))),
    })
}

async fn log_events(mut events: broadcast::Receiver<InventoryEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => tracing::debug!(
                event_type = event.event_type(),
                aggregate_id = %event.metadata().aggregate_id,
                version = event.version(),
                "inventory event published"
            ),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event log fell behind; events skipped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn log_changes(mut changes: ChangeSubscription) {
    while let Some(change) = changes.recv().await {
        tracing::debug!(
            aggregate_id = %change.aggregate_id,
            version = change.version(),
            "inventory snapshot persisted"
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting snapvault API server");

    let config = AppConfig::from_env()?;
    let addr = config.bind_addr()?;
    let backends = backends(&config).await?;

    let publisher = Arc::new(ChannelEventPublisher::<InventoryEvent>::default());
    tokio::spawn(log_events(publisher.subscribe()));
    let mut repository = AggregateRepository::<Inventory>::with_default(backends.store)
        .with_config(&config.repository)
        .with_manifest(backends.manifest)
        .with_publisher(publisher);
    if let Some(committer) = backends.committer {
        repository = repository.with_committer(committer);
    }
    tokio::spawn(log_changes(repository.changes()));
    let repository = Arc::new(repository);
    let app_state = AppState::new(Arc::new(SystemClock), Arc::clone(&repository));

    // TODO: restrict CORS to configured origins once AppConfig carries them.
    let app = snapvault_api::build_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    // Every handler holding a clone of the state has finished by now.
    match Arc::try_unwrap(repository) {
        Ok(repository) => repository.dispose().await?,
        Err(_) => tracing::warn!("repository still shared at shutdown; skipping dispose"),
    }
    tracing::info!("snapvault API server stopped");
    Ok(())
}
