mod bronto;
mod clock;
mod connector;
mod schema;
mod sink;
mod streams;

use std::sync::Arc;

use bronto_config::{init_tracing, StateBackend, TapConfig};
use bronto_db::sync::file_repository::FileStateRepository;
use bronto_db::sync::memory_repository::MemoryStateRepository;
use bronto_db::sync::pg_repository::PgStateRepository;
use bronto_db::sync::repositories::StateRepository;

use crate::bronto::activity_sync::ActivitySyncer;
use crate::bronto::client::{BrontoClient, BrontoClientConfig};
use crate::clock::SystemClock;
use crate::connector::Connector;
use crate::schema::CatalogSelection;
use crate::sink::SingerWriter;
use crate::streams::StreamKind;

const TAP_ID: &str = "tap-bronto";

async fn state_repository(backend: &StateBackend) -> Arc<dyn StateRepository> {
    match backend {
        StateBackend::Postgres(url) => {
            let pool = bronto_db::create_pool(url)
                .await
                .expect("failed to connect to database");
            let repo = PgStateRepository::new(pool, TAP_ID);
            repo.ensure_schema()
                .await
                .expect("failed to prepare state table");
            Arc::new(repo)
        }
        StateBackend::File(path) => {
            tracing::info!(path = %path.display(), "using file state");
            Arc::new(FileStateRepository::new(path.clone()))
        }
        StateBackend::Memory => {
            tracing::warn!("no state backend configured, bookmarks will not survive this run");
            Arc::new(MemoryStateRepository::default())
        }
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing("info");

    tracing::info!(
        service = "bronto-ingest",
        version = env!("CARGO_PKG_VERSION"),
        run_id = %uuid::Uuid::new_v4(),
        "starting"
    );

    let config = TapConfig::from_env().expect("failed to load config");

    let streams: Vec<StreamKind> = config
        .streams
        .iter()
        .map(|name| name.parse())
        .collect::<Result<_, _>>()
        .unwrap_or_else(|e| panic!("stream configuration error (fail-fast): {e}"));

    let catalog = config.catalog_path.as_deref().map(|path| {
        CatalogSelection::load(path)
            .unwrap_or_else(|e| panic!("failed to load catalog {}: {e}", path.display()))
    });

    let state_repo = state_repository(&config.state_backend).await;
    let client = Arc::new(
        BrontoClient::new(BrontoClientConfig::from(&config))
            .expect("failed to create bronto client"),
    );
    let sink = Arc::new(SingerWriter::new(std::io::stdout()));

    let connectors: Vec<Box<dyn Connector>> = streams
        .into_iter()
        .map(|stream| {
            let mut schema = stream.schema();
            if let Some(catalog) = &catalog {
                catalog.apply(stream.name(), &mut schema);
            }
            Box::new(ActivitySyncer::new(
                stream,
                schema,
                config.default_start_date.clone(),
                client.clone(),
                state_repo.clone(),
                sink.clone(),
                SystemClock,
            )) as Box<dyn Connector>
        })
        .collect();

    tracing::info!(streams = connectors.len(), "connectors configured");

    for connector in &connectors {
        tracing::info!(stream = connector.source_name(), "starting sync");

        match connector.sync().await {
            Ok(result) => {
                tracing::info!(
                    source = %result.source,
                    records = result.records,
                    windows = result.windows,
                    "sync completed"
                );
            }
            Err(e) => {
                tracing::error!(stream = connector.source_name(), error = %e, "sync failed");
                std::process::exit(1);
            }
        }
    }

    tracing::info!("all streams synced");
}
