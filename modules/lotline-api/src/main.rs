use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lotline_api::{build_router, AppState};
use lotline_common::{Config, SourceDataset};
use lotline_import::{BatchCoordinator, ContinuationDispatcher, HttpContinuation};
use lotline_store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("lotline=info".parse()?))
        .init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgStore::new(pool));
    store.migrate().await?;

    let dataset = Arc::new(SourceDataset::load(&config.source_data_path).await?);
    info!(
        total = dataset.len().await,
        path = config.source_data_path.as_str(),
        "Loaded source dataset"
    );

    let coordinator = Arc::new(BatchCoordinator::new(
        dataset,
        store.clone(),
        store.clone(),
    ));

    let dispatcher: Option<Arc<dyn ContinuationDispatcher>> =
        config.self_base_url.as_ref().map(|base_url| {
            Arc::new(HttpContinuation::new(
                base_url.clone(),
                config.import_shared_secret.clone(),
            )) as Arc<dyn ContinuationDispatcher>
        });

    let state = Arc::new(AppState {
        coordinator,
        dispatcher,
        shared_secret: config.import_shared_secret.clone(),
        batch_size: config.import_batch_size as i64,
    });

    let app = build_router(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!("Lotline API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
