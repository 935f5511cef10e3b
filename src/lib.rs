pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod scraping;
pub mod utils;

use std::sync::Arc;

use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::AppConfig;
use db::Store;
use fetch::HttpFetcher;
use pipeline::{Pipeline, RunReport};
use scheduler::Scheduler;

/// Shared handles for the HTTP handlers and the background scheduler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<Store>,
    pub pipeline: Arc<Pipeline>,
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Store) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let store = Arc::new(store);
        let fetcher = HttpFetcher::from_config(&config)?;
        let pipeline = Arc::new(Pipeline::new(config.clone(), store.clone(), fetcher));
        let scheduler = Scheduler::new(pipeline.clone());
        Ok(Self {
            config,
            store,
            pipeline,
            scheduler,
        })
    }
}

pub fn init_tracing(filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Runs the pipeline a single time and returns its report.
pub async fn run_once(state: &AppState) -> anyhow::Result<RunReport> {
    let report = state.pipeline.run().await?;
    Ok(report)
}

/// Starts the recurring scheduler (which fires once immediately) and serves
/// the HTTP API until ctrl-c.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    if state.config.operator_token.is_none() {
        warn!("no operator token configured, operator endpoints will reject every request");
    }

    let interval = state.config.scrape_interval();
    let ticker = state.scheduler.start(interval);
    info!(every_hours = state.config.scrape_interval_hours, "scheduler started");

    let app = api::router(state.clone()).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(state.config.bind_addr.as_str())
        .await
        .with_context(|| format!("failed to bind {}", state.config.bind_addr))?;
    info!(addr = %state.config.bind_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for shutdown signal");
            }
        })
        .await
        .context("server error")?;

    ticker.abort();
    Ok(())
}
