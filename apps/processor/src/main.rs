mod ai_client;
mod config;
mod db;
mod errors;
mod extract;
mod matching;
mod models;
mod queue;
mod resumes;
mod store;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai_client::GeminiClient;
use crate::config::Config;
use crate::db::create_pool;
use crate::queue::cache::RedisParseCache;
use crate::queue::worker::SWEEP_GRACE_SECS;
use crate::queue::{Orchestrator, WorkerContext};
use crate::resumes::StatusController;
use crate::store::pg::{PgJobPostingStore, PgResumeStore};
use crate::store::LocalFileStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume processor v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let pool = create_pool(&config.database_url).await?;

    // Initialize Redis (parse-result cache)
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize the Gemini extraction client
    let extractor = Arc::new(GeminiClient::new(config.gemini_api_key.clone()));
    info!("AI client initialized (model: {})", ai_client::MODEL);

    // Wire the worker context: local file storage, Postgres-backed
    // collaborators, Redis parse cache.
    let resumes = Arc::new(PgResumeStore::new(pool.clone()));
    let ctx = WorkerContext {
        files: Arc::new(LocalFileStore),
        postings: Arc::new(PgJobPostingStore::new(pool)),
        extractor,
        cache: Arc::new(RedisParseCache::new(redis)),
        controller: StatusController::new(resumes),
    };

    let orchestrator = Arc::new(Orchestrator::new(ctx));
    info!("Orchestrator initialized");

    // Single worker for the AI-gated lane, plus the intake/recovery sweep.
    let worker = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.run_worker().await }
    });
    let sweeper = tokio::spawn({
        let orchestrator = orchestrator.clone();
        let interval = Duration::from_secs(config.sweep_interval_secs);
        let grace = chrono::Duration::seconds(SWEEP_GRACE_SECS);
        async move { orchestrator.run_sweeper(interval, grace).await }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, draining worker");
    orchestrator.shutdown();

    worker.await?;
    sweeper.await?;
    info!("Shutdown complete");

    Ok(())
}
