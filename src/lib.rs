//! LogSentinel -- authentication log triage.
//!
//! Normalizes login-event batches, has an external classifier judge each
//! event, merges the verdicts back by position, buckets records into risk
//! tiers, persists the result, and renders CSV and PDF exports.

pub mod analysis;
pub mod api;
pub mod classify;
pub mod config;
pub mod export;
pub mod ingest;
pub mod storage;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::analysis::AnalysisPipeline;
use crate::classify::gemini::GeminiClassifier;
use crate::config::AppConfig;
use crate::storage::SqliteStore;

/// Wire the production collaborators (Gemini + SQLite) into a pipeline.
pub fn build_pipeline(config: &AppConfig) -> Result<AnalysisPipeline> {
    let classifier = GeminiClassifier::new(&config.classifier).with_context(|| {
        format!(
            "cannot build classifier; set {} or classifier.api_key",
            config::API_KEY_ENV
        )
    })?;
    let store = SqliteStore::open(&config.storage.db_path)
        .with_context(|| format!("failed to open database {}", config.storage.db_path.display()))?;

    Ok(AnalysisPipeline::from_config(
        Arc::new(classifier),
        Arc::new(store),
        config,
    ))
}

/// Start the LogSentinel HTTP service.
pub async fn serve(config: AppConfig) -> Result<()> {
    let pipeline = build_pipeline(&config)?;
    let state = api::state::AppState::new(pipeline, config.export.clone());
    let app = api::router(state);

    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", config.server.bind))?;

    tracing::info!(%addr, "LogSentinel listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
