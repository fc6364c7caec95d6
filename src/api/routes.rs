//! API route definitions.

use super::state::AppState;
use super::ApiError;
use crate::analysis::{Analysis, AnalysisRun};
use crate::classify::{self, AssessedRecord, RiskLevel};
use crate::export::{self, ExportFormat};
use crate::ingest::InputFormat;
use axum::extract::rejection::FormRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::{Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

const SERVICE_NAME: &str = "LogSentinel";

pub fn root_routes() -> Router<AppState> {
    Router::new().route("/", get(root))
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/upload-csv", post(upload_csv))
        .route("/analyze-raw-logs", post(analyze_raw_logs))
        .route("/analysis/{id}", get(get_analysis))
        .route("/analysis/{id}/export/{format}", get(export_analysis))
        .route("/classifier/check", post(check_classifier))
}

/// Body returned by both analyze endpoints.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis_id: Uuid,
    pub logs_count: usize,
    pub risk_summary: String,
    pub high_risk_logs: Vec<AssessedRecord>,
    pub medium_risk_logs: Vec<AssessedRecord>,
    pub low_risk_logs: Vec<AssessedRecord>,
    pub recommendations: Vec<String>,
    pub overall_risk_score: RiskLevel,
}

impl From<AnalysisRun> for AnalyzeResponse {
    fn from(run: AnalysisRun) -> Self {
        let AnalysisRun { analysis, buckets } = run;
        Self {
            analysis_id: analysis.analysis_id,
            logs_count: analysis.logs_count,
            risk_summary: analysis.analysis_result.risk_summary,
            high_risk_logs: buckets.high,
            medium_risk_logs: buckets.medium,
            low_risk_logs: buckets.low,
            recommendations: analysis.analysis_result.recommendations,
            overall_risk_score: analysis.analysis_result.overall_risk_score,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawLogsForm {
    pub raw_logs: String,
}

async fn root() -> Json<Value> {
    Json(json!({ "message": format!("{} API is running", SERVICE_NAME) }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let start = Utc.from_utc_datetime(&Utc::now().date_naive().and_time(NaiveTime::default()));
    let end = start + Duration::days(1);

    let analyses_today = match state.pipeline.store().count_created_between(start, end).await {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!(error = %e, "failed to count today's analyses");
            None
        }
    };

    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "analyses_today": analyses_today,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn upload_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let mut content = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|_| ApiError::BadRequest("uploaded file is not valid UTF-8".to_string()))?;
        content = Some(text);
        break;
    }

    let content = content.ok_or_else(|| ApiError::BadRequest("missing 'file' upload field".to_string()))?;
    let run = state.pipeline.run(&content, InputFormat::Csv).await?;
    Ok(Json(run.into()))
}

async fn analyze_raw_logs(
    State(state): State<AppState>,
    form: Result<Form<RawLogsForm>, FormRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Form(form) = form.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let run = state.pipeline.run(&form.raw_logs, InputFormat::Delimited).await?;
    Ok(Json(run.into()))
}

async fn load_analysis(state: &AppState, id: &str) -> Result<Analysis, ApiError> {
    let id = Uuid::parse_str(id).map_err(|_| ApiError::NotFound)?;
    state
        .pipeline
        .store()
        .get(id)
        .await?
        .ok_or(ApiError::NotFound)
}

async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Analysis>, ApiError> {
    Ok(Json(load_analysis(&state, &id).await?))
}

async fn export_analysis(
    State(state): State<AppState>,
    Path((id, format)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let format: ExportFormat = format.parse().map_err(ApiError::BadRequest)?;
    let analysis = load_analysis(&state, &id).await?;
    let disposition = format!(
        "attachment; filename={}",
        export::file_name(&analysis, format)
    );
    let config = state.export.clone();
    let bytes =
        tokio::task::spawn_blocking(move || export::render(&analysis, format, &config)).await??;

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

async fn check_classifier(State(state): State<AppState>) -> Json<Value> {
    let classifier = state.pipeline.classifier();
    match classify::check_connectivity(classifier, state.pipeline.timeout()).await {
        Ok(response) => Json(json!({
            "status": "success",
            "classifier": classifier.name(),
            "response": response,
        })),
        Err(e) => {
            tracing::error!(error = %e, "classifier connectivity check failed");
            Json(json!({
                "status": "error",
                "classifier": classifier.name(),
                "error": e.to_string(),
            }))
        }
    }
}
