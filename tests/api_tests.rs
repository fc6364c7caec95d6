//! HTTP surface tests. Requests go through the full router via `oneshot`.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{pipeline_with, StubClassifier, ALICE_HIGH_RESPONSE};
use logsentinel::api::{self, state::AppState};
use logsentinel::config::ExportConfig;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const ALICE_FORM: &str =
    "raw_logs=2024-01-15T02%3A00%3A00%7Calice%7C10.0.0.5%7CUnknown%7CUnknown+Device%7Cfailed";

fn app(classifier: Arc<StubClassifier>) -> (Router, TempDir) {
    let (pipeline, dir) = pipeline_with(classifier);
    let state = AppState::new(pipeline, ExportConfig::default());
    (api::router(state), dir)
}

fn form_request(uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_root_reports_running() {
    let (app, _dir) = app(StubClassifier::replying("{}"));
    let response = app.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "LogSentinel API is running");
}

#[tokio::test]
async fn test_analyze_raw_logs_returns_buckets() {
    let (app, _dir) = app(StubClassifier::replying(ALICE_HIGH_RESPONSE));
    let response = app
        .oneshot(form_request("/api/analyze-raw-logs", ALICE_FORM))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["logs_count"], 1);
    assert_eq!(body["overall_risk_score"], "HIGH");
    assert_eq!(body["high_risk_logs"][0]["username"], "alice");
    assert_eq!(body["high_risk_logs"][0]["risk_factors"][0], "unusual login time");
    assert_eq!(body["medium_risk_logs"].as_array().unwrap().len(), 0);
    assert_eq!(body["low_risk_logs"].as_array().unwrap().len(), 0);
    assert!(body["analysis_id"].as_str().is_some());
}

#[tokio::test]
async fn test_empty_raw_logs_is_bad_request() {
    let classifier = StubClassifier::replying(ALICE_HIGH_RESPONSE);
    let (app, _dir) = app(classifier.clone());
    let response = app
        .oneshot(form_request("/api/analyze-raw-logs", "raw_logs=not+a+log+line"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["detail"], "No valid log entries found in delimited input");
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_missing_raw_logs_field_is_bad_request() {
    let classifier = StubClassifier::replying(ALICE_HIGH_RESPONSE);
    let (app, _dir) = app(classifier.clone());
    let response = app
        .oneshot(form_request("/api/analyze-raw-logs", "other=1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("raw_logs"));
    assert_eq!(classifier.calls(), 0);
}

#[tokio::test]
async fn test_unknown_route_returns_json_detail() {
    let (app, _dir) = app(StubClassifier::replying("{}"));
    let response = app.oneshot(get("/api/does-not-exist")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["detail"], "Not found");
}

#[tokio::test]
async fn test_upload_csv_multipart() {
    let (app, _dir) = app(StubClassifier::replying(ALICE_HIGH_RESPONSE));
    let boundary = "logsentinel-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"logs.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         username,ip_address,timestamp,location,device,login_status\n\
         alice,10.0.0.5,2024-01-15T02:00:00,Unknown,Unknown Device,failed\n\
         \r\n--{boundary}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload-csv")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["logs_count"], 1);
    assert_eq!(body["high_risk_logs"][0]["ip_address"], "10.0.0.5");
}

#[tokio::test]
async fn test_unknown_analysis_is_not_found() {
    let (app, _dir) = app(StubClassifier::replying("{}"));

    let response = app
        .clone()
        .oneshot(get("/api/analysis/6f1c9a64-3b1e-4d7e-9a53-0c2b8f7d1e42"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["detail"], "Analysis not found");

    let response = app.oneshot(get("/api/analysis/not-a-uuid")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stored_analysis_and_csv_export() {
    let (app, _dir) = app(StubClassifier::replying(ALICE_HIGH_RESPONSE));
    let response = app
        .clone()
        .oneshot(form_request("/api/analyze-raw-logs", ALICE_FORM))
        .await
        .unwrap();
    let id = body_json(response).await["analysis_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(get(&format!("/api/analysis/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stored = body_json(response).await;
    assert_eq!(stored["analysis_id"], id.as_str());
    assert_eq!(stored["logs"][0]["username"], "alice");

    let response = app
        .clone()
        .oneshot(get(&format!("/api/analysis/{id}/export/csv")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(
        disposition,
        format!("attachment; filename=log_analysis_{}.csv", &id[..8])
    );
    let first = body_bytes(response).await;
    assert!(String::from_utf8_lossy(&first).contains("unusual login time"));

    let again = app
        .oneshot(get(&format!("/api/analysis/{id}/export/csv")))
        .await
        .unwrap();
    assert_eq!(body_bytes(again).await, first);
}

#[tokio::test]
async fn test_pdf_export_renders_with_bundled_fonts() {
    let (app, _dir) = app(StubClassifier::replying(ALICE_HIGH_RESPONSE));
    let response = app
        .clone()
        .oneshot(form_request("/api/analyze-raw-logs", ALICE_FORM))
        .await
        .unwrap();
    let id = body_json(response).await["analysis_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(get(&format!("/api/analysis/{id}/export/pdf")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=log_analysis_{}.pdf", &id[..8]).as_str()
    );
    assert!(body_bytes(response).await.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_unknown_export_format_is_bad_request() {
    let (app, _dir) = app(StubClassifier::replying("{}"));
    let response = app
        .oneshot(get(
            "/api/analysis/6f1c9a64-3b1e-4d7e-9a53-0c2b8f7d1e42/export/xlsx",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_counts_todays_analyses() {
    let (app, _dir) = app(StubClassifier::replying(ALICE_HIGH_RESPONSE));
    app.clone()
        .oneshot(form_request("/api/analyze-raw-logs", ALICE_FORM))
        .await
        .unwrap();

    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["analyses_today"], 1);
}

#[tokio::test]
async fn test_classifier_check_reports_failure_as_json() {
    let (app, _dir) = app(StubClassifier::failing(401, "API key not valid"));
    let request = Request::builder()
        .method("POST")
        .uri("/api/classifier/check")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["classifier"], "stub");
}
