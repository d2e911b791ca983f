//! JSON endpoints of the dashboard
//!
//! Every endpoint delegates to the [`Orchestrator`]. Failures are answered with
//! `{"ok": false, "message": ...}` and a matching status code.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::data::{DataKind, DataProvider};
use crate::error::{ExportError, OrchestratorError, ReportAccessError};
use crate::report::{ReportFormat, ResultQuery};
use crate::runner::registry;
use crate::runner::Orchestrator;
use crate::utils::url::DEFAULT_BASE_URL;

/// Shared state for API handlers
pub struct AppState {
    pub orchestrator: Orchestrator,
}

/// Error payload
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "ok": false, "message": self.message }));
        (self.status, body).into_response()
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        let status = match err {
            OrchestratorError::AlreadyRunning { .. } => StatusCode::CONFLICT,
            OrchestratorError::UnknownSuite(_) | OrchestratorError::NoSuitesSelected => {
                StatusCode::BAD_REQUEST
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        let status = match err {
            ExportError::NothingToExport => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<ReportAccessError> for ApiError {
    fn from(err: ReportAccessError) -> Self {
        let status = match err {
            ReportAccessError::ForbiddenPath(_) => StatusCode::FORBIDDEN,
            ReportAccessError::NotFound(_) => StatusCode::NOT_FOUND,
            ReportAccessError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

/// Request body for starting a run
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunRequest {
    pub base_url: Option<String>,
    /// Restrict the run to these suite ids
    pub suites: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStarted {
    pub ok: bool,
    pub run_id: String,
    pub base_url: String,
}

#[derive(Deserialize)]
pub struct ExportRequest {
    pub format: Option<String>,
}

#[derive(Serialize)]
pub struct ExportResponse {
    pub ok: bool,
    pub name: String,
    pub path: String,
}

#[derive(Deserialize)]
pub struct DownloadQuery {
    pub path: String,
}

#[derive(Deserialize)]
pub struct SampleQuery {
    pub kind: Option<String>,
    pub seed: Option<u64>,
}

/// Build API router
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/run", post(start_run))
        .route("/api/status", get(get_status))
        .route("/api/tested-data", get(get_tested_data))
        .route("/api/results", get(get_results))
        .route("/api/export", post(export_report))
        .route("/api/download", get(download_report))
        .route("/api/reports", get(list_reports))
        .route("/api/suites", get(list_suites))
        .route("/api/stop", post(stop_run))
        .route("/api/sample-data", get(sample_data))
}

/// POST /api/run - Start a run in the background
async fn start_run(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RunRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let base_url = request
        .base_url
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let handle = state.orchestrator.start_run(&base_url, request.suites)?;
    let status = state.orchestrator.status();

    Ok((
        StatusCode::ACCEPTED,
        Json(RunStarted {
            ok: true,
            run_id: handle.run_id.clone(),
            base_url: status.base_url.unwrap_or(base_url),
        }),
    ))
}

/// GET /api/status
async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.orchestrator.status())
}

/// GET /api/tested-data - Summary, results and weaknesses of the latest run
async fn get_tested_data(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.orchestrator.tagged_data())
}

/// GET /api/results?outcome=&testType=&severity=&search=
async fn get_results(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResultQuery>,
) -> impl IntoResponse {
    Json(state.orchestrator.results(&query))
}

/// POST /api/export
async fn export_report(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let format = match request.format.as_deref() {
        Some(raw) => raw
            .parse::<ReportFormat>()
            .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e))?,
        None => state
            .orchestrator
            .config()
            .auto_report
            .unwrap_or(ReportFormat::Spreadsheet),
    };

    let path = state.orchestrator.export_report(format)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(Json(ExportResponse {
        ok: true,
        name,
        path: path.display().to_string(),
    }))
}

/// GET /api/download?path= - Bytes of a report inside the reports directory
async fn download_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let bytes = state.orchestrator.download_report(&query.path).await?;
    let name = Path::new(&query.path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "report".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, content_type(&name).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        bytes,
    )
        .into_response())
}

fn content_type(name: &str) -> &'static str {
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some("csv") => "text/csv; charset=utf-8",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        _ => "application/octet-stream",
    }
}

/// GET /api/reports
async fn list_reports(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({ "reports": state.orchestrator.list_reports() }))
}

/// GET /api/suites
async fn list_suites() -> impl IntoResponse {
    Json(serde_json::json!({ "suites": registry::describe() }))
}

/// POST /api/stop - Ask the current run to stop after its in-flight checks
async fn stop_run(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stopping = state.orchestrator.request_stop();
    let message = if stopping {
        "stop requested"
    } else {
        "no run in progress"
    };
    Json(serde_json::json!({ "ok": stopping, "message": message }))
}

/// GET /api/sample-data?kind=&seed=
async fn sample_data(Query(query): Query<SampleQuery>) -> Result<impl IntoResponse, ApiError> {
    let kind = match query.kind.as_deref() {
        Some(raw) => raw
            .parse::<DataKind>()
            .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e))?,
        None => DataKind::ValidUser,
    };
    let provider = DataProvider::new(query.seed);
    Ok(Json(provider.generate(kind, None)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::server::router;
    use crate::driver::traits::scripted::{ScriptedAdapter, ScriptedFactory};
    use crate::utils::HarnessConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(reports: &Path) -> Router {
        let config = HarnessConfig {
            reports_dir: reports.to_path_buf(),
            auto_report: None,
            seed: Some(5),
            ..Default::default()
        };
        let orchestrator = Orchestrator::with_factory(
            config,
            Arc::new(ScriptedFactory::new(ScriptedAdapter::new()).without_browser()),
        );
        router(Arc::new(AppState { orchestrator }))
    }

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_status_is_idle_before_any_run() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = call(app(dir.path()), get("/api/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["state"], "idle");
        assert_eq!(json["running"], false);
    }

    #[tokio::test]
    async fn test_unknown_suite_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = call(
            app(dir.path()),
            post_json(
                "/api/run",
                serde_json::json!({ "baseUrl": "http://t.test", "suites": ["checkout"] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["ok"], false);
        assert!(json["message"].as_str().unwrap().contains("checkout"));
    }

    #[tokio::test]
    async fn test_export_without_results_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = call(
            app(dir.path()),
            post_json("/api/export", serde_json::json!({ "format": "csv" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "no test results to export");

        let (status, _) = call(
            app(dir.path()),
            post_json("/api/export", serde_json::json!({ "format": "pdf" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_download_is_confined_to_reports_dir() {
        let dir = tempfile::tempdir().unwrap();
        let reports = dir.path().join("reports");
        std::fs::create_dir_all(&reports).unwrap();
        std::fs::write(dir.path().join("secret.txt"), "x").unwrap();
        std::fs::write(reports.join("run.csv"), "caseName,outcome\n").unwrap();

        let (status, json) = call(app(&reports), get("/api/download?path=../secret.txt")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["ok"], false);

        let (status, _) = call(app(&reports), get("/api/download?path=missing.csv")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let resp = app(&reports)
            .oneshot(get("/api/download?path=run.csv"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"caseName,outcome"));
    }

    #[tokio::test]
    async fn test_suites_and_empty_tested_data() {
        let dir = tempfile::tempdir().unwrap();
        let (_, json) = call(app(dir.path()), get("/api/suites")).await;
        assert_eq!(json["suites"].as_array().unwrap().len(), 5);
        assert_eq!(json["suites"][4]["id"], "api");

        let (status, json) = call(app(dir.path()), get("/api/tested-data")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_sample_data_is_seeded() {
        let dir = tempfile::tempdir().unwrap();
        let (status, first) = call(
            app(dir.path()),
            get("/api/sample-data?kind=valid-user&seed=4"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, second) = call(
            app(dir.path()),
            get("/api/sample-data?kind=valid_user&seed=4"),
        )
        .await;
        assert_eq!(first["fields"]["email"], second["fields"]["email"]);

        let (status, _) = call(app(dir.path()), get("/api/sample-data?kind=robot")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stop_without_run() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = call(app(dir.path()), Request::builder().method("POST").uri("/api/stop").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["ok"], false);
    }

    #[test]
    fn test_error_status_mapping() {
        let busy = ApiError::from(OrchestratorError::AlreadyRunning {
            run_id: "r1".into(),
        });
        assert_eq!(busy.status, StatusCode::CONFLICT);
        let forbidden = ApiError::from(ReportAccessError::ForbiddenPath("../x".into()));
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    }
}
