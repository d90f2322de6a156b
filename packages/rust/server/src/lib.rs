//! HTTP API and front-end hosting for SIL Inspector.
//!
//! - `POST /api/compile` runs the compile pipeline and returns every stage's result
//! - `GET /api/health` liveness probe
//! - `/assets/*` and a catch-all route serve the built front end

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use serde_json::Value as JsonValue;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use silinspector_core::Pipeline;
use silinspector_shared::{CompileRequest, CompileResponse, Result, SilInspectorError};

/// Name of the front-end entry page inside the static directory.
const INDEX_FILE: &str = "index.html";

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    static_dir: Arc<PathBuf>,
}

/// Build the application router.
pub fn router(pipeline: Arc<Pipeline>, static_dir: impl Into<PathBuf>) -> Router {
    let static_dir = static_dir.into();
    let assets = ServeDir::new(static_dir.join("assets"));
    let state = AppState {
        pipeline,
        static_dir: Arc::new(static_dir),
    };

    Router::new()
        .route("/api/health", get(health))
        .route("/api/compile", post(compile))
        .route("/api/{*rest}", any(api_not_found))
        .nest_service("/assets", assets)
        .fallback(serve_index)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve `app` until Ctrl-C.
pub async fn serve(addr: &str, app: Router) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| SilInspectorError::config(format!("invalid listen address '{addr}': {e}")))?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| SilInspectorError::Server(format!("failed to bind {addr}: {e}")))?;

    info!(%addr, "starting silinspector server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| SilInspectorError::Server(e.to_string()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}

async fn health() -> Json<JsonValue> {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

async fn compile(
    State(state): State<AppState>,
    Json(req): Json<CompileRequest>,
) -> std::result::Result<Json<CompileResponse>, ApiError> {
    let results = state.pipeline.compile(&req).await?;
    Ok(Json(CompileResponse { results }))
}

async fn api_not_found() -> ApiError {
    ApiError::not_found("API endpoint not found")
}

async fn serve_index(State(state): State<AppState>) -> std::result::Result<Html<String>, ApiError> {
    let index = state.static_dir.join(INDEX_FILE);
    tokio::fs::read_to_string(&index)
        .await
        .map(Html)
        .map_err(|_| ApiError::not_found("Frontend build not found"))
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<SilInspectorError> for ApiError {
    fn from(err: SilInspectorError) -> Self {
        match err {
            SilInspectorError::InvalidRequest { message } => Self {
                status: StatusCode::BAD_REQUEST,
                message,
            },
            other => {
                error!(error = %other, "compile failed");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: other.to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "detail": self.message
        }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use silinspector_core::{ProgramRegistry, ProgramSpec};
    use silinspector_shared::{AppConfig, PipelineConfig};

    use super::*;

    fn pipeline_with(specs: Vec<ProgramSpec>) -> Arc<Pipeline> {
        let config = PipelineConfig::from(&AppConfig::default());
        let registry = ProgramRegistry::new(specs).expect("valid registry");
        Arc::new(Pipeline::new(Arc::new(registry), &config))
    }

    fn missing_compiler() -> Arc<Pipeline> {
        let mut config = PipelineConfig::from(&AppConfig::default());
        config.compiler = "/nonexistent/swiftc".into();
        Arc::new(Pipeline::from_config(&config))
    }

    /// Fresh static directory for one test.
    fn static_dir(name: &str, with_index: bool) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "silinspector-static-{}-{name}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("assets")).unwrap();
        std::fs::write(dir.join("assets").join("app.js"), "console.log(1)").unwrap();
        if with_index {
            std::fs::write(dir.join(INDEX_FILE), "<html>inspector</html>").unwrap();
        }
        dir
    }

    async fn spawn_app(pipeline: Arc<Pipeline>, static_dir: &Path) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(pipeline, static_dir);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn health_is_ok() {
        let base = spawn_app(missing_compiler(), &static_dir("health", false)).await;
        let body: JsonValue = reqwest::get(format!("{base}/api/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn blank_source_is_bad_request() {
        let base = spawn_app(missing_compiler(), &static_dir("blank", false)).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/api/compile"))
            .json(&serde_json::json!({ "source": "   " }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: JsonValue = resp.json().await.unwrap();
        assert_eq!(body["detail"], "Source is required");
    }

    #[tokio::test]
    async fn missing_compiler_still_returns_every_stage() {
        let base = spawn_app(missing_compiler(), &static_dir("missing", false)).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/api/compile"))
            .json(&serde_json::json!({ "source": "print(1)", "optimize": true }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let body: JsonValue = resp.json().await.unwrap();
        let results = body["results"].as_object().expect("results object");
        assert_eq!(results.len(), 6);
        let sil = &results["silCanonical"];
        assert_eq!(sil["label"], "SIL Canonical");
        assert_eq!(sil["command"], "/nonexistent/swiftc - -emit-sil -O");
        assert_eq!(sil["exitCode"], 127);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn compile_returns_stage_output() {
        let pipeline = pipeline_with(vec![ProgramSpec::new(
            "echo",
            "Echo",
            vec!["sh".into(), "-c".into(), "cat".into()],
        )]);
        let base = spawn_app(pipeline, &static_dir("echo", false)).await;

        let body: JsonValue = reqwest::Client::new()
            .post(format!("{base}/api/compile"))
            .json(&serde_json::json!({ "source": "print(1)", "parseAsLibrary": true }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let echo = &body["results"]["echo"];
        assert_eq!(echo["exitCode"], 0);
        assert_eq!(echo["output"], "print(1)");
        assert_eq!(
            echo["command"],
            "sh -c cat -parse-as-library -module-name SILInspectorWeb"
        );
    }

    #[tokio::test]
    async fn unknown_api_route_is_not_found() {
        let base = spawn_app(missing_compiler(), &static_dir("unknown", true)).await;
        let resp = reqwest::get(format!("{base}/api/nope")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        let body: JsonValue = resp.json().await.unwrap();
        assert_eq!(body["detail"], "API endpoint not found");
    }

    #[tokio::test]
    async fn front_end_routes_serve_index() {
        let base = spawn_app(missing_compiler(), &static_dir("index", true)).await;
        for path in ["/", "/inspect/sil"] {
            let resp = reqwest::get(format!("{base}{path}")).await.unwrap();
            assert_eq!(resp.status(), reqwest::StatusCode::OK, "path {path}");
            assert_eq!(resp.text().await.unwrap(), "<html>inspector</html>");
        }

        let asset = reqwest::get(format!("{base}/assets/app.js")).await.unwrap();
        assert_eq!(asset.status(), reqwest::StatusCode::OK);
        assert_eq!(asset.text().await.unwrap(), "console.log(1)");
    }

    #[tokio::test]
    async fn missing_front_end_build_is_not_found() {
        let base = spawn_app(missing_compiler(), &static_dir("no-index", false)).await;
        let resp = reqwest::get(format!("{base}/")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        let body: JsonValue = resp.json().await.unwrap();
        assert_eq!(body["detail"], "Frontend build not found");
    }
}
