//! Roster Remote Store
//!
//! A single-document store for the roster. Clients pull the whole document
//! with `GET /` and replace it with `POST /`; merging happens on the client.
//!
//! # Configuration
//!
//! Environment variables:
//! - `ROSTER_SERVER_PORT`: Port to listen on (default: 8080)
//! - `ROSTER_SERVER_DATA_DIR`: Directory to store the document (default: ~/.local/share/roster-server)
//!
//! # Endpoints
//!
//! - `GET /`: The stored document, or an empty body when nothing is stored
//! - `POST /`: Replace the stored document (body must be a JSON object)
//! - `GET /health`: Health check endpoint

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DOCUMENT_FILE: &str = "roster.json";

// ============================================================================
// Configuration
// ============================================================================

/// Server configuration
#[derive(Debug, Clone)]
struct Config {
    /// Port to listen on
    port: u16,
    /// Directory holding the stored document
    data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        let port = std::env::var("ROSTER_SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let data_dir = std::env::var("ROSTER_SERVER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("roster-server")
            });

        Self { port, data_dir }
    }
}

// ============================================================================
// Document store
// ============================================================================

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    data_dir: PathBuf,
    /// Serializes writes so concurrent POSTs cannot interleave renames
    write_lock: Arc<Mutex<()>>,
}

impl AppState {
    fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn document_path(&self) -> PathBuf {
        self.data_dir.join(DOCUMENT_FILE)
    }

    async fn read(&self) -> std::io::Result<Option<String>> {
        match tokio::fs::read_to_string(self.document_path()).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, body: &str) -> std::io::Result<()> {
        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let path = self.document_path();
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn error_response(status: StatusCode, error: &'static str, message: String) -> Response {
    (status, Json(ErrorBody { error, message })).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Returns the stored document verbatim
async fn get_document(State(state): State<AppState>) -> Response {
    match state.read().await {
        Ok(Some(body)) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Ok(None) => StatusCode::OK.into_response(),
        Err(e) => {
            tracing::error!("Failed to read document: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "read_failed",
                e.to_string(),
            )
        }
    }
}

/// Replaces the stored document. The body is kept byte for byte.
async fn put_document(State(state): State<AppState>, body: String) -> Response {
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(serde_json::Value::Object(_)) => {}
        Ok(_) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid_document",
                "Document must be a JSON object".to_string(),
            );
        }
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, "invalid_json", e.to_string());
        }
    }

    match state.write(&body).await {
        Ok(()) => {
            tracing::info!("Stored document ({} bytes)", body.len());
            StatusCode::OK.into_response()
        }
        Err(e) => {
            tracing::error!("Failed to store document: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "write_failed",
                e.to_string(),
            )
        }
    }
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_document).post(put_document))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();

    // Ensure data directory exists
    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        tracing::error!("Failed to create data directory: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Data directory: {}", config.data_dir.display());

    let app = app(AppState::new(config.data_dir));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_root() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let temp_dir = TempDir::new().unwrap();
        let response = app(AppState::new(temp_dir.path().to_path_buf()))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("\"status\":\"ok\""));
    }

    #[tokio::test]
    async fn test_get_before_any_post_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let response = app(AppState::new(temp_dir.path().to_path_buf()))
            .oneshot(get_root())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn test_post_then_get_returns_body_verbatim() {
        let temp_dir = TempDir::new().unwrap();
        let state = AppState::new(temp_dir.path().join("store"));
        let doc = r#"{"8th Grade":[{"name":"Amy","dots":2}],"updatedAt":5}"#;

        let response = app(state.clone()).oneshot(post(doc)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(state).oneshot(get_root()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(body_text(response).await, doc);
    }

    #[tokio::test]
    async fn test_post_rejects_non_object() {
        let temp_dir = TempDir::new().unwrap();
        let state = AppState::new(temp_dir.path().to_path_buf());

        for body in ["[1, 2]", "<html></html>", ""] {
            let response = app(state.clone()).oneshot(post(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {:?}", body);
        }
        assert!(!state.document_path().exists());
    }

    #[tokio::test]
    async fn test_rejected_post_keeps_previous_document() {
        let temp_dir = TempDir::new().unwrap();
        let state = AppState::new(temp_dir.path().to_path_buf());
        let doc = r#"{"Band":[]}"#;

        app(state.clone()).oneshot(post(doc)).await.unwrap();
        app(state.clone()).oneshot(post("not json")).await.unwrap();

        let response = app(state).oneshot(get_root()).await.unwrap();
        assert_eq!(body_text(response).await, doc);
    }
}
