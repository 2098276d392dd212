//! HTTP client for the remote roster store.
//!
//! The remote is a single endpoint: `GET` returns the whole document and
//! `POST` replaces it. Nothing here ever returns an error to the caller;
//! failures are logged and reported as "no document".

use std::future::Future;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use super::error::SyncError;
use crate::models::RosterDocument;

/// A store holding one copy of the roster document.
pub trait RemoteStore: Send + Sync + 'static {
    /// Fetches the remote document, or `None` if it is unreachable or the
    /// response is not a roster document.
    fn pull(&self) -> impl Future<Output = Option<RosterDocument>> + Send;

    /// Sends the whole document. Best effort: no acknowledgment is expected.
    fn push(&self, doc: RosterDocument) -> impl Future<Output = ()> + Send;
}

/// Remote store reached over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    url: String,
    client: reqwest::Client,
}

impl HttpRemoteStore {
    /// Creates a client for `url`, bounding every request by `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::ClientBuild(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// GETs and validates the remote document. Redirects are followed.
    pub async fn fetch(&self) -> Result<RosterDocument, SyncError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SyncError::NetworkUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SyncError::NetworkUnavailable(format!(
                "Server returned status {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::NetworkUnavailable(e.to_string()))?;

        parse_remote_body(&body)
    }

    /// POSTs the serialized document as an opaque body.
    pub async fn send(&self, doc: &RosterDocument) -> Result<(), SyncError> {
        let body = doc
            .to_json()
            .map_err(|e| SyncError::MalformedRemoteData(e.to_string()))?;

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| SyncError::NetworkUnavailable(e.to_string()))?;

        tracing::debug!("Push to {} answered {}", self.url, response.status());
        Ok(())
    }
}

impl RemoteStore for HttpRemoteStore {
    async fn pull(&self) -> Option<RosterDocument> {
        match self.fetch().await {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!("Pull from {} ignored: {}", self.url, e);
                None
            }
        }
    }

    async fn push(&self, doc: RosterDocument) {
        if let Err(e) = self.send(&doc).await {
            tracing::warn!("Push to {} failed: {}", self.url, e);
        }
    }
}

/// Accepts a response body only if it is a roster document with at least
/// one class. Error pages, redirect stubs and empty bodies are rejected.
pub fn parse_remote_body(body: &str) -> Result<RosterDocument, SyncError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(SyncError::MalformedRemoteData(
            "empty response body".to_string(),
        ));
    }

    let doc = RosterDocument::from_json(body)
        .map_err(|e| SyncError::MalformedRemoteData(e.to_string()))?;

    if doc.class_count() == 0 {
        return Err(SyncError::MalformedRemoteData(
            "document has no classes".to_string(),
        ));
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudentRecord;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::{Html, Redirect};
    use axum::routing::get;
    use axum::Router;
    use std::sync::{Arc, Mutex};

    const DOC_JSON: &str = r#"{"updatedAt":200,"B":[{"name":"Bo","dots":2}]}"#;

    type Received = Arc<Mutex<Vec<String>>>;

    async fn record(State(received): State<Received>, body: String) -> StatusCode {
        received.lock().unwrap().push(body);
        StatusCode::OK
    }

    /// Serves canned responses on an ephemeral port.
    async fn spawn_server() -> (String, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/doc", get(|| async { DOC_JSON }).post(record))
            .route("/html", get(|| async { Html("<html><body>Error</body></html>") }))
            .route("/empty", get(|| async { "" }))
            .route("/redirect", get(|| async { Redirect::temporary("/doc") }))
            .route(
                "/fail",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, DOC_JSON) }),
            )
            .with_state(received.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), received)
    }

    fn remote(base: &str, path: &str) -> HttpRemoteStore {
        HttpRemoteStore::new(format!("{}{}", base, path), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_parse_valid_body() {
        let doc = parse_remote_body(DOC_JSON).unwrap();
        assert_eq!(doc.updated_at, Some(200));
        assert_eq!(doc.class_names(), vec!["B"]);
    }

    #[test]
    fn test_parse_accepts_null_counters() {
        let doc = parse_remote_body(r#"{"A":[{"name":"x","dots":null}]}"#).unwrap();
        assert_eq!(doc.class_names(), vec!["A"]);
        assert_eq!(doc.students("A").unwrap()[0].dots, 0);
    }

    #[test]
    fn test_parse_rejects_html() {
        let result = parse_remote_body("<html><head></head></html>");
        assert!(matches!(result, Err(SyncError::MalformedRemoteData(_))));
    }

    #[test]
    fn test_parse_rejects_empty_and_whitespace() {
        assert!(parse_remote_body("").is_err());
        assert!(parse_remote_body("  \n").is_err());
    }

    #[test]
    fn test_parse_rejects_classless_document() {
        assert!(parse_remote_body("{}").is_err());
        assert!(parse_remote_body(r#"{"updatedAt": 999}"#).is_err());
    }

    #[test]
    fn test_parse_rejects_wrong_shapes() {
        assert!(parse_remote_body("null").is_err());
        assert!(parse_remote_body(r#"["A"]"#).is_err());
        assert!(parse_remote_body(r#"{"A": {"name": "x"}}"#).is_err());
    }

    #[tokio::test]
    async fn test_pull_valid_document() {
        let (base, _) = spawn_server().await;
        let doc = remote(&base, "/doc").pull().await.unwrap();
        assert_eq!(doc.updated_at, Some(200));
        assert_eq!(doc.students("B").unwrap()[0].dots, 2);
    }

    #[tokio::test]
    async fn test_pull_follows_redirects() {
        let (base, _) = spawn_server().await;
        let doc = remote(&base, "/redirect").pull().await;
        assert!(doc.is_some());
    }

    #[tokio::test]
    async fn test_pull_html_is_none() {
        let (base, _) = spawn_server().await;
        assert!(remote(&base, "/html").pull().await.is_none());
    }

    #[tokio::test]
    async fn test_pull_empty_is_none() {
        let (base, _) = spawn_server().await;
        assert!(remote(&base, "/empty").pull().await.is_none());
    }

    #[tokio::test]
    async fn test_pull_server_error_is_none() {
        let (base, _) = spawn_server().await;
        let store = remote(&base, "/fail");
        assert!(matches!(
            store.fetch().await,
            Err(SyncError::NetworkUnavailable(_))
        ));
        assert!(store.pull().await.is_none());
    }

    #[tokio::test]
    async fn test_pull_unreachable_is_none() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = remote(&format!("http://{}", addr), "/doc");
        assert!(store.pull().await.is_none());
    }

    #[tokio::test]
    async fn test_push_sends_whole_document() {
        let (base, received) = spawn_server().await;

        let mut doc = RosterDocument::default();
        doc.updated_at = Some(300);
        doc.insert_class("C");
        doc.students_mut("C").unwrap().push(StudentRecord::new("Cy"));

        remote(&base, "/doc").push(doc.clone()).await;

        let bodies = received.lock().unwrap().clone();
        assert_eq!(bodies.len(), 1);
        assert_eq!(RosterDocument::from_json(&bodies[0]).unwrap(), doc);
    }

    #[tokio::test]
    async fn test_push_unreachable_does_not_fail() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = remote(&format!("http://{}", addr), "/doc");
        assert!(store.send(&RosterDocument::default()).await.is_err());
        store.push(RosterDocument::default()).await;
    }
}
