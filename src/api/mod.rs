//! HTTP API: liveness, starting retry batches and polling their status.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Map, Value};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::app::{AppContext, ColetorError};
use crate::batch::{
    enumerate_pending, spawn_batch_dispatcher, BatchDispatcherHandle, MAX_BATCH_SIZE,
};

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<AppContext>,
    pub dispatcher: BatchDispatcherHandle,
}

impl AppState {
    pub fn new(ctx: Arc<AppContext>, dispatcher: BatchDispatcherHandle) -> Self {
        Self { ctx, dispatcher }
    }
}

/// Errors returned to HTTP callers as `{"detail": ...}`
#[derive(Debug)]
pub enum ApiError {
    Internal(String),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/scrape/start-jobs", post(start_jobs_handler))
        .route("/scrape/jobs/:id", get(job_status_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Check the store, start the batch dispatcher and serve until Ctrl+C.
pub async fn serve(ctx: Arc<AppContext>, bind: &str) -> crate::app::Result<()> {
    if let Err(e) = ctx.store.ping() {
        error!("Document store check failed at startup: {}", e);
        ctx.error_log.record(
            "Critical startup failure: could not connect to the document store.",
            Some(error_details(&e)),
        );
    } else {
        info!("Document store connection verified at startup");
    }

    let dispatcher = spawn_batch_dispatcher(ctx.classifier.clone());
    let app = create_app(AppState::new(ctx, dispatcher.clone()));

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("API server listening on {}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    dispatcher.shutdown().await;
    Ok(())
}

async fn root_handler() -> Json<Value> {
    Json(json!({ "message": "Coletor scraper API is up." }))
}

async fn start_jobs_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    info!("Received request to start scraping jobs");
    let failures = &state.ctx.config.store.collections.failures;

    let urls = enumerate_pending(state.ctx.store.as_ref(), failures, MAX_BATCH_SIZE)
        .map_err(|e| start_failed(&state, e))?;

    if urls.is_empty() {
        return Ok((
            StatusCode::OK,
            Json(json!({
                "message": format!("No URLs found in '{}' to process.", failures)
            })),
        ));
    }

    let count = urls.len();
    let job_id = state
        .dispatcher
        .submit(urls)
        .await
        .map_err(|e| start_failed(&state, e))?;

    info!(%job_id, "Queued scraping batch of {} URLs", count);
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": format!("Scraping started in background for {} URLs.", count),
            "job_id": job_id,
        })),
    ))
}

async fn job_status_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let status = state
        .dispatcher
        .jobs()
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("Job {} not found", id)))?;

    let mut body = serde_json::to_value(&status)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    body["job_id"] = json!(id);
    Ok(Json(body))
}

fn start_failed(state: &AppState, e: ColetorError) -> ApiError {
    error!("Failed to start the scraping process: {}", e);
    state
        .ctx
        .error_log
        .record("Failed to start the scraping process.", Some(error_details(&e)));
    ApiError::Internal("Internal error while starting the scraping jobs.".to_string())
}

fn error_details(e: &ColetorError) -> Map<String, Value> {
    let mut details = Map::new();
    details.insert("error".into(), Value::String(e.to_string()));
    details
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::domain::{ArticleRecord, FailureKind, FailureRecord};
    use crate::scraper::{ScrapeError, Scraper};
    use crate::store::{append_record, Document, DocumentStore, SqliteStore};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use std::time::Duration;
    use tower::util::ServiceExt;

    /// Scraper double: URLs containing "slow" time out, others succeed
    struct FakeScraper;

    #[async_trait]
    impl Scraper for FakeScraper {
        async fn scrape(&self, url: &str) -> std::result::Result<ArticleRecord, ScrapeError> {
            if url.contains("slow") {
                return Err(ScrapeError::Timeout {
                    url: url.to_string(),
                });
            }
            let mut record = ArticleRecord::new(url, "example.com");
            record.title = "Title".into();
            record.text = "Text".into();
            Ok(record)
        }
    }

    struct OfflineStore;

    impl DocumentStore for OfflineStore {
        fn ping(&self) -> crate::app::Result<()> {
            Err(ColetorError::StoreUnavailable("offline".into()))
        }
        fn append(&self, _: &str, _: &Value) -> crate::app::Result<String> {
            Err(ColetorError::StoreUnavailable("offline".into()))
        }
        fn list(&self, _: &str, _: usize) -> crate::app::Result<Vec<Document>> {
            Err(ColetorError::StoreUnavailable("offline".into()))
        }
        fn count(&self, _: &str) -> crate::app::Result<usize> {
            Err(ColetorError::StoreUnavailable("offline".into()))
        }
    }

    /// Store whose reads fail while writes still land
    struct UnreadableStore {
        inner: SqliteStore,
    }

    impl DocumentStore for UnreadableStore {
        fn ping(&self) -> crate::app::Result<()> {
            self.inner.ping()
        }
        fn append(&self, collection: &str, body: &Value) -> crate::app::Result<String> {
            self.inner.append(collection, body)
        }
        fn list(&self, _: &str, _: usize) -> crate::app::Result<Vec<Document>> {
            Err(ColetorError::StoreUnavailable("read timed out".into()))
        }
        fn count(&self, collection: &str) -> crate::app::Result<usize> {
            self.inner.count(collection)
        }
    }

    fn setup(store: Arc<dyn DocumentStore>) -> AppState {
        let ctx = Arc::new(AppContext::with_parts(
            Config::default(),
            store,
            Arc::new(FakeScraper),
        ));
        let dispatcher = spawn_batch_dispatcher(ctx.classifier.clone());
        AppState::new(ctx, dispatcher)
    }

    fn seed(store: &SqliteStore, url: &str) {
        let record = FailureRecord::new(url, "earlier failure", FailureKind::Unknown, "Playwright");
        append_record(store, "urls_com_falha", &record).unwrap();
    }

    async fn send(state: &AppState, method: Method, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = create_app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn wait_for_job(state: &AppState, job_id: &str) -> Value {
        for _ in 0..200 {
            let (_, body) = send(state, Method::GET, &format!("/scrape/jobs/{}", job_id)).await;
            if body["status"] == "completed" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} did not complete", job_id);
    }

    #[tokio::test]
    async fn test_root_is_alive() {
        let state = setup(Arc::new(SqliteStore::in_memory().unwrap()));
        let (status, body) = send(&state, Method::GET, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].as_str().unwrap().contains("up"));
    }

    #[tokio::test]
    async fn test_three_successes() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        for i in 0..3 {
            seed(&store, &format!("https://example.com/{}", i));
        }
        let state = setup(store.clone());

        let (status, body) = send(&state, Method::POST, "/scrape/start-jobs").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body["message"].as_str().unwrap().contains("3 URLs"));

        let job = wait_for_job(&state, body["job_id"].as_str().unwrap()).await;
        assert_eq!(job["report"]["succeeded"], 3);
        assert_eq!(store.count("scraped_articles").unwrap(), 3);
        assert_eq!(store.count("urls_com_falha").unwrap(), 3);
        assert_eq!(store.count("erros_de_execucao").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_single_timeout() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        seed(&store, "https://example.com/slow");
        let state = setup(store.clone());

        let (status, body) = send(&state, Method::POST, "/scrape/start-jobs").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body["message"].as_str().unwrap().contains("1 URLs"));

        let job = wait_for_job(&state, body["job_id"].as_str().unwrap()).await;
        assert_eq!(job["report"]["timeouts"], 1);
        assert_eq!(store.count("scraped_articles").unwrap(), 0);
        assert_eq!(store.count("urls_com_falha").unwrap(), 2);
        assert_eq!(store.count("erros_de_execucao").unwrap(), 1);

        let newest = &store.list("urls_com_falha", 2).unwrap()[1];
        assert!(newest.body["reason"]
            .as_str()
            .unwrap()
            .to_lowercase()
            .contains("timeout"));
    }

    #[tokio::test]
    async fn test_empty_store_schedules_nothing() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let state = setup(store.clone());

        let (status, body) = send(&state, Method::POST, "/scrape/start-jobs").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["message"],
            "No URLs found in 'urls_com_falha' to process."
        );
        assert!(body.get("job_id").is_none());

        tokio::time::sleep(Duration::from_millis(50)).await;
        for collection in ["scraped_articles", "urls_com_falha", "erros_de_execucao"] {
            assert_eq!(store.count(collection).unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn test_batch_is_capped_at_one_hundred() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        for i in 0..120 {
            seed(&store, &format!("https://example.com/{}", i));
        }
        let state = setup(store);

        let (status, body) = send(&state, Method::POST, "/scrape/start-jobs").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body["message"].as_str().unwrap().contains("100 URLs"));
    }

    #[tokio::test]
    async fn test_unreachable_store_returns_500() {
        let state = setup(Arc::new(OfflineStore));

        let (status, body) = send(&state, Method::POST, "/scrape/start-jobs").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["detail"],
            "Internal error while starting the scraping jobs."
        );
    }

    #[tokio::test]
    async fn test_unreadable_store_logs_start_failure() {
        let store = Arc::new(UnreadableStore {
            inner: SqliteStore::in_memory().unwrap(),
        });
        let state = setup(store.clone());

        let (status, _) = send(&state, Method::POST, "/scrape/start-jobs").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(store.count("erros_de_execucao").unwrap(), 1);
        let entries = store.inner.list("erros_de_execucao", 10).unwrap();
        assert_eq!(entries[0].body["message"], "Failed to start the scraping process.");
        assert!(entries[0].body["details"]["error"]
            .as_str()
            .unwrap()
            .contains("read timed out"));
        assert_eq!(store.count("scraped_articles").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_job_is_404() {
        let state = setup(Arc::new(SqliteStore::in_memory().unwrap()));
        let (status, _) = send(
            &state,
            Method::GET,
            &format!("/scrape/jobs/{}", Uuid::new_v4()),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
