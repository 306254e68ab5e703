use axum::{
    extract::{Extension, State},
    http::{HeaderValue, StatusCode},
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;
use crate::conversation::ConversationTurn;
use crate::engine::{QueryResult, RagSystem};
use crate::language::LanguageInfo;
use crate::RagError;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub documents_loaded: usize,
    pub queries_answered: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub language: String,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

pub struct AppState {
    pub rag_system: Arc<RagSystem>,
    pub queries_answered: AtomicUsize,
}

impl AppState {
    pub fn new(rag_system: Arc<RagSystem>) -> Self {
        Self {
            rag_system,
            queries_answered: AtomicUsize::new(0),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/languages", get(list_languages))
        .route("/stats", get(stats))
        .route("/query", post(query))
        .layer(middleware::from_fn(request_logging))
        .with_state(Arc::new(state))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn list_languages(State(state): State<Arc<AppState>>) -> Json<Vec<LanguageInfo>> {
    Json(state.rag_system.supported_languages())
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        documents_loaded: state.rag_system.document_count(),
        queries_answered: state.queries_answered.load(Ordering::Relaxed),
    })
}

async fn query(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(request): Json<QueryRequest>,
) -> std::result::Result<Json<QueryResult>, (StatusCode, Json<ErrorResponse>)> {
    info!(%request_id, language = %request.language, history = request.conversation_history.len(), "Processing query");

    match state
        .rag_system
        .query(&request.question, &request.language, &request.conversation_history)
        .await
    {
        Ok(result) => {
            state.queries_answered.fetch_add(1, Ordering::Relaxed);
            info!(%request_id, retrieved_docs = result.retrieved_docs, "Query processed in {}ms", result.processing_time_ms);
            Ok(Json(result))
        }
        Err(e) => {
            if e.is_client_error() {
                warn!(%request_id, "Rejected query: {}", e);
            } else {
                error!(%request_id, "Query failed: {}", e);
            }
            Err(error_response(&e))
        }
    }
}

pub fn status_for(err: &RagError) -> StatusCode {
    if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else if err.is_backend_failure() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

pub fn error_response(err: &RagError) -> (StatusCode, Json<ErrorResponse>) {
    (
        status_for(err),
        Json(ErrorResponse {
            error: err.to_string(),
            code: err.code().to_string(),
            timestamp: chrono::Utc::now(),
        }),
    )
}

/// Per-request id assigned by `request_logging`, echoed as `x-request-id`.
#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

pub async fn request_logging(
    mut request: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let request_id = Uuid::new_v4();
    request.extensions_mut().insert(RequestId(request_id));
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = std::time::Instant::now();

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert("x-request-id", value);
    }
    let status = response.status();
    let latency_ms = start.elapsed().as_millis() as u64;
    if status.is_server_error() {
        warn!(%request_id, %method, %path, %status, latency_ms, "Request failed");
    } else {
        info!(%request_id, %method, %path, %status, latency_ms, "Request served");
    }

    response
}
