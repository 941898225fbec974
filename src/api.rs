//! # API Server Module
//!
//! ## Purpose
//! REST API server exposing the retrieval engine: index building, top-k
//! search, and grounded answer generation over retrieved statute chunks.
//!
//! ## Input/Output Specification
//! - **Input**: HTTP requests with queries and budgets
//! - **Output**: JSON responses with build summaries, ranked chunks, answers
//! - **Error Mapping**: not-found -> 404, invalid state/arguments -> 400
//!
//! ## Key Features
//! - Request validation with explicit bounds on query length, top_k and the
//!   generation budget
//! - Structured error responses carrying the error detail
//! - CORS support for web frontends

use crate::errors::SearchError;
use crate::generation::build_context_prompt;
use crate::retrieval::ScoredChunk;
use crate::AppState;
use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use serde::{Deserialize, Serialize};

/// API server wrapping the shared application state
pub struct ApiServer {
    app_state: AppState,
}

/// Query payload for search and answer endpoints
#[derive(Debug, Deserialize)]
pub struct RagQueryRequest {
    pub query: String,
    pub top_k: Option<usize>,
    pub max_new_tokens: Option<usize>,
}

/// Search response payload
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<ScoredChunk>,
}

/// Answer response payload
#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub sources: Vec<ScoredChunk>,
}

impl ApiServer {
    /// Create new API server
    pub fn new(app_state: AppState) -> Self {
        Self { app_state }
    }

    /// Run the API server until shutdown
    pub async fn run(self) -> crate::errors::Result<()> {
        let bind_addr = format!(
            "{}:{}",
            self.app_state.config.server.host, self.app_state.config.server.port
        );
        let workers = self.app_state.config.server.workers.max(1);
        let state = self.app_state;

        tracing::info!("Starting API server on {}", bind_addr);

        HttpServer::new(move || {
            let cors = if state.config.server.enable_cors {
                Cors::permissive()
            } else {
                Cors::default()
            };
            App::new()
                .wrap(cors)
                .app_data(web::Data::new(state.clone()))
                .route("/", web::get().to(index_handler))
                .route("/rag/build", web::post().to(build_handler))
                .route("/rag/search", web::post().to(search_handler))
                .route("/rag/answer", web::post().to(answer_handler))
        })
        .workers(workers)
        .bind(&bind_addr)
        .map_err(|e| SearchError::Internal {
            message: format!("Failed to bind server to {}: {}", bind_addr, e),
        })?
        .run()
        .await
        .map_err(|e| SearchError::Internal {
            message: format!("Server error: {}", e),
        })?;

        Ok(())
    }
}

/// Health endpoint handler
async fn index_handler(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let response = serde_json::json!({
        "status": "statute search backend running",
        "index_built": state.retrieval.is_built().await,
        "indexed_chunks": state.retrieval.indexed_chunks().await,
    });
    Ok(HttpResponse::Ok().json(response))
}

/// Index build endpoint handler
async fn build_handler(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    match state.retrieval.build_index().await {
        Ok(summary) => Ok(HttpResponse::Ok().json(summary)),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Search endpoint handler
async fn search_handler(
    state: web::Data<AppState>,
    request: web::Json<RagQueryRequest>,
) -> ActixResult<HttpResponse> {
    if let Some(rejection) = validate_request(&request) {
        return Ok(rejection);
    }

    let top_k = request.top_k.unwrap_or(state.config.retrieval.default_top_k);
    match state.retrieval.search(&request.query, top_k).await {
        Ok(results) => Ok(HttpResponse::Ok().json(SearchResponse {
            query: request.query.clone(),
            results,
        })),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Answer endpoint handler: retrieve, build the grounded prompt, generate
async fn answer_handler(
    state: web::Data<AppState>,
    request: web::Json<RagQueryRequest>,
) -> ActixResult<HttpResponse> {
    if let Some(rejection) = validate_request(&request) {
        return Ok(rejection);
    }

    let top_k = request.top_k.unwrap_or(state.config.retrieval.default_top_k);
    let matches = match state.retrieval.search(&request.query, top_k).await {
        Ok(matches) => matches,
        Err(e) => return Ok(error_response(&e)),
    };

    let prompt = build_context_prompt(&request.query, &matches);
    let max_new_tokens = request
        .max_new_tokens
        .unwrap_or(state.config.generation.default_max_new_tokens);
    match state.generator.generate(&prompt, max_new_tokens).await {
        Ok(answer) => Ok(HttpResponse::Ok().json(AnswerResponse {
            answer,
            sources: matches,
        })),
        Err(e) => Ok(error_response(&e)),
    }
}

/// Bounds validation shared by the query endpoints
fn validate_request(request: &RagQueryRequest) -> Option<HttpResponse> {
    if request.query.trim().chars().count() < 3 {
        return Some(detail_response(
            StatusCode::BAD_REQUEST,
            "query must be at least 3 characters",
        ));
    }
    if let Some(top_k) = request.top_k {
        if !(1..=20).contains(&top_k) {
            return Some(detail_response(
                StatusCode::BAD_REQUEST,
                "top_k must be between 1 and 20",
            ));
        }
    }
    if let Some(budget) = request.max_new_tokens {
        if !(32..=1024).contains(&budget) {
            return Some(detail_response(
                StatusCode::BAD_REQUEST,
                "max_new_tokens must be between 32 and 1024",
            ));
        }
    }
    None
}

fn detail_response(status: StatusCode, detail: &str) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({ "detail": detail }))
}

/// Map a pipeline error onto its HTTP response
fn error_response(err: &SearchError) -> HttpResponse {
    tracing::error!(category = err.category(), error = %err, "request failed");
    let status = StatusCode::from_u16(err.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    detail_response(status, &err.to_string())
}
