use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::error::TrawlerError;
use crate::search::{snippet, QueryMode, Searcher};

use super::router::AppState;
use super::types::{ErrorResponse, SearchHit, SearchParams, SearchResponse};

const MAX_LIMIT: usize = 100;
const DEFAULT_LIMIT: usize = 10;

/// Error wrapper for API handlers
pub enum ApiError {
    BadRequest(String),
    Internal(TrawlerError),
}

impl From<TrawlerError> for ApiError {
    fn from(e: TrawlerError) -> Self {
        ApiError::Internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Internal(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                e.to_string(),
            ),
        };
        let body = ErrorResponse::new(error_type, message);
        (status, Json(body)).into_response()
    }
}

/// Execute one search request
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let start = Instant::now();

    let Some(query) = params.q.filter(|q| !q.is_empty()) else {
        return Err(ApiError::BadRequest(
            "missing query parameter 'q'".to_string(),
        ));
    };
    let mode = match params.mode.as_deref() {
        None | Some("or") => QueryMode::Or,
        Some("and") => QueryMode::And,
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "invalid mode '{}', use 'and' or 'or'",
                other
            )));
        }
    };
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let terms = state.tokenizer.tokenize(&query);
    if terms.is_empty() {
        return Err(ApiError::BadRequest(
            "no valid query terms found".to_string(),
        ));
    }

    let searcher = Searcher::new(&state.index);
    let scored = searcher.search(&terms, mode)?;
    let total_results = scored.len();

    let term_set: HashSet<String> = terms.iter().cloned().collect();
    let mut results = Vec::with_capacity(limit.min(total_results));
    for hit in scored.iter().take(limit) {
        let text = state.index.fetch_document(hit.doc_id)?;
        results.push(SearchHit {
            doc_id: hit.doc_id,
            score: hit.score,
            snippet: snippet::generate(&text, &term_set, snippet::quote_mark),
        });
    }

    let response = SearchResponse {
        query,
        total_results,
        returned_results: results.len(),
        search_time_ms: start.elapsed().as_secs_f64() * 1_000.0,
        results,
    };
    Ok(Json(response))
}
