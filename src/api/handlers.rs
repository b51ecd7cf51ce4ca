use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::COOKIE},
};
use std::sync::Arc;
use std::time::Instant;

use super::AppState;
use super::models::{ErrorBody, SearchRequest, SearchResponse};

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn has_session(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .any(|(name, value)| name == "session" && value == token)
}

pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = Instant::now();

    if let Some(token) = &state.session_token {
        if !has_session(&headers, token) {
            tracing::warn!("rejected search without a valid session");
            return Err(api_error(StatusCode::UNAUTHORIZED, "Authentication required"));
        }
    }

    if request.query.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Query cannot be empty"));
    }
    if !(0.0..=1.0).contains(&request.threshold) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Threshold must be between 0 and 1",
        ));
    }

    let response = state.catalog.search(&request);

    tracing::info!(
        query = %request.query,
        department = ?request.department,
        hits = response.count,
        evaluated = response.total_evaluated,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "search served"
    );

    Ok(Json(response))
}
