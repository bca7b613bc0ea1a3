//! Route handlers

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use tracing::debug;

use crate::AppState;
use crate::error::ApiError;
use crate::models::{CourseStats, QueryRequest, QueryResponse};

pub(crate) async fn query_handler(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload?;
    if request.question.trim().is_empty() {
        return Err(ApiError::EmptyQuestion);
    }

    debug!(session_id = ?request.session(), "Handling query");
    let outcome = state
        .rag
        .query(&request.question, request.session())
        .await?;

    Ok(Json(outcome.into()))
}

pub(crate) async fn courses_handler(
    State(state): State<AppState>,
) -> Result<Json<CourseStats>, ApiError> {
    let analytics = state.rag.course_analytics().await?;
    Ok(Json(analytics.into()))
}
