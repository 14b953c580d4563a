use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::ListFlagsQuery;
use crate::state::AppState;
use crate::store::FlagStore;

/// List all flags, optionally only those of one declared type
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListFlagsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let store = state.evaluator.store();
    let flags = match query.flag_type {
        Some(flag_type) => store.find_by_type(flag_type).await,
        None => store.find_all().await,
    }
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch flags");
        (StatusCode::SERVICE_UNAVAILABLE, "Failed to fetch flags".to_string())
    })?;

    Ok(Json(flags))
}

/// Get a single flag definition by name
pub async fn get(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let flag = state
        .evaluator
        .store()
        .find_by_name(&name)
        .await
        .map_err(|e| {
            tracing::error!(flag = %name, error = %e, "Failed to fetch flag");
            (StatusCode::SERVICE_UNAVAILABLE, "Failed to fetch flag".to_string())
        })?;

    match flag {
        Some(f) => Ok(Json(f)),
        None => Err((StatusCode::NOT_FOUND, format!("Flag '{}' not found", name))),
    }
}
