use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthData {
    status: u16,
    store: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthData> {
    let store = if state.evaluator.store().is_open() {
        "circuit_open"
    } else {
        "available"
    };
    let health_data = HealthData {
        status: StatusCode::OK.as_u16(),
        store,
    };
    Json(health_data)
}
