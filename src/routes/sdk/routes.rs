use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::{EvaluateRequest, EvaluateResponse};
use crate::evaluation::{EvaluationResult, FlagValue, ValueKind};
use crate::state::AppState;

/// Evaluate one flag as the requested value type against the caller's context
pub async fn evaluate(
    State(state): State<AppState>,
    Path((name, kind)): Path<(String, String)>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Response, (StatusCode, String)> {
    let kind: ValueKind = kind.parse().map_err(|e| (StatusCode::BAD_REQUEST, e))?;
    let evaluator = &state.evaluator;
    let context = request.context.as_ref();

    let response = match kind {
        ValueKind::Boolean => {
            let default_value = default_value::<bool>(request.default_value)?;
            let result = evaluator.boolean_evaluation(&name, default_value, context).await;
            respond(name, result)
        }
        ValueKind::String => {
            let default_value = default_value::<String>(request.default_value)?;
            let result = evaluator.string_evaluation(&name, default_value, context).await;
            respond(name, result)
        }
        ValueKind::Integer => {
            let default_value = default_value::<i64>(request.default_value)?;
            let result = evaluator.integer_evaluation(&name, default_value, context).await;
            respond(name, result)
        }
        ValueKind::Float => {
            let default_value = default_value::<f64>(request.default_value)?;
            let result = evaluator.float_evaluation(&name, default_value, context).await;
            respond(name, result)
        }
        ValueKind::Object => {
            let default_value = default_value::<Value>(request.default_value)?;
            let result = evaluator.object_evaluation(&name, default_value, context).await;
            respond(name, result)
        }
    };

    Ok(response)
}

fn default_value<T: FlagValue + DeserializeOwned>(raw: Value) -> Result<T, (StatusCode, String)> {
    serde_json::from_value(raw).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("defaultValue is not a valid {}: {}", T::KIND, e),
        )
    })
}

fn respond<T: Serialize>(flag: String, result: EvaluationResult<T>) -> Response {
    Json(EvaluateResponse { flag, result }).into_response()
}
