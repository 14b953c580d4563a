pub mod routes;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::evaluation::{EvaluationContext, EvaluationResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    pub default_value: Value,
    #[serde(default)]
    pub context: Option<EvaluationContext>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse<T> {
    pub flag: String,
    #[serde(flatten)]
    pub result: EvaluationResult<T>,
}
