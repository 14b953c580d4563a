pub mod json_logic;

use serde_json::Value;
use thiserror::Error;

pub use json_logic::JsonLogic;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule document is not valid JSON: {0}")]
    MalformedRule(#[from] serde_json::Error),
    #[error("rule data must be a JSON object, got {0}")]
    MalformedContext(&'static str),
    #[error("rule evaluation failed: {0}")]
    Evaluation(String),
    #[error("rule engine aborted while evaluating")]
    Aborted,
}

/// Applies a targeting rule document to structured context data.
///
/// `Ok(Value::Null)` means the rule did not select anything.
pub trait RuleEvaluator: Send + Sync {
    fn apply(&self, rule: &str, data: &Value) -> Result<Value, RuleError>;
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
