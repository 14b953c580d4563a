//! JSON Logic targeting backed by `datalogic-rs`.

use std::panic::{catch_unwind, AssertUnwindSafe};

use datalogic_rs::DataLogic;
use serde_json::Value;

use super::{json_type_name, RuleError, RuleEvaluator};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLogic;

impl RuleEvaluator for JsonLogic {
    fn apply(&self, rule: &str, data: &Value) -> Result<Value, RuleError> {
        if !matches!(data, Value::Object(_) | Value::Null) {
            return Err(RuleError::MalformedContext(json_type_name(data)));
        }

        let rule: Value = serde_json::from_str(rule)?;

        // The engine keeps an arena per instance, so each evaluation gets its own.
        // A panic inside it must not escape flag evaluation.
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let logic = DataLogic::new();
            logic
                .evaluate_json(&rule, data)
                .map_err(|e| e.to_string())
        }));

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(RuleError::Evaluation(message)),
            Err(_) => Err(RuleError::Aborted),
        }
    }
}
