pub mod convert;
pub mod engine;
pub mod flag;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub use convert::{ConversionError, FlagValue, ValueKind};
pub use engine::FlagEvaluator;
pub use flag::{FlagDefinition, FlagState, FlagType, InvalidFlag};

/// Why an evaluation produced the value it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    /// Default variant resolved without consulting the targeting rule.
    Static,
    /// Targeting rule ran but matched nothing, so the default variant was used.
    Default,
    /// Targeting rule selected a variant.
    TargetingMatch,
    /// Something went wrong; the caller's default value was returned.
    Error,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reason::Static => "STATIC",
            Reason::Default => "DEFAULT",
            Reason::TargetingMatch => "TARGETING_MATCH",
            Reason::Error => "ERROR",
        };
        f.write_str(s)
    }
}

// Flag evaluation result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult<T> {
    pub value: T,
    pub variant: Option<String>,
    pub reason: Reason,
}

impl<T> EvaluationResult<T> {
    pub fn error(default_value: T) -> Self {
        Self {
            value: default_value,
            variant: None,
            reason: Reason::Error,
        }
    }

    pub fn static_value(value: T) -> Self {
        Self {
            value,
            variant: None,
            reason: Reason::Static,
        }
    }

    pub fn default_value(value: T, variant: impl Into<String>) -> Self {
        Self {
            value,
            variant: Some(variant.into()),
            reason: Reason::Default,
        }
    }

    pub fn targeting_match(value: T, variant: impl Into<String>) -> Self {
        Self {
            value,
            variant: Some(variant.into()),
            reason: Reason::TargetingMatch,
        }
    }
}

/// Caller-supplied attributes a targeting rule is evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    #[serde(
        rename = "targetingKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub targeting_key: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_targeting_key(mut self, key: impl Into<String>) -> Self {
        self.targeting_key = Some(key.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.targeting_key.is_none() && self.attributes.is_empty()
    }

    /// The structured data handed to the rule evaluator: every attribute as-is,
    /// plus `targetingKey` when one is set.
    pub fn to_rule_data(&self) -> Value {
        let mut data = self.attributes.clone();
        if let Some(ref key) = self.targeting_key {
            data.insert("targetingKey".to_string(), Value::String(key.clone()));
        }
        Value::Object(data)
    }
}
