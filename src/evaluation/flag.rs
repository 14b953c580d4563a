use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagState {
    Enabled,
    Disabled,
}

/// Canonical type a flag was declared with. Informational only: conversion
/// follows the type the caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagType {
    Boolean,
    String,
    Number,
    Object,
}

impl FlagState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagState::Enabled => "ENABLED",
            FlagState::Disabled => "DISABLED",
        }
    }
}

impl FromStr for FlagState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ENABLED" => Ok(FlagState::Enabled),
            "DISABLED" => Ok(FlagState::Disabled),
            other => Err(format!("unknown flag state '{}'", other)),
        }
    }
}

impl FlagType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagType::Boolean => "BOOLEAN",
            FlagType::String => "STRING",
            FlagType::Number => "NUMBER",
            FlagType::Object => "OBJECT",
        }
    }
}

impl FromStr for FlagType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOOLEAN" => Ok(FlagType::Boolean),
            "STRING" => Ok(FlagType::String),
            "NUMBER" => Ok(FlagType::Number),
            "OBJECT" => Ok(FlagType::Object),
            other => Err(format!("unknown flag type '{}'", other)),
        }
    }
}

impl fmt::Display for FlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a flag cannot be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidFlag {
    #[error("flag is disabled")]
    Disabled,
    #[error("flag has no default variant")]
    MissingDefaultVariant,
    #[error("default variant '{0}' is not one of the flag's variants")]
    DanglingDefaultVariant(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    pub state: FlagState,
    #[serde(rename = "type")]
    pub flag_type: FlagType,
    #[serde(default)]
    pub default_variant: Option<String>,
    #[serde(default)]
    pub variants: HashMap<String, Value>,
    #[serde(default, deserialize_with = "deserialize_targeting")]
    pub targeting: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl FlagDefinition {
    pub fn new(name: impl Into<String>, flag_type: FlagType) -> Self {
        Self {
            id: None,
            name: name.into(),
            state: FlagState::Enabled,
            flag_type,
            default_variant: None,
            variants: HashMap::new(),
            targeting: None,
            updated_at: None,
        }
    }

    pub fn with_state(mut self, state: FlagState) -> Self {
        self.state = state;
        self
    }

    pub fn with_variant(mut self, key: impl Into<String>, raw: impl Into<Value>) -> Self {
        self.variants.insert(key.into(), raw.into());
        self
    }

    pub fn with_default_variant(mut self, key: impl Into<String>) -> Self {
        self.default_variant = Some(key.into());
        self
    }

    pub fn with_targeting(mut self, rule: impl Into<String>) -> Self {
        self.targeting = Some(rule.into());
        self
    }

    /// A flag is evaluable only when enabled and its default variant names a
    /// non-null entry of `variants`.
    pub fn validate(&self) -> Result<(), InvalidFlag> {
        if self.state != FlagState::Enabled {
            return Err(InvalidFlag::Disabled);
        }

        let default_variant = self
            .default_variant
            .as_deref()
            .ok_or(InvalidFlag::MissingDefaultVariant)?;

        match self.variants.get(default_variant) {
            Some(raw) if !raw.is_null() => Ok(()),
            _ => Err(InvalidFlag::DanglingDefaultVariant(
                default_variant.to_string(),
            )),
        }
    }

    /// The targeting rule, unless it is absent or a document that cannot
    /// select anything (blank, `null`, `{}`).
    pub fn targeting_rule(&self) -> Option<&str> {
        let rule = self.targeting.as_deref()?.trim();
        if rule.is_empty() {
            return None;
        }

        match serde_json::from_str::<Value>(rule) {
            Ok(Value::Null) => None,
            Ok(Value::Object(map)) if map.is_empty() => None,
            _ => Some(rule),
        }
    }

    /// Default variant key and its raw value; only meaningful after `validate`.
    pub fn default_variant_entry(&self) -> Option<(&str, &Value)> {
        let key = self.default_variant.as_deref()?;
        self.variants.get(key).map(|raw| (key, raw))
    }
}

// Targeting may arrive as an encoded string or as an inline JSON document.
fn deserialize_targeting<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
