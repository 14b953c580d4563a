use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The type a caller asks a flag to be evaluated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Boolean,
    String,
    Integer,
    Float,
    Object,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Boolean => "boolean",
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boolean" => Ok(ValueKind::Boolean),
            "string" => Ok(ValueKind::String),
            "integer" => Ok(ValueKind::Integer),
            "float" => Ok(ValueKind::Float),
            "object" => Ok(ValueKind::Object),
            other => Err(format!(
                "Invalid value type '{}'. Must be one of: boolean, string, integer, float, object",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert variant value {raw} to {kind}")]
pub struct ConversionError {
    pub raw: String,
    pub kind: ValueKind,
}

impl ConversionError {
    fn new(raw: &Value, kind: ValueKind) -> Self {
        Self {
            raw: raw.to_string(),
            kind,
        }
    }
}

/// A type a flag can be evaluated to, with the converter that turns a raw
/// variant value into it.
pub trait FlagValue: Sized + fmt::Debug {
    const KIND: ValueKind;

    fn convert(raw: &Value) -> Result<Self, ConversionError>;
}

/// String-encoded form of a raw variant value: the content of a JSON string,
/// the JSON text of anything else. `null` has no textual form.
fn raw_text(raw: &Value) -> Option<Cow<'_, str>> {
    match raw {
        Value::Null => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        other => Some(Cow::Owned(other.to_string())),
    }
}

impl FlagValue for bool {
    const KIND: ValueKind = ValueKind::Boolean;

    fn convert(raw: &Value) -> Result<Self, ConversionError> {
        let text = raw_text(raw).ok_or_else(|| ConversionError::new(raw, Self::KIND))?;
        if text.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if text.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(ConversionError::new(raw, Self::KIND))
        }
    }
}

impl FlagValue for String {
    const KIND: ValueKind = ValueKind::String;

    fn convert(raw: &Value) -> Result<Self, ConversionError> {
        raw_text(raw)
            .map(Cow::into_owned)
            .ok_or_else(|| ConversionError::new(raw, Self::KIND))
    }
}

impl FlagValue for i64 {
    const KIND: ValueKind = ValueKind::Integer;

    fn convert(raw: &Value) -> Result<Self, ConversionError> {
        raw_text(raw)
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| ConversionError::new(raw, Self::KIND))
    }
}

impl FlagValue for f64 {
    const KIND: ValueKind = ValueKind::Float;

    // `str::parse` also accepts "NaN" and "inf", which JSON cannot carry.
    fn convert(raw: &Value) -> Result<Self, ConversionError> {
        raw_text(raw)
            .and_then(|text| text.parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .ok_or_else(|| ConversionError::new(raw, Self::KIND))
    }
}

// Structured payloads pass through untouched.
impl FlagValue for Value {
    const KIND: ValueKind = ValueKind::Object;

    fn convert(raw: &Value) -> Result<Self, ConversionError> {
        Ok(raw.clone())
    }
}
