use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{types::Json, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use super::{FlagStore, StoreError};
use crate::evaluation::{FlagDefinition, FlagState, FlagType};

#[derive(Debug, sqlx::FromRow)]
struct FlagRow {
    id: Uuid,
    name: String,
    state: String,
    flag_type: String,
    default_variant: Option<String>,
    variants: Json<HashMap<String, Value>>,
    targeting: Option<String>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FlagRow> for FlagDefinition {
    type Error = StoreError;

    fn try_from(row: FlagRow) -> Result<Self, Self::Error> {
        let decode_error = |message: String| StoreError::Decode {
            name: row.name.clone(),
            message,
        };
        let state = row.state.parse::<FlagState>().map_err(decode_error)?;
        let flag_type = row.flag_type.parse::<FlagType>().map_err(decode_error)?;

        Ok(FlagDefinition {
            id: Some(row.id),
            name: row.name,
            state,
            flag_type,
            default_variant: row.default_variant,
            variants: row.variants.0,
            targeting: row.targeting,
            updated_at: Some(row.updated_at),
        })
    }
}

/// Reads flag definitions from the `feature_flags` table.
#[derive(Debug, Clone)]
pub struct PgFlagStore {
    db: PgPool,
}

impl PgFlagStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn decode_all(rows: Vec<FlagRow>) -> Result<Vec<FlagDefinition>, StoreError> {
    rows.into_iter().map(FlagDefinition::try_from).collect()
}

impl FlagStore for PgFlagStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<FlagDefinition>, StoreError> {
        let row: Option<FlagRow> = sqlx::query_as(
            r#"
            SELECT id, name, state, flag_type, default_variant, variants, targeting, updated_at
            FROM feature_flags
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| {
            tracing::error!(flag = name, error = %e, "Failed to fetch flag");
            e
        })?;

        row.map(FlagDefinition::try_from).transpose()
    }

    async fn find_all(&self) -> Result<Vec<FlagDefinition>, StoreError> {
        let rows: Vec<FlagRow> = sqlx::query_as(
            r#"
            SELECT id, name, state, flag_type, default_variant, variants, targeting, updated_at
            FROM feature_flags
            ORDER BY name
            "#,
        )
        .fetch_all(&self.db)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch flags");
            e
        })?;

        decode_all(rows)
    }

    async fn find_by_type(&self, flag_type: FlagType) -> Result<Vec<FlagDefinition>, StoreError> {
        let rows: Vec<FlagRow> = sqlx::query_as(
            r#"
            SELECT id, name, state, flag_type, default_variant, variants, targeting, updated_at
            FROM feature_flags
            WHERE flag_type = $1
            ORDER BY name
            "#,
        )
        .bind(flag_type.as_str())
        .fetch_all(&self.db)
        .await
        .map_err(|e| {
            tracing::error!(flag_type = %flag_type, error = %e, "Failed to fetch flags by type");
            e
        })?;

        decode_all(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(state: &str, flag_type: &str) -> FlagRow {
        FlagRow {
            id: Uuid::new_v4(),
            name: "checkout".to_string(),
            state: state.to_string(),
            flag_type: flag_type.to_string(),
            default_variant: Some("off".to_string()),
            variants: Json(HashMap::from([
                ("on".to_string(), json!("true")),
                ("off".to_string(), json!("false")),
            ])),
            targeting: Some(r#"{"var":"plan"}"#.to_string()),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_decodes_into_definition() {
        let row = row("ENABLED", "BOOLEAN");
        let id = row.id;
        let flag = FlagDefinition::try_from(row).unwrap();

        assert_eq!(flag.id, Some(id));
        assert_eq!(flag.state, FlagState::Enabled);
        assert_eq!(flag.flag_type, FlagType::Boolean);
        assert_eq!(flag.variants.get("on"), Some(&json!("true")));
        assert_eq!(flag.targeting_rule(), Some(r#"{"var":"plan"}"#));
        assert!(flag.validate().is_ok());
    }

    #[test]
    fn test_unknown_state_is_decode_error() {
        let err = FlagDefinition::try_from(row("PAUSED", "BOOLEAN")).unwrap_err();
        assert!(matches!(err, StoreError::Decode { ref name, .. } if name == "checkout"));
    }

    #[test]
    fn test_unknown_type_is_decode_error() {
        let err = FlagDefinition::try_from(row("ENABLED", "JSON")).unwrap_err();
        assert!(err.to_string().contains("unknown flag type 'JSON'"));
    }
}
