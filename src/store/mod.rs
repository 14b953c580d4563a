pub mod breaker;
pub mod memory;
pub mod postgres;

use std::future::Future;
use thiserror::Error;

use crate::evaluation::{FlagDefinition, FlagType};

pub use breaker::{BreakerSettings, CircuitBreakerStore};
pub use memory::InMemoryFlagStore;
pub use postgres::PgFlagStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid flag record '{name}': {message}")]
    Decode { name: String, message: String },
    #[error("flag store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read flags file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse flags file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Source of flag definitions. `find_by_name` returns `Ok(None)` for an
/// unknown flag; `Err` means the store itself could not answer.
pub trait FlagStore: Send + Sync {
    fn find_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<FlagDefinition>, StoreError>> + Send;

    fn find_all(&self) -> impl Future<Output = Result<Vec<FlagDefinition>, StoreError>> + Send;

    fn find_by_type(
        &self,
        flag_type: FlagType,
    ) -> impl Future<Output = Result<Vec<FlagDefinition>, StoreError>> + Send;
}

/// The store backing a running server: Postgres, or flags loaded from a file.
pub enum FlagSource {
    Postgres(PgFlagStore),
    Memory(InMemoryFlagStore),
}

impl FlagStore for FlagSource {
    async fn find_by_name(&self, name: &str) -> Result<Option<FlagDefinition>, StoreError> {
        match self {
            FlagSource::Postgres(store) => store.find_by_name(name).await,
            FlagSource::Memory(store) => store.find_by_name(name).await,
        }
    }

    async fn find_all(&self) -> Result<Vec<FlagDefinition>, StoreError> {
        match self {
            FlagSource::Postgres(store) => store.find_all().await,
            FlagSource::Memory(store) => store.find_all().await,
        }
    }

    async fn find_by_type(&self, flag_type: FlagType) -> Result<Vec<FlagDefinition>, StoreError> {
        match self {
            FlagSource::Postgres(store) => store.find_by_type(flag_type).await,
            FlagSource::Memory(store) => store.find_by_type(flag_type).await,
        }
    }
}
