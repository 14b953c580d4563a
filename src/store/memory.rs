use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

use super::{FlagStore, StoreError};
use crate::evaluation::{FlagDefinition, FlagType};

/// Flags held in process memory, keyed by name.
#[derive(Debug, Default)]
pub struct InMemoryFlagStore {
    flags: RwLock<HashMap<String, FlagDefinition>>,
}

impl InMemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_flags(flags: impl IntoIterator<Item = FlagDefinition>) -> Self {
        let flags = flags
            .into_iter()
            .map(|flag| (flag.name.clone(), flag))
            .collect();
        Self {
            flags: RwLock::new(flags),
        }
    }

    /// Loads a JSON array of flag definitions.
    pub async fn load_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let bytes = tokio::fs::read(path).await?;
        let flags: Vec<FlagDefinition> = serde_json::from_slice(&bytes)?;
        Ok(Self::from_flags(flags))
    }

    pub async fn insert(&self, flag: FlagDefinition) {
        self.flags.write().await.insert(flag.name.clone(), flag);
    }
}

impl FlagStore for InMemoryFlagStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<FlagDefinition>, StoreError> {
        Ok(self.flags.read().await.get(name).cloned())
    }

    async fn find_all(&self) -> Result<Vec<FlagDefinition>, StoreError> {
        let mut flags: Vec<FlagDefinition> = self.flags.read().await.values().cloned().collect();
        flags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(flags)
    }

    async fn find_by_type(&self, flag_type: FlagType) -> Result<Vec<FlagDefinition>, StoreError> {
        let mut flags = self.find_all().await?;
        flags.retain(|flag| flag.flag_type == flag_type);
        Ok(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn flag(name: &str, flag_type: FlagType) -> FlagDefinition {
        FlagDefinition::new(name, flag_type)
            .with_variant("on", "on")
            .with_default_variant("on")
    }

    #[tokio::test]
    async fn test_find_by_name() {
        let store = InMemoryFlagStore::from_flags([flag("beta", FlagType::Boolean)]);

        assert!(store.find_by_name("beta").await.unwrap().is_some());
        assert!(store.find_by_name("gamma").await.unwrap().is_none());

        store.insert(flag("gamma", FlagType::String)).await;
        assert!(store.find_by_name("gamma").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_find_all_and_by_type() {
        let store = InMemoryFlagStore::from_flags([
            flag("zeta", FlagType::Boolean),
            flag("alpha", FlagType::Boolean),
            flag("theme", FlagType::String),
        ]);

        let names: Vec<String> = store
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, ["alpha", "theme", "zeta"]);

        let booleans = store.find_by_type(FlagType::Boolean).await.unwrap();
        assert_eq!(booleans.len(), 2);
        assert!(store.find_by_type(FlagType::Object).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "banner", "state": "ENABLED", "type": "STRING",
                 "defaultVariant": "a", "variants": {{"a": "hello"}}}}]"#
        )
        .unwrap();

        let store = InMemoryFlagStore::load_json_file(file.path()).await.unwrap();
        let banner = store.find_by_name("banner").await.unwrap().unwrap();
        assert_eq!(banner.flag_type, FlagType::String);
    }

    #[tokio::test]
    async fn test_load_invalid_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = InMemoryFlagStore::load_json_file(file.path()).await.unwrap_err();
        assert!(matches!(err, StoreError::Parse(_)));
    }
}
