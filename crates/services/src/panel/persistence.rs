use std::collections::BTreeMap;
use std::sync::Arc;

use course_core::model::{ModuleKey, ProgressMap};
use serde::Serialize;
use serde::de::DeserializeOwned;
use storage::repository::KeyValueStore;
use tracing::warn;

use super::config::PanelConfig;
use crate::error::PersistenceError;

/// Raw durable state; each entry is independently absent or present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredNavigation {
    pub module: Option<ModuleKey>,
    pub progress: Option<ProgressMap>,
    /// Progress entries skipped while decoding: blank keys, or values that
    /// are not a non-negative integer.
    pub rejected: Vec<String>,
}

/// JSON encoding of the navigation position over a `KeyValueStore`.
#[derive(Clone)]
pub struct NavigationStore {
    kv: Arc<dyn KeyValueStore>,
    module_key: String,
    progress_key: String,
}

impl NavigationStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>, config: &PanelConfig) -> Self {
        Self {
            kv,
            module_key: config.module_key(),
            progress_key: config.progress_key(),
        }
    }

    #[must_use]
    pub fn module_key(&self) -> &str {
        &self.module_key
    }

    #[must_use]
    pub fn progress_key(&self) -> &str {
        &self.progress_key
    }

    /// Read both entries. Values that fail to decode count as absent.
    ///
    /// The progress object is decoded per entry: a bad entry is skipped and
    /// reported in `rejected` while the rest of the map survives.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Unavailable` if the store cannot be read.
    pub async fn load(&self) -> Result<StoredNavigation, PersistenceError> {
        let module = self.read(&self.module_key).await?;
        let raw: Option<BTreeMap<String, serde_json::Value>> = self.read(&self.progress_key).await?;
        let (progress, rejected) = match raw {
            Some(entries) => {
                let (progress, rejected) = decode_progress(entries);
                (Some(progress), rejected)
            }
            None => (None, Vec::new()),
        };
        if !rejected.is_empty() {
            warn!(key = %self.progress_key, ?rejected, "skipping undecodable progress entries");
        }
        Ok(StoredNavigation {
            module,
            progress,
            rejected,
        })
    }

    /// # Errors
    ///
    /// Returns `PersistenceError` if encoding or the write fails.
    pub async fn save_module(&self, module: &ModuleKey) -> Result<(), PersistenceError> {
        self.write(&self.module_key, module).await
    }

    /// # Errors
    ///
    /// Returns `PersistenceError` if encoding or the write fails.
    pub async fn save_progress(&self, progress: &ProgressMap) -> Result<(), PersistenceError> {
        self.write(&self.progress_key, progress).await
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PersistenceError> {
        let Some(raw) = self.kv.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(key, error = %err, "ignoring undecodable stored value");
                Ok(None)
            }
        }
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), PersistenceError> {
        let encoded = serde_json::to_string(value).map_err(|source| PersistenceError::Encode {
            key: key.to_owned(),
            source,
        })?;
        self.kv.set(key, &encoded).await?;
        Ok(())
    }
}

fn decode_progress(entries: BTreeMap<String, serde_json::Value>) -> (ProgressMap, Vec<String>) {
    let mut progress = ProgressMap::new();
    let mut rejected = Vec::new();
    for (raw_key, value) in entries {
        let index = value.as_u64().and_then(|n| u32::try_from(n).ok());
        match (ModuleKey::new(&raw_key), index) {
            (Ok(key), Some(index)) => progress.set(key, index),
            _ => rejected.push(raw_key),
        }
    }
    (progress, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryStore;

    fn key(raw: &str) -> ModuleKey {
        ModuleKey::new(raw).unwrap()
    }

    fn store() -> (InMemoryStore, NavigationStore) {
        let kv = InMemoryStore::new();
        let nav = NavigationStore::new(Arc::new(kv.clone()), &PanelConfig::default());
        (kv, nav)
    }

    #[tokio::test]
    async fn empty_store_loads_nothing() {
        let (_, nav) = store();
        assert_eq!(nav.load().await.unwrap(), StoredNavigation::default());
    }

    #[tokio::test]
    async fn saves_json_under_namespaced_keys() {
        let (kv, nav) = store();
        nav.save_module(&key("basics")).await.unwrap();
        let progress: ProgressMap = [(key("intro"), 5), (key("basics"), 3)]
            .into_iter()
            .collect();
        nav.save_progress(&progress).await.unwrap();

        assert_eq!(
            kv.get("project-react-module").await.unwrap().as_deref(),
            Some("\"basics\"")
        );
        assert_eq!(
            kv.get("project-react-moduleProgress")
                .await
                .unwrap()
                .as_deref(),
            Some(r#"{"basics":3,"intro":5}"#)
        );

        let loaded = nav.load().await.unwrap();
        assert_eq!(loaded.module, Some(key("basics")));
        assert_eq!(loaded.progress, Some(progress));
    }

    #[tokio::test]
    async fn garbage_values_load_as_absent() {
        let (kv, nav) = store();
        kv.set("project-react-module", "not json").await.unwrap();
        kv.set("project-react-moduleProgress", "[1,2]").await.unwrap();

        assert_eq!(nav.load().await.unwrap(), StoredNavigation::default());
    }

    #[tokio::test]
    async fn bad_progress_entries_are_skipped_individually() {
        let (kv, nav) = store();
        kv.set(
            "project-react-moduleProgress",
            r#"{"intro":5,"basics":3,"legacy":-1,"extra":"two","":1,"half":1.5}"#,
        )
        .await
        .unwrap();

        let loaded = nav.load().await.unwrap();
        let expected: ProgressMap = [(key("intro"), 5), (key("basics"), 3)]
            .into_iter()
            .collect();
        assert_eq!(loaded.progress, Some(expected));
        assert_eq!(loaded.rejected, vec!["", "extra", "half", "legacy"]);
    }

    #[tokio::test]
    async fn index_beyond_u32_is_rejected() {
        let (kv, nav) = store();
        kv.set("project-react-moduleProgress", r#"{"intro":4294967296}"#)
            .await
            .unwrap();

        let loaded = nav.load().await.unwrap();
        assert_eq!(loaded.progress, Some(ProgressMap::new()));
        assert_eq!(loaded.rejected, vec!["intro"]);
    }
}
