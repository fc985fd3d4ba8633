use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{
    entities::{Activity, Settings},
    KeyValueStore,
};

pub const ACTIVITIES_KEY: &str = "activities";
pub const SETTINGS_KEY: &str = "userSettings";
pub const SETTINGS_SAVED_KEY: &str = "settingsSaved";

const SETTINGS_SAVED_VALUE: &str = "true";

/// Typed view over a [KeyValueStore]. Knows the layout of the persisted documents:
///  - `activities` holds the full list of activities.
///  - `userSettings` holds [Settings].
///  - `settingsSaved` is a one-shot flag set after settings change.
pub struct LocalStore<S> {
    store: S,
}

impl<S: KeyValueStore> LocalStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    pub async fn load_activities(&self) -> Result<Vec<Activity>> {
        Ok(self.load_json(ACTIVITIES_KEY).await?.unwrap_or_default())
    }

    /// Overwrites the whole activity list.
    pub async fn save_activities(&self, activities: &[Activity]) -> Result<()> {
        self.save_json(ACTIVITIES_KEY, activities).await
    }

    pub async fn load_settings(&self) -> Result<Settings> {
        Ok(self.load_json(SETTINGS_KEY).await?.unwrap_or_default())
    }

    /// Saves settings and raises the `settingsSaved` flag for the next dashboard load.
    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.save_json(SETTINGS_KEY, settings).await?;
        self.store
            .set(SETTINGS_SAVED_KEY, SETTINGS_SAVED_VALUE)
            .await
            .context("Failed to raise settings saved flag")
    }

    /// Consumes the `settingsSaved` flag. Returns true at most once per raised flag.
    pub async fn take_settings_saved(&self) -> Result<bool> {
        match self.store.get(SETTINGS_SAVED_KEY).await? {
            Some(v) if v == SETTINGS_SAVED_VALUE => {
                self.store.remove(SETTINGS_SAVED_KEY).await?;
                Ok(true)
            }
            Some(v) => {
                debug!("Ignoring settings saved flag with value {v:?}");
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self
            .store
            .get(key)
            .await
            .with_context(|| format!("Failed to read {key}"))?
        else {
            return Ok(None);
        };
        match serde_json::from_str::<T>(&raw) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                // Treated the same way as a missing document. The next write replaces it.
                warn!("Stored document {key} is corrupted {e}: {raw}");
                Ok(None)
            }
        }
    }

    async fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store
            .set(key, &raw)
            .await
            .with_context(|| format!("Failed to write {key}"))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;

    use crate::storage::{
        entities::{Activity, Settings},
        KeyValueStore, MemoryStore,
    };

    use super::{LocalStore, ACTIVITIES_KEY, SETTINGS_SAVED_KEY};

    #[tokio::test]
    async fn test_empty_store_defaults() -> Result<()> {
        let store = LocalStore::new(MemoryStore::new());
        assert!(store.load_activities().await?.is_empty());
        assert_eq!(store.load_settings().await?, Settings::default());
        assert!(!store.take_settings_saved().await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_activities_roundtrip_layout() -> Result<()> {
        let store = LocalStore::new(MemoryStore::new());
        let activities = vec![Activity {
            id: 10,
            name: "Run".into(),
            duration: 30,
            description: "".into(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        }];
        store.save_activities(&activities).await?;

        assert_eq!(
            store.inner().get(ACTIVITIES_KEY).await?.as_deref(),
            Some(r#"[{"id":10,"name":"Run","duration":30,"description":"","date":"2024-05-01"}]"#)
        );
        assert_eq!(store.load_activities().await?, activities);
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupted_activities() -> Result<()> {
        let store = LocalStore::new(MemoryStore::with_values([(ACTIVITIES_KEY, "[{\"id\":")]));
        assert!(store.load_activities().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_settings_saved_flag_is_one_shot() -> Result<()> {
        let store = LocalStore::new(MemoryStore::new());
        store.save_settings(&Settings::with_interval(30)).await?;

        assert_eq!(
            store.inner().get(SETTINGS_SAVED_KEY).await?.as_deref(),
            Some("true")
        );
        assert!(store.take_settings_saved().await?);
        assert!(!store.take_settings_saved().await?);
        assert_eq!(store.load_settings().await?.interval, Some(30));
        Ok(())
    }
}
