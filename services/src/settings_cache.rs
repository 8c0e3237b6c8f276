use db::{Settings, Store};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Read-mostly cache over the persisted `Setting` rows, refreshed on a
/// version counter rather than on every read (§5). Writers bump the
/// counter; readers compare before paying for a Store round-trip.
pub struct SettingsCache {
    store: Arc<Store>,
    inner: RwLock<(u64, Settings)>,
}

impl SettingsCache {
    pub async fn load(store: Arc<Store>) -> Result<Self, common::AppError> {
        let settings = store.get_settings().await?;
        Ok(Self { store, inner: RwLock::new((0, settings)) })
    }

    pub async fn current(&self) -> Settings {
        self.inner.read().await.1
    }

    /// Re-reads settings from the Store and bumps the version counter.
    /// Called by the scheduler once per tick and by the settings-write HTTP
    /// handler immediately after a successful write.
    pub async fn refresh(&self) -> Result<(), common::AppError> {
        let settings = self.store.get_settings().await?;
        let mut guard = self.inner.write().await;
        guard.0 += 1;
        guard.1 = settings;
        Ok(())
    }

    pub async fn version(&self) -> u64 {
        self.inner.read().await.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::test_utils::setup_test_db;

    #[tokio::test]
    async fn refresh_picks_up_a_written_setting() {
        let store = Arc::new(Store::new(setup_test_db().await));
        let cache = SettingsCache::load(store.clone()).await.unwrap();
        assert_eq!(cache.current().await.confidence_threshold, 0.60);

        store.set_setting("confidence_threshold", "0.8").await.unwrap();
        cache.refresh().await.unwrap();
        assert_eq!(cache.current().await.confidence_threshold, 0.8);
        assert_eq!(cache.version().await, 1);
    }
}
