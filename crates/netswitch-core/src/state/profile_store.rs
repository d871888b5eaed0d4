// # Profile Store
//
// Typed access to the persisted `AutoSwitchConfig`.
//
// The raw `ConfigStore` only knows keys and JSON values. This layer:
// - normalises whatever shape is on disk (see `crate::normalize`)
// - rewrites legacy shapes in the current shape on first load
// - validates user input before anything is written
// - keeps an in-memory copy that always matches what was last persisted

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::normalize::normalize;
use crate::profile::{AutoSwitchConfig, ProfileId};
use crate::traits::ConfigStore;

/// Key the auto-switch configuration is stored under
pub const AUTO_SWITCH_CONFIG_KEY: &str = "autoSwitchConfig";

/// Typed, validating wrapper around a [`ConfigStore`]
pub struct ProfileStore {
    backend: Box<dyn ConfigStore>,
    key: String,
    current: Option<AutoSwitchConfig>,
}

impl ProfileStore {
    /// Load the configuration from `backend`
    ///
    /// A value stored in an older shape is normalised and written back
    /// immediately. An absent value leaves the store unconfigured.
    pub async fn open(backend: Box<dyn ConfigStore>) -> Result<Self> {
        Self::open_with_key(backend, AUTO_SWITCH_CONFIG_KEY).await
    }

    /// Load the configuration stored under a custom key
    pub async fn open_with_key(backend: Box<dyn ConfigStore>, key: &str) -> Result<Self> {
        let mut store = Self {
            backend,
            key: key.to_string(),
            current: None,
        };

        let Some(raw) = store.backend.get(&store.key).await? else {
            debug!("No stored auto-switch configuration under '{}'", store.key);
            return Ok(store);
        };

        let normalized = normalize(&raw);
        if normalized.shape.needs_migration() {
            info!(
                "Migrating stored auto-switch configuration from {:?} shape",
                normalized.shape
            );
            store.persist(&normalized.config).await?;
        }
        store.current = Some(normalized.config);

        Ok(store)
    }

    /// The current configuration, if one was ever saved
    pub fn config(&self) -> Option<&AutoSwitchConfig> {
        self.current.as_ref()
    }

    /// Validate, normalise and persist a user-supplied configuration
    ///
    /// On any error the stored and in-memory configuration are unchanged.
    pub async fn configure(&mut self, config: AutoSwitchConfig) -> Result<AutoSwitchConfig> {
        config.validate()?;
        let config = config.normalized();
        self.save(config.clone()).await?;
        Ok(config)
    }

    /// Persist a new active profile
    pub async fn set_active(&mut self, active: ProfileId) -> Result<()> {
        let config = self.require()?.clone().with_active(active);
        self.save(config).await
    }

    /// Persist the enabled flag
    pub async fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        let config = self.require()?.clone().with_enabled(enabled);
        self.save(config).await
    }

    /// Persist `config` as-is and make it current
    pub async fn save(&mut self, config: AutoSwitchConfig) -> Result<()> {
        self.persist(&config).await?;
        self.current = Some(config);
        Ok(())
    }

    /// Flush the backend
    pub async fn flush(&self) -> Result<()> {
        self.backend.flush().await
    }

    async fn persist(&self, config: &AutoSwitchConfig) -> Result<()> {
        let value = serde_json::to_value(config)?;
        self.backend.set(&self.key, &value).await
    }

    fn require(&self) -> Result<&AutoSwitchConfig> {
        self.current
            .as_ref()
            .ok_or_else(|| Error::config("auto-switch is not configured"))
    }
}

impl std::fmt::Debug for ProfileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileStore")
            .field("key", &self.key)
            .field("current", &self.current)
            .finish()
    }
}
