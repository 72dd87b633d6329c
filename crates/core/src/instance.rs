//! Instance management
//!
//! Instances are named, pre-configured backends. A blob URL picks one with
//! `?id=<instance>`, or implicitly by provider selector.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigManager, default_region};
use crate::error::{Error, Result};

/// A configured backend instance
#[derive(Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Unique id, matched by `?id=` in blob URLs
    pub id: String,

    /// Provider selector, e.g. "s3" or "transient"
    pub selector: String,

    /// Access key / account identity
    #[serde(default)]
    pub identity: String,

    /// Secret key / credential
    #[serde(default)]
    pub secret: String,

    /// Service endpoint URL (provider default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Region
    #[serde(default = "default_region")]
    pub region: String,

    /// Bucket lookup style: "auto", "path", or "dns"
    #[serde(default = "default_bucket_lookup")]
    pub bucket_lookup: String,
}

fn default_bucket_lookup() -> String {
    "auto".to_string()
}

impl std::fmt::Debug for InstanceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceConfig")
            .field("id", &self.id)
            .field("selector", &self.selector)
            .field("identity", &self.identity)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket_lookup", &self.bucket_lookup)
            .finish_non_exhaustive()
    }
}

impl InstanceConfig {
    /// Create a new instance with required fields
    pub fn new(
        id: impl Into<String>,
        selector: impl Into<String>,
        identity: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            selector: selector.into(),
            identity: identity.into(),
            secret: secret.into(),
            endpoint: None,
            region: default_region(),
            bucket_lookup: default_bucket_lookup(),
        }
    }

    /// Set the endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// Manager for configured instances
pub struct InstanceManager {
    config_manager: ConfigManager,
}

impl InstanceManager {
    /// Create a new InstanceManager with a specific ConfigManager
    pub fn with_config_manager(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Create a new InstanceManager using the default config location
    pub fn new() -> Result<Self> {
        let config_manager = ConfigManager::new()?;
        Ok(Self { config_manager })
    }

    /// List all configured instances
    pub fn list(&self) -> Result<Vec<InstanceConfig>> {
        Ok(self.config_manager.load()?.instances)
    }

    /// Get an instance by id
    pub fn get(&self, id: &str) -> Result<InstanceConfig> {
        self.config_manager
            .load()?
            .instances
            .into_iter()
            .find(|i| i.id == id)
            .ok_or_else(|| Error::InstanceNotFound(id.to_string()))
    }

    /// Add or replace an instance
    pub fn set(&self, instance: InstanceConfig) -> Result<()> {
        let mut config = self.config_manager.load()?;
        config.instances.retain(|i| i.id != instance.id);
        config.instances.push(instance);
        self.config_manager.save(&config)
    }

    /// Remove an instance
    pub fn remove(&self, id: &str) -> Result<()> {
        let mut config = self.config_manager.load()?;
        let original_len = config.instances.len();

        config.instances.retain(|i| i.id != id);

        if config.instances.len() == original_len {
            return Err(Error::InstanceNotFound(id.to_string()));
        }

        self.config_manager.save(&config)
    }

    /// Check if an instance exists
    pub fn exists(&self, id: &str) -> Result<bool> {
        let config = self.config_manager.load()?;
        Ok(config.instances.iter().any(|i| i.id == id))
    }
}
