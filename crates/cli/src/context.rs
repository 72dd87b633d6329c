//! Runtime wiring for commands
//!
//! Turns the config file into a `BlobProtocol`: configured instances are
//! registered for lookup, and factories are installed for every selector that
//! can be built from inline URL credentials.

use std::sync::Arc;

use anyhow::{Context as _, bail};

use bw_core::config::Defaults;
use bw_core::{
    BackendHandle, BlobProtocol, Config, ConfigManager, FactoryRegistry, InstanceConfig,
    InstanceRegistry, MemoryFactory, MemoryStore, TRANSIENT_SELECTOR,
};
use bw_s3::{S3_SELECTORS, S3Client, S3Factory, S3Settings};

/// Alternate name for the in-memory backend
const MEMORY_SELECTOR: &str = "memory";

/// Load the configuration file
pub fn load_config() -> anyhow::Result<Config> {
    let manager = ConfigManager::new()?;
    let config = manager
        .load()
        .with_context(|| format!("Failed to load {}", manager.config_path().display()))?;
    Ok(config)
}

/// Factories for every selector that supports inline credentials
pub fn factories(defaults: &Defaults) -> FactoryRegistry {
    let s3 = Arc::new(S3Factory::new(S3Settings::new(
        defaults.endpoint.clone(),
        defaults.region.clone(),
    )));

    let mut registry = FactoryRegistry::new()
        .with(TRANSIENT_SELECTOR, Arc::new(MemoryFactory))
        .with(MEMORY_SELECTOR, Arc::new(MemoryFactory));
    for selector in S3_SELECTORS {
        registry.register(*selector, s3.clone());
    }
    registry
}

/// Connect a configured instance
pub async fn connect_instance(instance: &InstanceConfig) -> anyhow::Result<BackendHandle> {
    let selector = instance.selector.as_str();
    if selector == TRANSIENT_SELECTOR || selector == MEMORY_SELECTOR {
        return Ok(Arc::new(MemoryStore::new()));
    }
    if S3_SELECTORS.contains(&selector) {
        let client = S3Client::from_instance(instance)
            .await
            .with_context(|| format!("Failed to connect instance '{}'", instance.id))?;
        return Ok(Arc::new(client));
    }
    bail!(
        "Instance '{}' uses unsupported selector '{}'",
        instance.id,
        selector
    );
}

/// Build the protocol from a loaded configuration
pub async fn build_protocol(config: &Config) -> anyhow::Result<BlobProtocol> {
    let registry = InstanceRegistry::new();
    for instance in &config.instances {
        let handle = connect_instance(instance).await?;
        registry.register(&instance.id, &instance.selector, handle);
    }
    tracing::debug!(instances = registry.len(), "Registered backend instances");

    Ok(BlobProtocol::new(
        Arc::new(registry),
        Arc::new(factories(&config.defaults)),
        config.defaults.committer(),
    ))
}
