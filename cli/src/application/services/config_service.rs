//! Application service: configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::{MigraConfig, set_config_value};

/// Load configuration.
pub fn load_config(store: &impl ConfigStore) -> Result<MigraConfig> {
    store.load()
}

/// Validate and persist one setting, returning the updated configuration.
pub fn set_config(store: &impl ConfigStore, key: &str, value: &str) -> Result<MigraConfig> {
    let mut config = store.load()?;
    set_config_value(&mut config, key, value)?;
    store.save(&config)?;
    Ok(config)
}
