//! Engine tuning derived from the user configuration.

use std::time::Duration;

use crate::application::services::backoff::Backoff;
use crate::domain::MigraConfig;

/// Settings shared by the snapshot, restore and removal engines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Wait for captured images to become active.
    pub image_wait: Backoff,
    /// Wait for restored servers to boot, and for deleted ones to disappear.
    pub server_wait: Backoff,
    /// Services processed at the same time.
    pub concurrency: usize,
    pub flavor: String,
    pub security_groups: Vec<String>,
    pub rollback: bool,
}

impl EngineOptions {
    #[must_use]
    pub fn from_config(config: &MigraConfig) -> Self {
        let initial = Duration::from_millis(config.poll_interval_ms);
        Self {
            image_wait: Backoff {
                initial,
                timeout: Duration::from_secs(config.image_timeout_secs),
            },
            server_wait: Backoff {
                initial,
                timeout: Duration::from_secs(config.server_timeout_secs),
            },
            concurrency: config.concurrency.max(1),
            flavor: config.flavor.clone(),
            security_groups: vec![config.security_group.clone()],
            rollback: config.rollback,
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_config(&MigraConfig::default())
    }
}
