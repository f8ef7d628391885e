//! Snapshot of an application: one disk artifact per service.
//!
//! Whether the artifacts actually exist is a filesystem question answered by
//! `application::services::local_snapshot`; this module only deals with the
//! recorded paths.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::topology::{Application, Service};

/// Manifest file written next to the artifacts of a snapshot.
pub const MANIFEST_FILE: &str = "snapshot.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub application: Application,
    pub created_at: DateTime<Utc>,
    pub directory: PathBuf,
    pub items: Vec<ServiceSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    pub service: Service,
    /// `None` once the local artifact has been removed.
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    pub disk_format: String,
    pub container_format: String,
    #[serde(default)]
    pub size_bytes: u64,
}

impl ServiceSnapshot {
    /// Recorded artifact path, ignoring empty paths.
    #[must_use]
    pub fn artifact(&self) -> Option<&Path> {
        self.local_path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

impl Snapshot {
    #[must_use]
    pub fn new(application: Application, directory: PathBuf) -> Self {
        Self {
            application,
            created_at: Utc::now(),
            directory,
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.directory.join(MANIFEST_FILE)
    }

    /// Every item still records an artifact path.
    #[must_use]
    pub fn has_all_paths(&self) -> bool {
        self.items.iter().all(|item| item.artifact().is_some())
    }

    /// Forget every recorded artifact path.
    pub fn clear_paths(&mut self) {
        for item in &mut self.items {
            item.local_path = None;
        }
    }

    /// Reject snapshots in which two services share an artifact file.
    ///
    /// # Errors
    ///
    /// Returns an error naming the duplicated path.
    pub fn check_distinct_paths(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for path in self.items.iter().filter_map(ServiceSnapshot::artifact) {
            if !seen.insert(path) {
                bail!(
                    "snapshot of '{}' records artifact {} more than once",
                    self.application.name,
                    path.display()
                );
            }
        }
        Ok(())
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "snapshot of '{}' ({})",
            self.application.name,
            self.created_at.format("%Y-%m-%d %H:%M:%S%.3f")
        )
    }
}
