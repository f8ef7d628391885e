//! Compensation log for multi-step creation.
//!
//! Every resource the snapshot and restore engines create is recorded here
//! right after the provider accepts it. When an engine aborts, the log is
//! either unwound in reverse order (rollback enabled) or reported so the
//! operator knows what was left behind.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::application::ports::{ArtifactStore, ProgressReporter, ProviderGateway};
use crate::application::services::backoff::Backoff;
use crate::application::services::removal::wait_server_gone;

/// Reverses one completed creation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoAction {
    DeleteImage { id: String, name: String },
    DeleteServer { id: String, name: String },
    DeletePort { id: String, name: String },
    DeleteNetwork { id: String, name: String },
    DetachSubnet { router_id: String, subnet_id: String },
    RemoveArtifact { path: PathBuf },
    RemoveDirectory { path: PathBuf },
}

impl fmt::Display for UndoAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteImage { id, name } => write!(f, "image {name} ({id})"),
            Self::DeleteServer { id, name } => write!(f, "server {name} ({id})"),
            Self::DeletePort { id, name } => write!(f, "port {name} ({id})"),
            Self::DeleteNetwork { id, name } => write!(f, "network {name} ({id})"),
            Self::DetachSubnet {
                router_id,
                subnet_id,
            } => write!(f, "router {router_id} interface on subnet {subnet_id}"),
            Self::RemoveArtifact { path } => write!(f, "artifact {}", path.display()),
            Self::RemoveDirectory { path } => write!(f, "directory {}", path.display()),
        }
    }
}

/// Stack of undo actions shared by the per-service futures of one run.
///
/// The lock is only held to push or pop, never across a provider call.
#[derive(Debug)]
pub struct UndoLog {
    rollback: bool,
    actions: Mutex<Vec<UndoAction>>,
}

impl UndoLog {
    #[must_use]
    pub fn new(rollback: bool) -> Self {
        Self {
            rollback,
            actions: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, action: UndoAction) {
        self.lock().push(action);
    }

    /// Forget an action whose resource was already cleaned up.
    pub fn retract(&self, action: &UndoAction) {
        let mut actions = self.lock();
        if let Some(pos) = actions.iter().rposition(|a| a == action) {
            actions.remove(pos);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<UndoAction>> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Undo every recorded action, most recent first, when rollback is
    /// enabled; otherwise report what was left in place.
    ///
    /// Failures are reported as warnings and do not stop the unwinding.
    pub async fn unwind(
        &self,
        gateway: &impl ProviderGateway,
        store: &impl ArtifactStore,
        reporter: &impl ProgressReporter,
        server_wait: &Backoff,
    ) {
        let actions = std::mem::take(&mut *self.lock());
        if actions.is_empty() {
            return;
        }
        if !self.rollback {
            for action in &actions {
                tracing::warn!(resource = %action, "left in place after failure");
            }
            reporter.warn(&format!(
                "{} resource(s) left in place after the failure: {}",
                actions.len(),
                actions
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
            return;
        }

        reporter.step(&format!("rolling back {} resource(s)...", actions.len()));
        for action in actions.into_iter().rev() {
            let outcome = match &action {
                UndoAction::DeleteImage { id, .. } => gateway.delete_image(id).await,
                UndoAction::DeleteServer { id, name } => match gateway.delete_server(id).await {
                    Ok(()) => wait_server_gone(gateway, id, name, server_wait)
                        .await
                        .map(|_| ()),
                    Err(e) => Err(e),
                },
                UndoAction::DeletePort { id, .. } => gateway.delete_port(id).await,
                UndoAction::DeleteNetwork { id, .. } => gateway.delete_network(id).await,
                UndoAction::DetachSubnet {
                    router_id,
                    subnet_id,
                } => gateway.remove_router_interface(router_id, subnet_id).await,
                UndoAction::RemoveArtifact { path } => store.remove_file(path).await,
                UndoAction::RemoveDirectory { path } => store.remove_dir(path).await,
            };
            match outcome {
                Ok(()) => tracing::info!(resource = %action, "rolled back"),
                Err(e) => {
                    tracing::warn!(resource = %action, error = %format!("{e:#}"), "rollback step failed");
                    reporter.warn(&format!("could not remove {action}: {e:#}"));
                }
            }
        }
    }
}
