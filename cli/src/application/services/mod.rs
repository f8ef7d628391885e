//! Application services: use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`, never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod backoff;
pub mod batch;
pub mod compensation;
pub mod config_service;
pub mod local_snapshot;
pub mod migrate;
pub mod options;
pub mod removal;
pub mod restore;
pub mod snapshot;
pub mod topology;

#[cfg(test)]
pub(crate) mod test_support;
