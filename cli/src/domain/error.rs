//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

// ── Migration errors ──────────────────────────────────────────────────────────

/// Failure categories of the migration engine.
#[derive(Debug, Error)]
pub enum MigraError {
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("{count} {kind}s named '{name}' found, expected exactly one")]
    Ambiguous {
        kind: &'static str,
        name: String,
        count: usize,
    },

    #[error("snapshot of '{application}' is not available: local artifacts are missing")]
    NotAvailable { application: String },

    #[error("{}", provider_message(*.status, .message))]
    Provider { status: Option<u16>, message: String },

    #[error("timed out after {}s waiting for {label}", .waited.as_secs())]
    Timeout { label: String, waited: Duration },

    #[error("{} services failed: {}", .failures.len(), ServiceList(.failures))]
    Services { failures: Vec<ServiceFailure> },
}

impl MigraError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            status: None,
            message: message.into(),
        }
    }
}

fn provider_message(status: Option<u16>, message: &str) -> String {
    match (status, message.is_empty()) {
        (Some(code), false) => format!("provider returned {code}: {message}"),
        (Some(code), true) => format!("provider returned {code}"),
        (None, _) => format!("provider error: {message}"),
    }
}

/// One failed service inside a concurrent per-service pass.
#[derive(Debug)]
pub struct ServiceFailure {
    pub service: String,
    pub error: anyhow::Error,
}

struct ServiceList<'a>(&'a [ServiceFailure]);

impl fmt::Display for ServiceList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {:#}", failure.service, failure.error)?;
        }
        Ok(())
    }
}

// ── Classification ────────────────────────────────────────────────────────────

/// Coarse category of an error, used for exit reporting and JSON codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    NotAvailable,
    Provider,
    Timeout,
    Ambiguous,
}

impl ErrorKind {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::NotAvailable => "not_available",
            Self::Provider => "provider_error",
            Self::Timeout => "timeout",
            Self::Ambiguous => "ambiguous",
        }
    }
}

impl MigraError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Ambiguous { .. } => ErrorKind::Ambiguous,
            Self::NotAvailable { .. } => ErrorKind::NotAvailable,
            Self::Provider { .. } => ErrorKind::Provider,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Services { failures } => failures
                .first()
                .map_or(ErrorKind::Provider, |f| error_kind(&f.error)),
        }
    }
}

/// Find the first `MigraError` in the context chain and return its kind.
///
/// Errors that never passed through the engine's taxonomy (I/O, decoding,
/// transport) are treated as provider errors.
#[must_use]
pub fn error_kind(err: &anyhow::Error) -> ErrorKind {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<MigraError>())
        .map_or(ErrorKind::Provider, MigraError::kind)
}

// ── Name errors ───────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum NameError {
    #[error("invalid {kind} name '{name}': {reason}")]
    Invalid {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\nExpected: {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}
