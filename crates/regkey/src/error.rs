//! Error types for registry operations.

use regkey_store::{Hive, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced to callers of the accessor.
///
/// Every variant is fatal for the call that produced it. Absent values on a
/// read are not errors at all: they yield an empty string.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Wrong arity, wrong argument type, or an over-long argument. Raised
    /// before any store interaction.
    #[error("{reason}")]
    InvalidArgument { reason: String },

    /// The hive name is not one of the recognized roots.
    #[error("Unable to open registry hive: {name}")]
    UnresolvedHive { name: String },

    /// The key path could not be opened or created.
    #[error("Unable to open registry key: {hive}\\{path}: {source}")]
    OpenFailed {
        hive: Hive,
        path: String,
        #[source]
        source: StoreError,
    },

    /// Writing a value failed after the key was opened.
    #[error("Unable to write registry key: {name}: {source}")]
    WriteFailed {
        name: String,
        #[source]
        source: StoreError,
    },

    /// Deleting a child key or value failed after the key was opened.
    #[error("Unable to delete registry {target}: {name}: {source}")]
    DeleteFailed {
        target: DeleteTarget,
        name: String,
        #[source]
        source: StoreError,
    },

    /// The blocking worker running the call panicked or was cancelled.
    #[error("registry worker failed: {reason}")]
    Worker { reason: String },
}

/// What a failed delete was aimed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteTarget {
    Key,
    Value,
}

impl std::fmt::Display for DeleteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeleteTarget::Key => f.write_str("key"),
            DeleteTarget::Value => f.write_str("value"),
        }
    }
}

/// Coarse classification of a [`RegistryError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    UnresolvedHive,
    OpenFailed,
    WriteFailed,
    DeleteFailed,
    Worker,
}

impl RegistryError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        RegistryError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            RegistryError::UnresolvedHive { .. } => ErrorKind::UnresolvedHive,
            RegistryError::OpenFailed { .. } => ErrorKind::OpenFailed,
            RegistryError::WriteFailed { .. } => ErrorKind::WriteFailed,
            RegistryError::DeleteFailed { .. } => ErrorKind::DeleteFailed,
            RegistryError::Worker { .. } => ErrorKind::Worker,
        }
    }

    /// Errno-style code for argument errors, as host bindings report them.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            RegistryError::InvalidArgument { .. } => Some("EINVAL"),
            _ => None,
        }
    }
}

/// Convenience type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
