//! Hive resolution.

pub use regkey_store::Hive;

use crate::error::{RegistryError, Result};

/// Resolve `name` to a hive, or fail the whole call with
/// [`RegistryError::UnresolvedHive`].
pub fn resolve(name: &str) -> Result<Hive> {
    Hive::resolve(name).ok_or_else(|| RegistryError::UnresolvedHive {
        name: name.to_string(),
    })
}
