use std::fmt::Debug;

use crate::error::StoreResult;
use crate::hive::Hive;

/// Access intent requested when opening a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// Query values and enumerate children.
    Read,
    /// Set and delete values, create children.
    Write,
    /// Read and write, plus deletion of child keys.
    All,
}

impl Access {
    /// Whether this intent permits mutation.
    pub fn allows_write(self) -> bool {
        matches!(self, Access::Write | Access::All)
    }

    /// Whether this intent permits queries and enumeration.
    pub fn allows_read(self) -> bool {
        matches!(self, Access::Read | Access::All)
    }
}

/// Handle-based hierarchical key/value store.
///
/// The primitives mirror the host registry API: handles are opened relative
/// to a parent, released explicitly, and enumeration and queries write into
/// caller-supplied buffers. All implementations must satisfy these rules:
/// - A root handle from [`root`](KeyStore::root) is never passed to
///   [`close_key`](KeyStore::close_key).
/// - Every handle returned by `open_key` or `create_key` is closed exactly once.
/// - Buffer-filling calls report [`MoreData`](crate::StoreError::MoreData)
///   with the required size instead of truncating.
/// - Enumeration past the last item reports
///   [`NoMoreItems`](crate::StoreError::NoMoreItems).
pub trait KeyStore: Send + Sync {
    /// Opaque handle to an open key.
    type Handle: Copy + Debug + Send;

    /// The pre-existing root handle for `hive`.
    fn root(&self, hive: Hive) -> Self::Handle;

    /// Open an existing key below `parent`. Every segment of `path` must exist.
    fn open_key(&self, parent: Self::Handle, path: &str, access: Access)
        -> StoreResult<Self::Handle>;

    /// Open a key below `parent`, creating any missing segments. Created keys
    /// are persistent.
    fn create_key(
        &self,
        parent: Self::Handle,
        path: &str,
        access: Access,
    ) -> StoreResult<Self::Handle>;

    /// Release a handle obtained from `open_key` or `create_key`.
    fn close_key(&self, handle: Self::Handle) -> StoreResult<()>;

    /// Write the name of the child key at `index` into `buf` as UTF-16 code
    /// units and return its length, excluding the terminating null that
    /// `buf` must also have room for.
    fn enum_key(&self, handle: Self::Handle, index: u32, buf: &mut [u16]) -> StoreResult<usize>;

    /// Same as [`enum_key`](KeyStore::enum_key), for value names.
    fn enum_value(&self, handle: Self::Handle, index: u32, buf: &mut [u16])
        -> StoreResult<usize>;

    /// Copy the string value `name` into `buf` as UTF-16LE bytes including
    /// the terminating null, and return the number of bytes written.
    fn query_string(&self, handle: Self::Handle, name: &str, buf: &mut [u8])
        -> StoreResult<usize>;

    /// Store `value` as a string under `name`, replacing any existing value.
    fn set_string(&self, handle: Self::Handle, name: &str, value: &str) -> StoreResult<()>;

    /// Delete the immediate child key `name`. Fails with
    /// [`NotEmpty`](crate::StoreError::NotEmpty) if it has children.
    fn delete_key(&self, handle: Self::Handle, name: &str) -> StoreResult<()>;

    /// Delete the value `name`.
    fn delete_value(&self, handle: Self::Handle, name: &str) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_intents() {
        assert!(Access::Read.allows_read());
        assert!(!Access::Read.allows_write());
        assert!(Access::Write.allows_write());
        assert!(!Access::Write.allows_read());
        assert!(Access::All.allows_read() && Access::All.allows_write());
    }
}
