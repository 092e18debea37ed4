//! Key store backends for regkey.
//!
//! A key store is the external, hierarchical key/value database that the
//! `regkey` accessor drives: root hives, nested keys, and named string
//! values, reached through explicitly opened and released handles.
//!
//! # Backends
//!
//! All backends implement the [`KeyStore`] trait:
//!
//! - [`InMemoryKeyStore`] -- `RwLock`-guarded tree for tests, embedding, and
//!   JSON snapshot files
//! - `NativeKeyStore` -- the system registry (Windows only)
//!
//! # Rules
//!
//! 1. Root handles are pre-existing and never closed.
//! 2. Every opened or created handle is closed exactly once.
//! 3. Buffer-filling primitives report the size they need rather than
//!    truncating.
//! 4. Key and value names are case-insensitive and case-preserving.

pub mod error;
pub mod hive;
pub mod memory;
#[cfg(windows)]
pub mod native;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use hive::{Hive, UnknownHive};
pub use memory::{
    HiveTree, InMemoryKeyStore, KeyNode, MemoryHandle, Snapshot, StoredValue, ValueData,
    PATH_DELIMITER,
};
#[cfg(windows)]
pub use native::{NativeHandle, NativeKeyStore};
pub use traits::{Access, KeyStore};
