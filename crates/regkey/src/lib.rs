//! Hive-rooted access to a hierarchical key/value store.
//!
//! This crate resolves a `(hive, path[, name[, value]])` call to an open key
//! on a [`KeyStore`] and performs one of six operations on it: enumerate
//! child keys, enumerate value names, read a string value, write a string
//! value, delete a child key, or delete a value.
//!
//! # Architecture
//!
//! - **Hive resolution** maps one of five canonical root names to a root
//!   handle. Anything else fails the call before the store is touched.
//! - **The accessor** ([`Registry`]) opens the path (read intent requires it
//!   to exist; write intent creates it), runs the operation, and releases
//!   the handle on every exit path.
//! - **Enumeration** walks an index cursor with a fixed-capacity name buffer,
//!   keeping "no more items" apart from faults internally while returning
//!   whatever was gathered.
//! - **Reads** of absent values yield the empty string, not an error.
//!
//! # Modules
//!
//! - [`error`] — [`RegistryError`] and its [`ErrorKind`]
//! - [`hive`] — hive resolution
//! - [`validate`] — argument length checks
//! - [`config`] — [`RegistryConfig`] limits and buffer sizes
//! - [`cursor`] — tagged enumeration steps
//! - [`registry`] — the [`Registry`] accessor
//! - [`request`] — dynamically typed dispatch and JSON envelopes
//! - [`worker`] — [`AsyncRegistry`] on tokio's blocking pool

pub mod config;
pub mod cursor;
pub mod error;
pub mod hive;
pub mod registry;
pub mod request;
pub mod validate;
pub mod worker;

pub use config::{ConfigError, RegistryConfig};
pub use cursor::{EnumStep, Target};
pub use error::{DeleteTarget, ErrorKind, RegistryError, Result};
pub use hive::Hive;
pub use registry::Registry;
pub use request::{dispatch, Operation, Reply, Request, Response};
pub use worker::AsyncRegistry;

pub use regkey_store::{Access, InMemoryKeyStore, KeyStore, StoreError};
#[cfg(windows)]
pub use regkey_store::NativeKeyStore;
