//! The key/value accessor.
//!
//! Every operation follows the same skeleton:
//!
//! 1. Check the length of every string argument.
//! 2. Resolve the hive name; an unknown hive aborts before the store is touched.
//! 3. Open the key at `path` below the hive root. An empty path uses the root
//!    itself. Reads require the path to exist; writes and deletes create any
//!    missing keys along the way, and those keys persist even if the
//!    operation itself then fails.
//! 4. Run the operation against the open handle.
//! 5. Release the handle on every exit path (never the root).

use regkey_store::{Access, Hive, KeyStore, StoreError};
use tracing::{debug, debug_span, warn};

use crate::config::RegistryConfig;
use crate::cursor::{collect_names, Cursor, Target};
use crate::error::{DeleteTarget, RegistryError, Result};
use crate::hive;
use crate::validate::check_args;

/// How a path is opened.
#[derive(Clone, Copy, Debug)]
enum Open {
    /// The path must already exist.
    Existing(Access),
    /// Missing keys along the path are created.
    Create(Access),
}

/// An open key, released when dropped unless it is a hive root.
struct OpenKey<'a, S: KeyStore> {
    store: &'a S,
    handle: S::Handle,
    owned: bool,
}

impl<S: KeyStore> Drop for OpenKey<'_, S> {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        if let Err(error) = self.store.close_key(self.handle) {
            warn!(handle = ?self.handle, %error, "failed to release registry key");
        }
    }
}

/// Hive-rooted access to a [`KeyStore`].
///
/// Holds no per-call state: each operation opens its own handle and
/// releases it before returning.
pub struct Registry<S: KeyStore> {
    store: S,
    config: RegistryConfig,
}

impl<S: KeyStore> Registry<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, RegistryConfig::default())
    }

    pub fn with_config(store: S, config: RegistryConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Names of the child keys of `path`, in store order.
    ///
    /// An enumeration fault ends the list early rather than failing the call.
    pub fn enumerate_keys(&self, hive: &str, path: &str) -> Result<Vec<String>> {
        let _span = debug_span!("enumerate_keys", hive, path).entered();
        let hive = self.prepare(&[hive, path])?;
        let key = self.open(hive, path, Open::Existing(Access::Read))?;
        let cursor = Cursor::new(&self.store, key.handle, Target::Keys, &self.config);
        Ok(collect_names(cursor))
    }

    /// Names of the values stored in `path`, in store order.
    pub fn enumerate_values(&self, hive: &str, path: &str) -> Result<Vec<String>> {
        let _span = debug_span!("enumerate_values", hive, path).entered();
        let hive = self.prepare(&[hive, path])?;
        let key = self.open(hive, path, Open::Existing(Access::Read))?;
        let cursor = Cursor::new(&self.store, key.handle, Target::Values, &self.config);
        Ok(collect_names(cursor))
    }

    /// The string value `name` in `path`.
    ///
    /// A missing, non-string, or unreadable value reads as the empty string;
    /// only a path that cannot be opened is an error.
    pub fn get_string(&self, hive: &str, path: &str, name: &str) -> Result<String> {
        let _span = debug_span!("get_string", hive, path, name).entered();
        let hive = self.prepare(&[hive, path, name])?;
        let key = self.open(hive, path, Open::Existing(Access::Read))?;
        Ok(self.read_string(key.handle, name))
    }

    /// Store `value` under `name` in `path`, creating the path if needed.
    pub fn set_string(&self, hive: &str, path: &str, name: &str, value: &str) -> Result<()> {
        let _span = debug_span!("set_string", hive, path, name).entered();
        let hive = self.prepare(&[hive, path, name, value])?;
        let key = self.open(hive, path, Open::Create(Access::Write))?;
        self.store
            .set_string(key.handle, name, value)
            .map_err(|source| RegistryError::WriteFailed {
                name: name.to_string(),
                source,
            })
    }

    /// Delete the child key `name` of `path`. The child must have no
    /// children of its own.
    pub fn delete_key(&self, hive: &str, path: &str, name: &str) -> Result<()> {
        let _span = debug_span!("delete_key", hive, path, name).entered();
        let hive = self.prepare(&[hive, path, name])?;
        let key = self.open(hive, path, Open::Create(Access::All))?;
        self.store
            .delete_key(key.handle, name)
            .map_err(|source| RegistryError::DeleteFailed {
                target: DeleteTarget::Key,
                name: name.to_string(),
                source,
            })
    }

    /// Delete the value `name` from `path`.
    pub fn delete_value(&self, hive: &str, path: &str, name: &str) -> Result<()> {
        let _span = debug_span!("delete_value", hive, path, name).entered();
        let hive = self.prepare(&[hive, path, name])?;
        let key = self.open(hive, path, Open::Create(Access::Write))?;
        self.store
            .delete_value(key.handle, name)
            .map_err(|source| RegistryError::DeleteFailed {
                target: DeleteTarget::Value,
                name: name.to_string(),
                source,
            })
    }

    /// Length checks, then hive resolution.
    fn prepare(&self, args: &[&str]) -> Result<Hive> {
        check_args(args, self.config.max_arg_len)?;
        hive::resolve(args[0])
    }

    fn open(&self, hive: Hive, path: &str, mode: Open) -> Result<OpenKey<'_, S>> {
        let root = self.store.root(hive);
        if path.is_empty() {
            return Ok(OpenKey {
                store: &self.store,
                handle: root,
                owned: false,
            });
        }
        let opened = match mode {
            Open::Existing(access) => self.store.open_key(root, path, access),
            Open::Create(access) => self.store.create_key(root, path, access),
        };
        match opened {
            Ok(handle) => {
                debug!(%hive, path, ?mode, "opened registry key");
                Ok(OpenKey {
                    store: &self.store,
                    handle,
                    owned: true,
                })
            }
            Err(source) => {
                debug!(%hive, path, ?mode, error = %source, "registry key open failed");
                Err(RegistryError::OpenFailed {
                    hive,
                    path: path.to_string(),
                    source,
                })
            }
        }
    }

    fn read_string(&self, handle: S::Handle, name: &str) -> String {
        let mut buf = vec![0u8; self.config.value_buffer_bytes];
        let len = match self.store.query_string(handle, name, &mut buf) {
            Ok(len) => len,
            Err(StoreError::MoreData { required })
                if self.config.grow_buffers
                    && required > buf.len()
                    && required <= self.config.max_value_bytes =>
            {
                debug!(name, required, "growing value buffer");
                buf.resize(required, 0);
                match self.store.query_string(handle, name, &mut buf) {
                    Ok(len) => len,
                    Err(error) => {
                        debug!(name, %error, "value read failed after retry");
                        return String::new();
                    }
                }
            }
            Err(error) => {
                debug!(name, %error, "value unreadable; returning empty string");
                return String::new();
            }
        };
        decode_utf16le(&buf[..len.min(buf.len())])
    }
}

/// Decode UTF-16LE bytes up to the first null.
fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|unit| *unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

impl<S: KeyStore + std::fmt::Debug> std::fmt::Debug for Registry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish()
    }
}
