use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::hive::Hive;
use crate::traits::{Access, KeyStore};

/// Native status reported when a handle refers to a key deleted after it
/// was opened.
const ERROR_KEY_DELETED: u32 = 1018;

/// Segment delimiter for key paths.
pub const PATH_DELIMITER: char = '\\';

/// Data held by a stored value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ValueData {
    String(String),
    Binary(Vec<u8>),
}

/// A named value inside a key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredValue {
    pub name: String,
    pub data: ValueData,
}

/// A key node: case-preserved name, children keyed by folded name, and
/// values in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, KeyNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<StoredValue>,
}

impl KeyNode {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Re-key every child map by folded name. A child with an empty name
    /// takes its map key as its name.
    fn normalized(self) -> Self {
        let children = self
            .children
            .into_iter()
            .map(|(key, mut child)| {
                if child.name.is_empty() {
                    child.name = key;
                }
                let child = child.normalized();
                (fold(&child.name), child)
            })
            .collect();
        Self { children, ..self }
    }

    fn value_index(&self, name: &str) -> Option<usize> {
        let folded = fold(name);
        self.values.iter().position(|v| fold(&v.name) == folded)
    }
}

/// Serializable image of every hive in an [`InMemoryKeyStore`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub hives: Vec<HiveTree>,
}

/// One hive's tree inside a [`Snapshot`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiveTree {
    pub hive: Hive,
    pub root: KeyNode,
}

/// Handle issued by [`InMemoryKeyStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemoryHandle {
    Root(Hive),
    Open(u64),
}

#[derive(Debug)]
struct OpenKey {
    hive: Hive,
    path: Vec<String>,
    access: Access,
}

#[derive(Debug)]
struct State {
    hives: HashMap<Hive, KeyNode>,
    handles: HashMap<u64, OpenKey>,
    next_handle: u64,
}

impl State {
    fn empty() -> Self {
        let hives = Hive::ALL
            .iter()
            .map(|h| (*h, KeyNode::named(h.name())))
            .collect();
        Self {
            hives,
            handles: HashMap::new(),
            next_handle: 1,
        }
    }

    /// Hive, folded path and access rights behind a handle.
    fn target(&self, handle: MemoryHandle) -> StoreResult<(Hive, Vec<String>, Access)> {
        match handle {
            MemoryHandle::Root(hive) => Ok((hive, Vec::new(), Access::All)),
            MemoryHandle::Open(id) => self
                .handles
                .get(&id)
                .map(|k| (k.hive, k.path.clone(), k.access))
                .ok_or(StoreError::InvalidHandle),
        }
    }

    fn node(&self, hive: Hive, path: &[String]) -> Option<&KeyNode> {
        let mut node = self.hives.get(&hive)?;
        for segment in path {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    fn node_mut(&mut self, hive: Hive, path: &[String]) -> Option<&mut KeyNode> {
        let mut node = self.hives.get_mut(&hive)?;
        for segment in path {
            node = node.children.get_mut(segment)?;
        }
        Some(node)
    }

    /// Resolve a handle to its node, checking `wanted` against the rights
    /// the handle was opened with.
    fn live_node(&self, handle: MemoryHandle, wanted: Access) -> StoreResult<&KeyNode> {
        let (hive, path, access) = self.target(handle)?;
        check_access(access, wanted)?;
        self.node(hive, &path).ok_or(StoreError::Os {
            code: ERROR_KEY_DELETED,
        })
    }

    fn live_node_mut(&mut self, handle: MemoryHandle, wanted: Access) -> StoreResult<&mut KeyNode> {
        let (hive, path, access) = self.target(handle)?;
        check_access(access, wanted)?;
        self.node_mut(hive, &path).ok_or(StoreError::Os {
            code: ERROR_KEY_DELETED,
        })
    }

    fn issue(&mut self, hive: Hive, path: Vec<String>, access: Access) -> MemoryHandle {
        let id = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(id, OpenKey { hive, path, access });
        MemoryHandle::Open(id)
    }
}

fn check_access(granted: Access, wanted: Access) -> StoreResult<()> {
    let ok = (!wanted.allows_read() || granted.allows_read())
        && (!wanted.allows_write() || granted.allows_write());
    if ok {
        Ok(())
    } else {
        Err(StoreError::AccessDenied)
    }
}

/// Key and value names compare case-insensitively.
fn fold(name: &str) -> String {
    name.to_lowercase()
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(PATH_DELIMITER).filter(|s| !s.is_empty())
}

/// Copy `name` into `buf` as UTF-16, leaving room for a terminator.
fn fill_name(name: &str, buf: &mut [u16]) -> StoreResult<usize> {
    let units: Vec<u16> = name.encode_utf16().collect();
    if units.len() + 1 > buf.len() {
        return Err(StoreError::MoreData {
            required: units.len() + 1,
        });
    }
    buf[..units.len()].copy_from_slice(&units);
    buf[units.len()] = 0;
    Ok(units.len())
}

/// In-memory registry with handle semantics matching the host store.
///
/// Intended for tests, embedding, and running on platforms without a system
/// registry. Trees live behind a `RwLock`; the store also counts open
/// handles and primitive calls so callers can verify that every handle is
/// released and that rejected calls never reach the store.
pub struct InMemoryKeyStore {
    state: RwLock<State>,
    calls: AtomicUsize,
}

impl InMemoryKeyStore {
    /// Create a store with five empty hives.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::empty()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Rebuild a store from a snapshot. Hives missing from the snapshot
    /// start empty. Child maps are re-keyed by folded name, so hand-written
    /// snapshots may use any key spelling.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut state = State::empty();
        for tree in snapshot.hives {
            state.hives.insert(tree.hive, tree.root.normalized());
        }
        Self {
            state: RwLock::new(state),
            calls: AtomicUsize::new(0),
        }
    }

    /// Load a JSON snapshot file. A missing file yields an empty store.
    pub fn load(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "snapshot missing; starting empty");
            return Ok(Self::new());
        }
        let bytes = fs::read(path)?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        debug!(path = %path.display(), hives = snapshot.hives.len(), "snapshot loaded");
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the current contents to `path` as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(&self.snapshot())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, json)?;
        debug!(path = %path.display(), "snapshot saved");
        Ok(())
    }

    /// Copy of every hive's tree, in canonical hive order.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.read();
        let hives = Hive::ALL
            .iter()
            .filter_map(|h| {
                state.hives.get(h).map(|root| HiveTree {
                    hive: *h,
                    root: root.clone(),
                })
            })
            .collect();
        Snapshot { hives }
    }

    /// Store a non-string value, creating the key path if needed.
    pub fn insert_binary(&self, hive: Hive, path: &str, name: &str, data: Vec<u8>) {
        let mut state = self.write();
        let Some(mut node) = state.hives.get_mut(&hive) else {
            return;
        };
        for segment in segments(path) {
            node = node
                .children
                .entry(fold(segment))
                .or_insert_with(|| KeyNode::named(segment));
        }
        let value = StoredValue {
            name: name.to_string(),
            data: ValueData::Binary(data),
        };
        match node.value_index(name) {
            Some(i) => node.values[i] = value,
            None => node.values.push(value),
        }
    }

    /// Whether the key at `path` exists, without touching the call counter.
    pub fn key_exists(&self, hive: Hive, path: &str) -> bool {
        let folded: Vec<String> = segments(path).map(fold).collect();
        self.read().node(hive, &folded).is_some()
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.read().handles.len()
    }

    /// Number of store primitives invoked since creation.
    pub fn primitive_calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for InMemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore for InMemoryKeyStore {
    type Handle = MemoryHandle;

    fn root(&self, hive: Hive) -> MemoryHandle {
        self.touch();
        MemoryHandle::Root(hive)
    }

    fn open_key(&self, parent: MemoryHandle, path: &str, access: Access) -> StoreResult<MemoryHandle> {
        self.touch();
        let mut state = self.write();
        let (hive, mut full, _) = state.target(parent)?;
        full.extend(segments(path).map(fold));
        if state.node(hive, &full).is_none() {
            return Err(StoreError::NotFound);
        }
        Ok(state.issue(hive, full, access))
    }

    fn create_key(&self, parent: MemoryHandle, path: &str, access: Access) -> StoreResult<MemoryHandle> {
        self.touch();
        let mut state = self.write();
        let (hive, base, _) = state.target(parent)?;
        let mut node = state.node_mut(hive, &base).ok_or(StoreError::Os {
            code: ERROR_KEY_DELETED,
        })?;
        let mut full = base;
        for segment in segments(path) {
            let key = fold(segment);
            node = node
                .children
                .entry(key.clone())
                .or_insert_with(|| KeyNode::named(segment));
            full.push(key);
        }
        Ok(state.issue(hive, full, access))
    }

    fn close_key(&self, handle: MemoryHandle) -> StoreResult<()> {
        self.touch();
        match handle {
            MemoryHandle::Root(_) => Err(StoreError::InvalidHandle),
            MemoryHandle::Open(id) => self
                .write()
                .handles
                .remove(&id)
                .map(|_| ())
                .ok_or(StoreError::InvalidHandle),
        }
    }

    fn enum_key(&self, handle: MemoryHandle, index: u32, buf: &mut [u16]) -> StoreResult<usize> {
        self.touch();
        let state = self.read();
        let node = state.live_node(handle, Access::Read)?;
        let child = node
            .children
            .values()
            .nth(index as usize)
            .ok_or(StoreError::NoMoreItems)?;
        fill_name(&child.name, buf)
    }

    fn enum_value(&self, handle: MemoryHandle, index: u32, buf: &mut [u16]) -> StoreResult<usize> {
        self.touch();
        let state = self.read();
        let node = state.live_node(handle, Access::Read)?;
        let value = node
            .values
            .get(index as usize)
            .ok_or(StoreError::NoMoreItems)?;
        fill_name(&value.name, buf)
    }

    fn query_string(&self, handle: MemoryHandle, name: &str, buf: &mut [u8]) -> StoreResult<usize> {
        self.touch();
        let state = self.read();
        let node = state.live_node(handle, Access::Read)?;
        let index = node.value_index(name).ok_or(StoreError::NotFound)?;
        let ValueData::String(text) = &node.values[index].data else {
            return Err(StoreError::TypeMismatch);
        };
        let bytes: Vec<u8> = text
            .encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(u16::to_le_bytes)
            .collect();
        if bytes.len() > buf.len() {
            return Err(StoreError::MoreData {
                required: bytes.len(),
            });
        }
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    fn set_string(&self, handle: MemoryHandle, name: &str, value: &str) -> StoreResult<()> {
        self.touch();
        let mut state = self.write();
        let node = state.live_node_mut(handle, Access::Write)?;
        let stored = StoredValue {
            name: name.to_string(),
            data: ValueData::String(value.to_string()),
        };
        match node.value_index(name) {
            Some(i) => node.values[i] = stored,
            None => node.values.push(stored),
        }
        Ok(())
    }

    fn delete_key(&self, handle: MemoryHandle, name: &str) -> StoreResult<()> {
        self.touch();
        let mut state = self.write();
        let node = state.live_node_mut(handle, Access::Write)?;
        let key = fold(name);
        let child = node.children.get(&key).ok_or(StoreError::NotFound)?;
        if !child.children.is_empty() {
            return Err(StoreError::NotEmpty);
        }
        node.children.remove(&key);
        Ok(())
    }

    fn delete_value(&self, handle: MemoryHandle, name: &str) -> StoreResult<()> {
        self.touch();
        let mut state = self.write();
        let node = state.live_node_mut(handle, Access::Write)?;
        let index = node.value_index(name).ok_or(StoreError::NotFound)?;
        node.values.remove(index);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKeyStore")
            .field("open_handles", &self.open_handles())
            .field("primitive_calls", &self.primitive_calls())
            .finish()
    }
}
