//! Index-based enumeration of child keys and value names.
//!
//! The store signals the end of an enumeration with a status code, the same
//! way it signals genuine faults. [`Cursor::step`] keeps the two apart as
//! [`EnumStep::End`] and [`EnumStep::Fault`]; [`collect_names`] then treats
//! both as termination so callers only ever see the names gathered so far.

use regkey_store::{KeyStore, StoreError, StoreResult};
use tracing::debug;

use crate::config::RegistryConfig;

/// What a cursor enumerates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Keys,
    Values,
}

/// Outcome of one enumeration step.
#[derive(Debug)]
pub enum EnumStep {
    /// The name at the current index.
    Item(String),
    /// The index is past the last item.
    End,
    /// The store or decoding failed at the current index.
    Fault(StoreError),
}

/// Transient position within one key's children or values.
///
/// Borrowed from an open handle for the duration of a single call; never
/// persisted or reused across calls.
pub struct Cursor<'a, S: KeyStore> {
    store: &'a S,
    handle: S::Handle,
    target: Target,
    index: u32,
    buf: Vec<u16>,
    grow: Option<usize>,
    finished: bool,
}

impl<'a, S: KeyStore> Cursor<'a, S> {
    pub fn new(store: &'a S, handle: S::Handle, target: Target, config: &RegistryConfig) -> Self {
        Self {
            store,
            handle,
            target,
            index: 0,
            buf: vec![0; config.name_buffer_units],
            grow: config.grow_buffers.then_some(config.max_name_units),
            finished: false,
        }
    }

    /// Index the next step will read.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Read the item at the current index and advance past it.
    ///
    /// After the first `End` or `Fault`, every further call returns `End`.
    pub fn step(&mut self) -> EnumStep {
        if self.finished {
            return EnumStep::End;
        }
        let step = match self.fetch() {
            Ok(len) => self.decode(len),
            Err(StoreError::NoMoreItems) => EnumStep::End,
            Err(StoreError::MoreData { required }) => self.retry(required),
            Err(e) => EnumStep::Fault(e),
        };
        match step {
            EnumStep::Item(_) => self.index += 1,
            _ => self.finished = true,
        }
        step
    }

    fn fetch(&mut self) -> StoreResult<usize> {
        match self.target {
            Target::Keys => self.store.enum_key(self.handle, self.index, &mut self.buf),
            Target::Values => self.store.enum_value(self.handle, self.index, &mut self.buf),
        }
    }

    /// One retry with a buffer of the size the store asked for.
    fn retry(&mut self, required: usize) -> EnumStep {
        let fault = EnumStep::Fault(StoreError::MoreData { required });
        let Some(max) = self.grow else {
            return fault;
        };
        if required <= self.buf.len() || required > max {
            return fault;
        }
        debug!(index = self.index, required, "growing name buffer");
        self.buf.resize(required, 0);
        match self.fetch() {
            Ok(len) => self.decode(len),
            Err(StoreError::NoMoreItems) => EnumStep::End,
            Err(e) => EnumStep::Fault(e),
        }
    }

    fn decode(&self, len: usize) -> EnumStep {
        let decoded = self
            .buf
            .get(..len)
            .and_then(|units| String::from_utf16(units).ok());
        match decoded {
            Some(name) => EnumStep::Item(name),
            None => EnumStep::Fault(StoreError::Serialization(format!(
                "name at index {} is not valid UTF-16",
                self.index
            ))),
        }
    }
}

/// Drain a cursor into the names it yields, in store order.
///
/// Stops at the first step that is not an item. A fault ends the
/// enumeration early but is not an error: the names read so far are
/// returned.
pub fn collect_names<S: KeyStore>(mut cursor: Cursor<'_, S>) -> Vec<String> {
    let mut names = Vec::new();
    loop {
        match cursor.step() {
            EnumStep::Item(name) => names.push(name),
            EnumStep::End => break,
            EnumStep::Fault(error) => {
                debug!(index = cursor.index(), target = ?cursor.target, %error, "enumeration stopped");
                break;
            }
        }
    }
    names
}
