//! Async front end that runs each call on tokio's blocking pool.
//!
//! Store primitives block. [`AsyncRegistry`] moves each call, with its
//! arguments passed by value, onto a blocking worker and awaits the result,
//! so an event loop is never stalled and each call still owns at most one
//! open handle.

use std::sync::Arc;

use regkey_store::KeyStore;

use crate::error::{RegistryError, Result};
use crate::registry::Registry;

pub struct AsyncRegistry<S: KeyStore + 'static> {
    inner: Arc<Registry<S>>,
}

impl<S: KeyStore + 'static> Clone for AsyncRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: KeyStore + 'static> AsyncRegistry<S> {
    pub fn new(registry: Registry<S>) -> Self {
        Self {
            inner: Arc::new(registry),
        }
    }

    /// The wrapped synchronous registry.
    pub fn blocking(&self) -> &Registry<S> {
        &self.inner
    }

    async fn run<T, F>(&self, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Registry<S>) -> Result<T> + Send + 'static,
    {
        let registry = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || call(&registry))
            .await
            .map_err(|e| RegistryError::Worker {
                reason: e.to_string(),
            })?
    }

    pub async fn enumerate_keys(&self, hive: String, path: String) -> Result<Vec<String>> {
        self.run(move |r| r.enumerate_keys(&hive, &path)).await
    }

    pub async fn enumerate_values(&self, hive: String, path: String) -> Result<Vec<String>> {
        self.run(move |r| r.enumerate_values(&hive, &path)).await
    }

    pub async fn get_string(&self, hive: String, path: String, name: String) -> Result<String> {
        self.run(move |r| r.get_string(&hive, &path, &name)).await
    }

    pub async fn set_string(
        &self,
        hive: String,
        path: String,
        name: String,
        value: String,
    ) -> Result<()> {
        self.run(move |r| r.set_string(&hive, &path, &name, &value))
            .await
    }

    pub async fn delete_key(&self, hive: String, path: String, name: String) -> Result<()> {
        self.run(move |r| r.delete_key(&hive, &path, &name)).await
    }

    pub async fn delete_value(&self, hive: String, path: String, name: String) -> Result<()> {
        self.run(move |r| r.delete_value(&hive, &path, &name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use regkey_store::InMemoryKeyStore;

    const CU: &str = "HKEY_CURRENT_USER";

    fn registry() -> AsyncRegistry<InMemoryKeyStore> {
        AsyncRegistry::new(Registry::new(InMemoryKeyStore::new()))
    }

    #[tokio::test]
    async fn round_trip_on_worker() {
        let reg = registry();
        reg.set_string(CU.into(), "Software\\App".into(), "Token".into(), "abc123".into())
            .await
            .unwrap();
        let value = reg
            .get_string(CU.into(), "Software\\App".into(), "Token".into())
            .await
            .unwrap();
        assert_eq!(value, "abc123");
        assert_eq!(
            reg.enumerate_keys(CU.into(), "Software".into()).await.unwrap(),
            ["App"]
        );
        assert_eq!(reg.blocking().store().open_handles(), 0);
    }

    #[tokio::test]
    async fn errors_cross_the_worker_boundary() {
        let reg = registry();
        let err = reg
            .enumerate_values("HKEY_NOPE".into(), String::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvedHive);
    }

    #[tokio::test]
    async fn concurrent_calls_each_release_their_handle() {
        let reg = registry();
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let reg = reg.clone();
                tokio::spawn(async move {
                    reg.set_string(CU.into(), format!("K\\{i}"), "v".into(), i.to_string())
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        let mut keys = reg.enumerate_keys(CU.into(), "K".into()).await.unwrap();
        keys.sort();
        assert_eq!(keys.len(), 8);
        reg.delete_key(CU.into(), "K".into(), "0".into()).await.unwrap();
        reg.delete_value(CU.into(), "K\\1".into(), "v".into()).await.unwrap();
        assert_eq!(reg.blocking().store().open_handles(), 0);
    }
}
