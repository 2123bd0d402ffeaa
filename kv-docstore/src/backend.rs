use std::{
    collections::{BTreeMap, HashSet},
    future::Future,
    sync::{Arc, RwLock},
};

use tikv_client::RawClient;

use crate::error::Error;

/// The three primitives every document operation is built from.
///
/// Implementations must treat `put` as an unconditional overwrite and
/// `delete` of a missing key as success.
pub trait KvBackend: Clone + Send + Sync + 'static {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, Error>> + Send;

    fn put(&self, key: &str, value: String) -> impl Future<Output = Result<(), Error>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = Result<(), Error>> + Send;
}

/// TiKV raw client backend.
#[derive(Clone)]
pub struct TikvBackend {
    client: RawClient,
}

impl TikvBackend {
    pub async fn new(pd_endpoints: Vec<String>) -> Result<Self, Error> {
        if pd_endpoints.is_empty() {
            return Err(Error::NotConfigured("no PD endpoints given".to_string()));
        }
        let client = RawClient::new(pd_endpoints)
            .await
            .map_err(Error::TikvError)?;
        Ok(Self { client })
    }
}

impl KvBackend for TikvBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let Some(data) = self
            .client
            .get(key.to_owned())
            .await
            .map_err(Error::TikvError)?
        else {
            return Ok(None);
        };
        Ok(Some(String::from_utf8(data).map_err(Error::InvalidUtf8)?))
    }

    async fn put(&self, key: &str, value: String) -> Result<(), Error> {
        self.client
            .put(key.to_owned(), value.into_bytes())
            .await
            .map_err(Error::TikvError)
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.client
            .delete(key.to_owned())
            .await
            .map_err(Error::TikvError)
    }
}

#[derive(Default)]
struct MemoryState {
    entries: BTreeMap<String, String>,
    failing_gets: HashSet<String>,
    failing_puts: HashSet<String>,
    failing_deletes: HashSet<String>,
}

/// In-process backend. Clones share the same namespace.
///
/// Calls on keys registered with [`MemoryBackend::fail_gets_to`],
/// [`MemoryBackend::fail_puts_to`] or [`MemoryBackend::fail_deletes_to`] are
/// rejected with [`Error::Backend`], which lets callers observe partial
/// progress of multi-step operations.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_gets_to(&self, key: impl Into<String>) -> Result<(), Error> {
        self.write_state()?.failing_gets.insert(key.into());
        Ok(())
    }

    pub fn fail_puts_to(&self, key: impl Into<String>) -> Result<(), Error> {
        self.write_state()?.failing_puts.insert(key.into());
        Ok(())
    }

    pub fn fail_deletes_to(&self, key: impl Into<String>) -> Result<(), Error> {
        self.write_state()?.failing_deletes.insert(key.into());
        Ok(())
    }

    pub fn clear_failures(&self) -> Result<(), Error> {
        let mut state = self.write_state()?;
        state.failing_gets.clear();
        state.failing_puts.clear();
        state.failing_deletes.clear();
        Ok(())
    }

    /// Copy of every stored entry, ordered by key.
    pub fn snapshot(&self) -> Result<BTreeMap<String, String>, Error> {
        Ok(self.read_state()?.entries.clone())
    }

    pub fn len(&self) -> Result<usize, Error> {
        Ok(self.read_state()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len()? == 0)
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryState>, Error> {
        self.state
            .read()
            .map_err(|_| Error::Backend("memory backend lock poisoned".to_string()))
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemoryState>, Error> {
        self.state
            .write()
            .map_err(|_| Error::Backend("memory backend lock poisoned".to_string()))
    }
}

impl KvBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let state = self.read_state()?;
        if state.failing_gets.contains(key) {
            return Err(Error::Backend(format!("injected read failure for {key}")));
        }
        Ok(state.entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), Error> {
        let mut state = self.write_state()?;
        if state.failing_puts.contains(key) {
            return Err(Error::Backend(format!("injected write failure for {key}")));
        }
        state.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let mut state = self.write_state()?;
        if state.failing_deletes.contains(key) {
            return Err(Error::Backend(format!("injected delete failure for {key}")));
        }
        state.entries.remove(key);
        Ok(())
    }
}
