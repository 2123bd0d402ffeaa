use crate::{
    KvDocument,
    backend::{KvBackend, MemoryBackend, TikvBackend},
    collection::Collection,
    config::ConfigStore,
    counter::CounterStore,
    document::DocumentStore,
    error::Error,
    index::IndexManager,
    options::StoreOptions,
    typed::TypedCollection,
};

/// Entry point. Every handle it hands out talks to the same backend and
/// keeps no state of its own.
#[derive(Clone)]
pub struct DB<B = TikvBackend> {
    pub(crate) backend: B,
}

impl DB<TikvBackend> {
    pub async fn new(pd_endpoints: Vec<String>) -> Result<Self, Error> {
        let backend = TikvBackend::new(pd_endpoints).await?;
        Ok(Self { backend })
    }

    pub async fn connect(options: &StoreOptions) -> Result<Self, Error> {
        log::debug!("connecting to PD {:?}", options.pd_endpoints);
        Self::new(options.pd_endpoints.clone()).await
    }
}

impl DB<MemoryBackend> {
    pub fn in_memory() -> Self {
        Self::with_backend(MemoryBackend::new())
    }
}

impl<B: KvBackend> DB<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn documents(&self) -> DocumentStore<B> {
        DocumentStore::new(self.backend.clone())
    }

    pub fn index(&self) -> IndexManager<B> {
        IndexManager::new(self.backend.clone())
    }

    pub fn collection(&self, name: impl Into<String>) -> Collection<B> {
        Collection::new(name, self.backend.clone())
    }

    pub fn typed<T: KvDocument>(&self) -> TypedCollection<T, B> {
        TypedCollection::new(self.collection(T::collection()))
    }

    pub fn counters(&self) -> CounterStore<B> {
        CounterStore::new(self.backend.clone())
    }

    pub fn config(&self) -> ConfigStore<B> {
        ConfigStore::new(self.backend.clone())
    }
}
