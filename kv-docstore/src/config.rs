use crate::{
    backend::KvBackend,
    collection::Updated,
    document::{Document, DocumentStore},
    error::Error,
    utils::CONFIG_PATH,
};

/// The single merged configuration document under `config:main`.
#[derive(Clone)]
pub struct ConfigStore<B> {
    documents: DocumentStore<B>,
}

impl<B: KvBackend> ConfigStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            documents: DocumentStore::new(backend),
        }
    }

    pub async fn get(&self) -> Result<Document, Error> {
        Ok(self.documents.get::<Document>(CONFIG_PATH).await?.unwrap_or_default())
    }

    /// Fields in `partial` replace stored ones; all others are kept.
    pub async fn save(&self, partial: Document) -> Result<Updated, Error> {
        let mut config = self.get().await?;
        config.extend(partial);
        self.documents.put(CONFIG_PATH, &config).await?;
        Ok(Updated { updated: 1 })
    }
}
