use crate::{backend::KvBackend, error::Error, utils::index_path};

/// Per-collection id list stored as one JSON array under `index:{collection}`.
///
/// `add` and `remove` are read-modify-write without any guard: two writers
/// racing on the same collection can lose one another's update.
#[derive(Clone)]
pub struct IndexManager<B> {
    backend: B,
}

impl<B: KvBackend> IndexManager<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Ids in insertion order. Absent or unparsable index reads as empty.
    pub async fn list(&self, collection: &str) -> Result<Vec<String>, Error> {
        let key = index_path(collection);
        let Some(data) = self.backend.get(&key).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<String>>(&data) {
            Ok(ids) => Ok(ids),
            Err(e) => {
                log::warn!("unparsable index {}, treating as empty: {}", key, e);
                Ok(Vec::new())
            }
        }
    }

    pub async fn add(&self, collection: &str, id: &str) -> Result<(), Error> {
        let mut ids = self.list(collection).await?;
        if ids.iter().any(|i| i == id) {
            return Ok(());
        }
        ids.push(id.to_string());
        log::debug!("index {} add {} ({} ids)", collection, id, ids.len());
        self.store(collection, &ids).await
    }

    pub async fn remove(&self, collection: &str, id: &str) -> Result<(), Error> {
        let mut ids = self.list(collection).await?;
        ids.retain(|i| i != id);
        log::debug!("index {} remove {} ({} ids)", collection, id, ids.len());
        self.store(collection, &ids).await
    }

    async fn store(&self, collection: &str, ids: &[String]) -> Result<(), Error> {
        let data = serde_json::to_string(ids).map_err(Error::SerializationError)?;
        self.backend.put(&index_path(collection), data).await
    }
}
