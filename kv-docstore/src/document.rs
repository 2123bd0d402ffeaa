use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{backend::KvBackend, error::Error};

/// A stored record: a JSON object carrying an `_id` string.
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

pub fn into_document(value: Value) -> Result<Document, Error> {
    match value {
        Value::Object(document) => Ok(document),
        other => Err(Error::InvalidDocument(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// Single-key JSON get/put/delete. One backend round trip per call.
#[derive(Clone)]
pub struct DocumentStore<B> {
    pub(crate) backend: B,
}

impl<B: KvBackend> DocumentStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        log::debug!("get {}", key);
        let Some(data) = self.backend.get(key).await? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&data).map_err(Error::DeserializationError)?;
        Ok(Some(value))
    }

    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), Error> {
        log::debug!("put {}", key);
        let data = serde_json::to_string(value).map_err(Error::SerializationError)?;
        self.backend.put(key, data).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), Error> {
        log::debug!("delete {}", key);
        self.backend.delete(key).await
    }
}
