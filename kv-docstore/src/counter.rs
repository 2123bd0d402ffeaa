use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{
    backend::KvBackend,
    document::DocumentStore,
    error::Error,
    utils::{counter_path, now_millis},
};

/// Page-view record stored under `counter:{encoded url}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Hit count.
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated: i64,
    /// Fields written by other clients, carried through increments.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Clone)]
pub struct CounterStore<B> {
    documents: DocumentStore<B>,
}

impl<B: KvBackend> CounterStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            documents: DocumentStore::new(backend),
        }
    }

    pub async fn get(&self, url: &str) -> Result<Option<Counter>, Error> {
        self.documents.get(&counter_path(url)).await
    }

    /// Bumps the hit count and replaces the title. Two concurrent increments
    /// of the same url can count once.
    pub async fn increment(&self, url: &str, title: Option<String>) -> Result<Counter, Error> {
        let now = now_millis();
        let counter = match self.get(url).await? {
            Some(mut counter) => {
                counter.time += 1;
                counter.title = title;
                counter.updated = now;
                counter
            }
            None => Counter {
                url: url.to_string(),
                title,
                time: 1,
                created: now,
                updated: now,
                extra: Map::new(),
            },
        };
        self.documents.put(&counter_path(url), &counter).await?;
        log::debug!("counter {} at {}", url, counter.time);
        Ok(counter)
    }
}
