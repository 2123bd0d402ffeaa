use std::pin::Pin;

use async_stream::try_stream;
use futures::{Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    backend::KvBackend,
    document::{Document, DocumentStore, ID_FIELD},
    error::Error,
    filter::Query,
    index::IndexManager,
    utils::{document_path, generate_id},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inserted {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Updated {
    pub updated: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: u8,
}

/// Documents of one collection: `{name}:{id}` keys plus the `index:{name}` id list.
///
/// Inserts write the document before the index. If the second write never
/// happens the document stays unreachable from queries until it is re-added.
#[derive(Clone)]
pub struct Collection<B> {
    pub(crate) name: String,
    pub(crate) documents: DocumentStore<B>,
    pub(crate) index: IndexManager<B>,
}

impl<B: KvBackend> Collection<B> {
    pub fn new(name: impl Into<String>, backend: B) -> Self {
        Self {
            name: name.into(),
            documents: DocumentStore::new(backend.clone()),
            index: IndexManager::new(backend),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn add_one(&self, mut document: Document) -> Result<Inserted, Error> {
        let id = match document.get(ID_FIELD) {
            None | Some(Value::Null) => generate_id(),
            Some(Value::String(id)) if id.is_empty() => generate_id(),
            Some(Value::String(id)) => id.clone(),
            Some(other) => {
                return Err(Error::InvalidDocument(format!(
                    "{} must be a string, got {}",
                    ID_FIELD, other
                )));
            }
        };
        document.insert(ID_FIELD.to_string(), Value::String(id.clone()));

        self.documents
            .put(&document_path(&self.name, &id), &document)
            .await?;
        self.index.add(&self.name, &id).await?;

        log::debug!("{}: added {}", self.name, id);
        Ok(Inserted { id })
    }

    /// Inserts one at a time in input order. Stops at the first failure; the
    /// documents before it stay committed.
    pub async fn bulk_add(
        &self,
        documents: impl IntoIterator<Item = Document>,
    ) -> Result<usize, Error> {
        self.try_bulk_add(documents.into_iter().map(Ok)).await
    }

    /// Like [`Collection::bulk_add`], for entries that are converted lazily.
    /// An `Err` entry stops the batch at its position, after the entries
    /// before it have been written.
    pub async fn try_bulk_add(
        &self,
        documents: impl IntoIterator<Item = Result<Document, Error>>,
    ) -> Result<usize, Error> {
        let mut inserted = 0;
        for document in documents {
            self.add_one(document?).await?;
            inserted += 1;
        }
        log::debug!("{}: bulk added {}", self.name, inserted);
        Ok(inserted)
    }

    /// Shallow merge of `updates` into the stored document.
    pub async fn update_one(&self, id: &str, updates: Document) -> Result<Updated, Error> {
        let key = document_path(&self.name, id);
        let Some(mut document) = self.documents.get::<Document>(&key).await? else {
            return Ok(Updated { updated: 0 });
        };
        document.extend(updates);
        self.documents.put(&key, &document).await?;
        Ok(Updated { updated: 1 })
    }

    /// Always reports one deletion; no existence check is made.
    pub async fn delete_one(&self, id: &str) -> Result<Deleted, Error> {
        self.documents
            .delete(&document_path(&self.name, id))
            .await?;
        self.index.remove(&self.name, id).await?;
        Ok(Deleted { deleted: 1 })
    }

    pub async fn get_one(&self, id: &str) -> Result<Option<Document>, Error> {
        self.documents.get(&document_path(&self.name, id)).await
    }

    /// Reads the index and every indexed document (N + 1 backend reads),
    /// then filters in memory.
    pub async fn get_all(&self, query: &Query) -> Result<Vec<Document>, Error> {
        self.stream(query.clone()).try_collect().await
    }

    pub async fn count(&self, query: &Query) -> Result<usize, Error> {
        Ok(self.get_all(query).await?.len())
    }

    pub async fn ids(&self) -> Result<Vec<String>, Error> {
        self.index.list(&self.name).await
    }

    /// Lazily fetches indexed documents and yields the ones matching `query`.
    /// Ids whose document is gone are skipped.
    pub fn stream(
        &self,
        query: Query,
    ) -> Pin<Box<dyn Stream<Item = Result<Document, Error>> + Send>> {
        let collection = self.clone();

        Box::pin(try_stream! {
            let ids = collection.index.list(&collection.name).await?;
            for id in ids {
                let key = document_path(&collection.name, &id);
                let Some(document) = collection.documents.get::<Document>(&key).await? else {
                    log::warn!("{}: indexed id {} has no document", collection.name, id);
                    continue;
                };
                if query.matches(&document) {
                    yield document;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde_json::json;

    use super::*;
    use crate::{backend::MemoryBackend, document::into_document};

    fn doc(value: Value) -> Document {
        into_document(value).unwrap()
    }

    fn comments() -> (MemoryBackend, Collection<MemoryBackend>) {
        let backend = MemoryBackend::new();
        (backend.clone(), Collection::new("comment", backend))
    }

    #[tokio::test]
    async fn add_then_get() {
        let (_, comments) = comments();
        let inserted = comments
            .add_one(doc(json!({"_id": "c1", "nick": "a"})))
            .await
            .unwrap();
        assert_eq!(inserted.id, "c1");
        assert_eq!(
            comments.get_one("c1").await.unwrap(),
            Some(doc(json!({"_id": "c1", "nick": "a"})))
        );
        assert_eq!(comments.ids().await.unwrap(), vec!["c1"]);
    }

    #[tokio::test]
    async fn add_assigns_missing_id() {
        let (_, comments) = comments();
        let inserted = comments.add_one(doc(json!({"nick": "a"}))).await.unwrap();
        assert_eq!(inserted.id.len(), 32);

        let stored = comments.get_one(&inserted.id).await.unwrap().unwrap();
        assert_eq!(stored[ID_FIELD], json!(inserted.id));

        let empty = comments.add_one(doc(json!({"_id": ""}))).await.unwrap();
        assert_eq!(empty.id.len(), 32);
    }

    #[tokio::test]
    async fn field_order_survives_storage() {
        let (_, comments) = comments();
        let keys = |document: Document| document.keys().cloned().collect::<Vec<_>>();

        comments
            .add_one(doc(json!({"_id": "a", "z": 1, "b": 2})))
            .await
            .unwrap();
        comments
            .update_one("a", doc(json!({"c": 3, "z": 0})))
            .await
            .unwrap();
        let stored = comments.get_one("a").await.unwrap().unwrap();
        assert_eq!(keys(stored), vec!["_id", "z", "b", "c"]);

        let generated = comments.add_one(doc(json!({"y": 1, "x": 2}))).await.unwrap();
        let stored = comments.get_one(&generated.id).await.unwrap().unwrap();
        assert_eq!(keys(stored), vec!["y", "x", "_id"]);
    }

    #[tokio::test]
    async fn add_rejects_non_string_id() {
        let (backend, comments) = comments();
        assert!(matches!(
            comments.add_one(doc(json!({"_id": 7}))).await,
            Err(Error::InvalidDocument(_))
        ));
        assert!(backend.is_empty().unwrap());
    }

    #[tokio::test]
    async fn re_adding_an_id_overwrites_without_duplicating() {
        let (_, comments) = comments();
        comments.add_one(doc(json!({"_id": "c1", "v": 1}))).await.unwrap();
        comments.add_one(doc(json!({"_id": "c1", "v": 2}))).await.unwrap();
        assert_eq!(comments.ids().await.unwrap(), vec!["c1"]);
        assert_eq!(comments.get_one("c1").await.unwrap().unwrap()["v"], json!(2));
    }

    #[tokio::test]
    async fn failed_index_write_leaves_orphan() {
        let (backend, comments) = comments();
        backend.fail_puts_to("index:comment").unwrap();
        assert!(comments.add_one(doc(json!({"_id": "c1"}))).await.is_err());

        assert!(comments.get_one("c1").await.unwrap().is_some());
        assert!(comments.get_all(&Query::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_merges_shallowly() {
        let (_, comments) = comments();
        comments
            .add_one(doc(json!({"_id": "c1", "a": 1, "b": {"x": 1}})))
            .await
            .unwrap();

        let result = comments
            .update_one("c1", doc(json!({"b": {"y": 2}, "c": 3})))
            .await
            .unwrap();
        assert_eq!(result, Updated { updated: 1 });
        assert_eq!(
            comments.get_one("c1").await.unwrap(),
            Some(doc(json!({"_id": "c1", "a": 1, "b": {"y": 2}, "c": 3})))
        );
    }

    #[tokio::test]
    async fn update_missing_has_no_side_effects() {
        let (backend, comments) = comments();
        let result = comments.update_one("nope", doc(json!({"a": 1}))).await.unwrap();
        assert_eq!(result, Updated { updated: 0 });
        assert!(backend.is_empty().unwrap());
    }

    #[tokio::test]
    async fn delete_is_unconditional() {
        let (_, comments) = comments();
        comments.add_one(doc(json!({"_id": "c1"}))).await.unwrap();

        assert_eq!(comments.delete_one("c1").await.unwrap(), Deleted { deleted: 1 });
        assert_eq!(comments.delete_one("never").await.unwrap(), Deleted { deleted: 1 });
        assert!(comments.get_one("c1").await.unwrap().is_none());
        assert!(comments.get_one("never").await.unwrap().is_none());
        assert!(comments.ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bulk_add_stops_at_first_failure() {
        let (backend, comments) = comments();
        backend.fail_puts_to("comment:d2").unwrap();

        let result = comments
            .bulk_add(vec![
                doc(json!({"_id": "d1"})),
                doc(json!({"_id": "d2"})),
                doc(json!({"_id": "d3"})),
            ])
            .await;
        assert!(matches!(result, Err(Error::Backend(_))));

        assert!(comments.get_one("d1").await.unwrap().is_some());
        assert!(comments.get_one("d2").await.unwrap().is_none());
        assert!(comments.get_one("d3").await.unwrap().is_none());
        assert_eq!(comments.ids().await.unwrap(), vec!["d1"]);
    }

    #[tokio::test]
    async fn try_bulk_add_commits_prefix_before_bad_entry() {
        let (_, comments) = comments();
        let result = comments
            .try_bulk_add(vec![
                Ok(doc(json!({"_id": "a"}))),
                into_document(json!(5)),
                Ok(doc(json!({"_id": "c"}))),
            ])
            .await;
        assert!(matches!(result, Err(Error::InvalidDocument(_))));

        assert!(comments.get_one("a").await.unwrap().is_some());
        assert!(comments.get_one("c").await.unwrap().is_none());
        assert_eq!(comments.ids().await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn bulk_add_keeps_input_order() {
        let (_, comments) = comments();
        let count = comments
            .bulk_add(["z", "a", "m"].map(|id| doc(json!({"_id": id}))))
            .await
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(comments.ids().await.unwrap(), vec!["z", "a", "m"]);
    }

    #[tokio::test]
    async fn get_all_skips_missing_documents_and_filters() {
        let (backend, comments) = comments();
        for (id, x) in [("a", 1), ("b", 2), ("c", 3)] {
            comments.add_one(doc(json!({"_id": id, "x": x}))).await.unwrap();
        }
        backend.delete("comment:b").await.unwrap();

        let all = comments.get_all(&Query::all()).await.unwrap();
        assert_eq!(all.len(), 2);

        let query = Query::parse(&json!({"x": {"$gt": 1}})).unwrap();
        let matched = comments.get_all(&query).await.unwrap();
        assert_eq!(matched, vec![doc(json!({"_id": "c", "x": 3}))]);
        assert_eq!(comments.count(&query).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn stream_yields_in_index_order() {
        let (_, comments) = comments();
        for id in ["b", "a"] {
            comments.add_one(doc(json!({"_id": id}))).await.unwrap();
        }
        let ids = comments
            .stream(Query::all())
            .map(|d| d.unwrap()[ID_FIELD].clone())
            .collect::<Vec<_>>()
            .await;
        assert_eq!(ids, vec![json!("b"), json!("a")]);
    }

    #[tokio::test]
    async fn collections_do_not_share_documents() {
        let backend = MemoryBackend::new();
        let comments = Collection::new("comment", backend.clone());
        let pages = Collection::new("page", backend);
        comments.add_one(doc(json!({"_id": "1"}))).await.unwrap();
        assert!(pages.get_one("1").await.unwrap().is_none());
        assert!(pages.get_all(&Query::all()).await.unwrap().is_empty());
    }
}
