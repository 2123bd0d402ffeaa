use std::marker::PhantomData;

use serde_json::Value;

use crate::{
    KvDocument,
    backend::KvBackend,
    collection::{Collection, Deleted, Inserted, Updated},
    document::{Document, into_document},
    error::Error,
    filter::Query,
};

/// A [`Collection`] whose documents (de)serialize to `T`.
pub struct TypedCollection<T, B> {
    inner: Collection<B>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, B: Clone> Clone for TypedCollection<T, B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, B> TypedCollection<T, B>
where
    T: KvDocument,
    B: KvBackend,
{
    pub fn new(inner: Collection<B>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    pub fn untyped(&self) -> &Collection<B> {
        &self.inner
    }

    pub async fn add(&self, value: &T) -> Result<Inserted, Error> {
        self.inner.add_one(to_document(value)?).await
    }

    pub async fn bulk_add(&self, values: &[T]) -> Result<usize, Error> {
        self.inner.try_bulk_add(values.iter().map(to_document)).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, Error> {
        self.inner
            .get_one(id)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn all(&self, query: &Query) -> Result<Vec<T>, Error> {
        self.inner
            .get_all(query)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn update(&self, id: &str, updates: Value) -> Result<Updated, Error> {
        self.inner.update_one(id, into_document(updates)?).await
    }

    pub async fn delete(&self, id: &str) -> Result<Deleted, Error> {
        self.inner.delete_one(id).await
    }
}

fn to_document<T: KvDocument>(value: &T) -> Result<Document, Error> {
    into_document(serde_json::to_value(value).map_err(Error::SerializationError)?)
}

fn from_document<T: KvDocument>(document: Document) -> Result<T, Error> {
    serde_json::from_value(Value::Object(document)).map_err(Error::DeserializationError)
}
