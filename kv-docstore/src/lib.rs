mod backend;
mod collection;
mod config;
mod counter;
mod db;
mod dispatch;
mod document;
mod error;
mod filter;
mod index;
mod options;
mod typed;
mod utils;

pub use backend::{KvBackend, MemoryBackend, TikvBackend};
pub use collection::{Collection, Deleted, Inserted, Updated};
pub use config::ConfigStore;
pub use counter::{Counter, CounterStore};
pub use db::DB;
pub use dispatch::{CODE_FAIL, CODE_FORBIDDEN, CODE_SUCCESS, Dispatcher, Request, Response};
pub use document::{Document, DocumentStore, ID_FIELD, into_document};
pub use error::Error;
pub use filter::Query;
pub use index::IndexManager;
pub use kv_docstore_derive::KvDocument;
pub use options::{COLLECTION_ENV, DEFAULT_COLLECTION, PD_ENDPOINTS_ENV, StoreOptions};
pub use typed::TypedCollection;
pub use utils::encode_uri_component;

/// A Rust type stored as documents of one collection.
///
/// Usually derived: `#[derive(KvDocument)]` with an optional
/// `#[kv(collection = "...")]`; the collection defaults to the snake_case
/// type name. The serialized form must be a JSON object, and a string `_id`
/// field (if any) is used as the document id.
pub trait KvDocument: serde::Serialize + serde::de::DeserializeOwned {
    /// Collection name, used as the key prefix.
    fn collection() -> &'static str;
}
