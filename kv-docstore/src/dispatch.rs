use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    backend::KvBackend,
    db::DB,
    document::{Document, into_document},
    error::Error,
    filter::Query,
    options::DEFAULT_COLLECTION,
};

pub const CODE_SUCCESS: u32 = 0;
pub const CODE_FAIL: u32 = 1000;
/// Reserved for the host boundary when a caller is not allowed in.
pub const CODE_FORBIDDEN: u32 = 1403;

/// `{"action": "...", "data": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

impl Request {
    pub fn new(action: impl Into<String>, data: Value) -> Self {
        Self {
            action: action.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub code: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    pub fn success(data: Value) -> Self {
        Self {
            code: CODE_SUCCESS,
            data: Some(data),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            code: CODE_FAIL,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            code: CODE_FORBIDDEN,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == CODE_SUCCESS
    }
}

#[derive(Deserialize)]
struct QueryArgs {
    #[serde(default)]
    query: Value,
}

#[derive(Deserialize)]
struct CommentArgs {
    comment: Value,
}

#[derive(Deserialize)]
struct UpdateArgs {
    id: String,
    #[serde(default)]
    updates: Value,
}

#[derive(Deserialize)]
struct IdArgs {
    id: String,
}

#[derive(Deserialize)]
struct BulkArgs {
    comments: Vec<Value>,
}

#[derive(Deserialize)]
struct ConfigArgs {
    #[serde(default)]
    config: Value,
}

#[derive(Deserialize)]
struct UrlArgs {
    url: String,
}

#[derive(Deserialize)]
struct IncArgs {
    url: String,
    #[serde(default)]
    title: Option<String>,
}

/// Routes named actions to the stores and wraps the outcome in a [`Response`].
#[derive(Clone)]
pub struct Dispatcher<B> {
    db: DB<B>,
    collection: String,
}

impl<B: KvBackend> Dispatcher<B> {
    pub fn new(db: DB<B>) -> Self {
        Self::with_collection(db, DEFAULT_COLLECTION)
    }

    pub fn with_collection(db: DB<B>, collection: impl Into<String>) -> Self {
        Self {
            db,
            collection: collection.into(),
        }
    }

    pub async fn dispatch_json(&self, body: &str) -> Response {
        match serde_json::from_str::<Request>(body) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                log::error!("malformed request: {}", e);
                Response::failure(format!("KV Error: {}", e))
            }
        }
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        log::debug!("action {}", request.action);
        match self.run(&request.action, request.data).await {
            Ok(Some(data)) => Response::success(data),
            Ok(None) => Response::failure("unknown action"),
            Err(e) => {
                log::error!("action {} failed: {}", request.action, e);
                Response::failure(format!("KV Error: {}", e))
            }
        }
    }

    async fn run(&self, action: &str, data: Value) -> Result<Option<Value>, Error> {
        let comments = self.db.collection(self.collection.clone());
        let result = match action {
            "getComments" => {
                let QueryArgs { query } = args(data)?;
                to_value(comments.get_all(&Query::parse(&query)?).await?)?
            }
            "addComment" => {
                let CommentArgs { comment } = args(data)?;
                to_value(comments.add_one(into_document(comment)?).await?)?
            }
            "updateComment" => {
                let UpdateArgs { id, updates } = args(data)?;
                to_value(comments.update_one(&id, into_partial(updates)?).await?)?
            }
            "deleteComment" => {
                let IdArgs { id } = args(data)?;
                to_value(comments.delete_one(&id).await?)?
            }
            "getComment" => {
                let IdArgs { id } = args(data)?;
                to_value(comments.get_one(&id).await?)?
            }
            "bulkAddComments" => {
                let BulkArgs { comments: documents } = args(data)?;
                let documents = documents.into_iter().map(into_document);
                to_value(comments.try_bulk_add(documents).await?)?
            }
            "getConfig" => to_value(self.db.config().get().await?)?,
            "saveConfig" => {
                let ConfigArgs { config } = args(data)?;
                to_value(self.db.config().save(into_partial(config)?).await?)?
            }
            "getCounter" => {
                let UrlArgs { url } = args(data)?;
                to_value(self.db.counters().get(&url).await?)?
            }
            "incCounter" => {
                let IncArgs { url, title } = args(data)?;
                self.db.counters().increment(&url, title).await?;
                Value::from(1)
            }
            _ => return Ok(None),
        };
        Ok(Some(result))
    }
}

fn args<T: DeserializeOwned>(data: Value) -> Result<T, Error> {
    serde_json::from_value(data).map_err(Error::DeserializationError)
}

/// Merge payload; a missing or null payload merges nothing.
fn into_partial(value: Value) -> Result<Document, Error> {
    match value {
        Value::Null => Ok(Document::new()),
        other => into_document(other),
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(Error::SerializationError)
}
