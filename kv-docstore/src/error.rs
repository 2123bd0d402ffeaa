#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Backend not configured: {0}")]
    NotConfigured(String),
    #[error("TiKV error: {0}")]
    TikvError(#[from] tikv_client::Error),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Serde error: {0}")]
    SerializationError(serde_json::Error),
    #[error("Serde error: {0}")]
    DeserializationError(serde_json::Error),
    #[error("Invalid utf8: {0}")]
    InvalidUtf8(std::string::FromUtf8Error),
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}
