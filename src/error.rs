use thiserror::Error;

/// Main error type for the retrieval engine.
#[derive(Error, Debug)]
pub enum RouterError {
    /// Disk read/write or missing path.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file missing, malformed, or failing validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Loaded index bundle doesn't match the current corpus/embedding model.
    #[error("Index incompatible: {0}")]
    IndexIncompatible(String),

    /// Catalog row missing a required metadata field at build time.
    #[error("Corpus invalid: {0}")]
    CorpusInvalid(String),

    /// Embedding or reranker HTTP call failed (network/HTTP error).
    #[error("Remote service unavailable: {0}")]
    RemoteUnavailable(String),

    /// Embedding or reranker response had the wrong shape or count.
    #[error("Bad response from remote service: {0}")]
    BadResponse(String),

    /// Embedding or reranker credential rejected.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Empty query string or non-finite embedding value.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// JSON (de)serialization error surfaced from serde_json.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Convenient Result type using RouterError.
pub type Result<T> = std::result::Result<T, RouterError>;
