use thiserror::Error;

/// A backend model could not be resolved or failed while running.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("model `{model}` unavailable: {reason}")]
pub struct ModelLoadError {
    pub model: String,
    pub reason: String,
}

impl ModelLoadError {
    pub fn new(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("dimension mismatch: index holds {expected}-d vectors, got {actual}-d")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("cannot build an index from zero vectors")]
    Empty,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("content source answered {status}")]
    BackendResponse { status: u16 },

    #[error("malformed source data: {0}")]
    MalformedSourceData(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("corpus contains no extractable text")]
    EmptyCorpus,

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),

    #[error("index build failed: {0}")]
    Index(#[from] IndexError),

    #[error("content source failed: {0}")]
    Source(#[from] SourceError),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no corpus ingested yet")]
    NotReady,

    #[error("query is empty")]
    EmptyQuery,

    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),

    #[error("search failed: {0}")]
    Index(#[from] IndexError),

    #[error("index was built with `{index_model}` but queries are embedded with `{query_model}`")]
    EmbeddingModelMismatch {
        index_model: String,
        query_model: String,
    },

    #[error("chunk list ({chunks}) and index ({indexed}) are out of sync")]
    CorpusMismatch { chunks: usize, indexed: usize },
}
