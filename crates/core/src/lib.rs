pub mod answer;
pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod hub;
pub mod index;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod retrieval;
pub mod sources;
pub mod traits;

pub use answer::{Answerer, LexicalSpanAnswerer, DEFAULT_QA_MODEL};
pub use chunking::{normalize_whitespace, split_text, ChunkingConfig};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, TokenHashEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
    DEFAULT_EMBEDDING_MODEL,
};
pub use error::{IndexError, IngestError, ModelLoadError, QueryError, SourceError};
pub use hub::{SharedAnswerer, SharedEmbedder, EMBEDDING_MODELS, QA_MODELS};
pub use index::FlatIndex;
pub use ingest::{assemble_corpus, parse_posts};
pub use models::{
    Answer, ChatRole, ChatTurn, IngestSummary, Neighbor, PipelineOptions, Post, Reply,
    RetrievedChunk, TextChunk, NO_ANSWER_TEXT,
};
pub use orchestrator::{ChatPipeline, CorpusSnapshot, PipelineState};
pub use retrieval::{assemble_context, retrieve, DEFAULT_TOP_K};
pub use sources::{FolderSource, PostsClient};
pub use traits::{ContentSource, VectorIndex};
