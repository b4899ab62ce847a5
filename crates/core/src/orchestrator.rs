use crate::chunking::{split_text, ChunkingConfig};
use crate::hub::{self, SharedAnswerer, SharedEmbedder};
use crate::index::FlatIndex;
use crate::ingest::assemble_corpus;
use crate::retrieval::{assemble_context, retrieve};
use crate::traits::{ContentSource, VectorIndex};
use crate::{
    ChatTurn, IngestError, IngestSummary, PipelineOptions, QueryError, Reply, TextChunk,
    NO_ANSWER_TEXT,
};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One ingested corpus: its chunks, the index over them and the model that embedded them.
/// Never mutated; a new ingest builds a new snapshot.
#[derive(Debug)]
pub struct CorpusSnapshot {
    pub corpus_id: String,
    pub chunks: Vec<TextChunk>,
    pub index: FlatIndex,
    pub embedding_model: String,
    pub ingested_at: DateTime<Utc>,
}

impl CorpusSnapshot {
    fn summary(&self) -> IngestSummary {
        IngestSummary {
            corpus_id: self.corpus_id.clone(),
            chunk_count: self.chunks.len(),
            embedding_model: self.embedding_model.clone(),
            dimensions: self.index.dimensions(),
            ingested_at: self.ingested_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Empty,
    Ready,
}

/// Owns one chat session: the current corpus snapshot and the transcript.
///
/// `ingest` swaps the snapshot wholesale and only once every stage has succeeded. `ask`
/// records the user and bot turns together or not at all.
pub struct ChatPipeline {
    session_id: Uuid,
    options: PipelineOptions,
    embedder: Option<SharedEmbedder>,
    answerer: Option<SharedAnswerer>,
    snapshot: Option<Arc<CorpusSnapshot>>,
    history: Vec<ChatTurn>,
}

impl ChatPipeline {
    /// Models named in `options` are resolved through the process-wide hub on first use.
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            options,
            embedder: None,
            answerer: None,
            snapshot: None,
            history: Vec::new(),
        }
    }

    pub fn with_models(
        options: PipelineOptions,
        embedder: SharedEmbedder,
        answerer: SharedAnswerer,
    ) -> Self {
        let mut pipeline = Self::new(options);
        pipeline.embedder = Some(embedder);
        pipeline.answerer = Some(answerer);
        pipeline
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn state(&self) -> PipelineState {
        if self.snapshot.is_some() {
            PipelineState::Ready
        } else {
            PipelineState::Empty
        }
    }

    pub fn snapshot(&self) -> Option<Arc<CorpusSnapshot>> {
        self.snapshot.clone()
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Installs a different embedding model. The current index keeps its old model, so
    /// questions fail with [`QueryError::EmbeddingModelMismatch`] until the next ingest.
    pub fn replace_embedder(&mut self, embedder: SharedEmbedder) {
        self.options.embedding_model = embedder.model_id().to_string();
        self.embedder = Some(embedder);
    }

    fn embedder(&mut self) -> Result<SharedEmbedder, crate::ModelLoadError> {
        if let Some(embedder) = &self.embedder {
            return Ok(Arc::clone(embedder));
        }
        let embedder = hub::embedder(&self.options.embedding_model)?;
        self.embedder = Some(Arc::clone(&embedder));
        Ok(embedder)
    }

    fn answerer(&mut self) -> Result<SharedAnswerer, crate::ModelLoadError> {
        if let Some(answerer) = &self.answerer {
            return Ok(Arc::clone(answerer));
        }
        let answerer = hub::answerer(&self.options.qa_model)?;
        self.answerer = Some(Arc::clone(&answerer));
        Ok(answerer)
    }

    /// Chunks, embeds and indexes `document`, replacing any previous corpus. On failure
    /// the previous state is left exactly as it was.
    pub fn ingest(&mut self, document: &str) -> Result<IngestSummary, IngestError> {
        let config = ChunkingConfig::from(&self.options);
        config.validate()?;

        if document.trim().is_empty() {
            return Err(IngestError::EmptyCorpus);
        }

        let chunks = split_text(document, &config);
        debug!(chunk_count = chunks.len(), "document chunked");

        let embedder = self.embedder()?;
        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        let vectors = embedder.encode_many(&texts)?;
        let index = FlatIndex::build(&vectors)?;

        let snapshot = CorpusSnapshot {
            corpus_id: corpus_id(document),
            chunks,
            index,
            embedding_model: embedder.model_id().to_string(),
            ingested_at: Utc::now(),
        };
        let summary = snapshot.summary();
        self.snapshot = Some(Arc::new(snapshot));

        info!(
            session = %self.session_id,
            corpus_id = %summary.corpus_id,
            chunk_count = summary.chunk_count,
            model = %summary.embedding_model,
            "corpus ingested"
        );
        Ok(summary)
    }

    /// Fetches posts from `source`, joins their content and ingests the result.
    pub async fn ingest_from<S>(&mut self, source: &S) -> Result<IngestSummary, IngestError>
    where
        S: ContentSource + Sync + ?Sized,
    {
        let posts = source.fetch_posts().await?;
        info!(source = %source.describe(), post_count = posts.len(), "posts fetched");
        let document = assemble_corpus(&posts)?;
        self.ingest(&document)
    }

    /// Retrieves context for `query`, extracts an answer and records the exchange.
    pub fn ask(&mut self, query: &str) -> Result<Reply, QueryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let snapshot = self.snapshot.clone().ok_or(QueryError::NotReady)?;
        let embedder = self.embedder()?;
        if embedder.model_id() != snapshot.embedding_model {
            return Err(QueryError::EmbeddingModelMismatch {
                index_model: snapshot.embedding_model.clone(),
                query_model: embedder.model_id().to_string(),
            });
        }
        let answerer = self.answerer()?;

        let sources = retrieve(
            query,
            &snapshot.index,
            &snapshot.chunks,
            embedder.as_ref(),
            self.options.top_k,
        )?;
        let context = assemble_context(&sources);
        let answer = answerer.answer(query, &context)?;

        let grounded = self
            .options
            .min_answer_confidence
            .map_or(true, |floor| answer.confidence >= floor);
        let text = if grounded {
            answer.text
        } else {
            warn!(
                confidence = answer.confidence,
                "answer below confidence floor"
            );
            NO_ANSWER_TEXT.to_string()
        };

        self.history.push(ChatTurn::user(query));
        self.history.push(ChatTurn::bot(text.clone()));

        Ok(Reply {
            text,
            confidence: answer.confidence,
            grounded,
            sources,
        })
    }
}

fn corpus_id(document: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document.as_bytes());
    format!("{:x}", hasher.finalize())
}
