use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recorded as the bot turn when an answer falls below the confidence floor.
pub const NO_ANSWER_TEXT: &str = "I could not find an answer to that in the fetched posts.";

/// One window of the ingested document. Its position in the chunk list is its identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    /// Byte offset of `text` within the source document.
    pub offset: usize,
}

impl TextChunk {
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    pub content: String,
}

impl Post {
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            id: None,
            title: None,
            link: None,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Bot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            at: Utc::now(),
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Bot,
            content: content.into(),
            at: Utc::now(),
        }
    }
}

/// Position in the index and its squared Euclidean distance to the query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    pub position: usize,
    pub distance: f32,
    pub chunk: TextChunk,
}

/// Best span an answerer found inside the context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub text: String,
    /// Fraction of the question's content terms the supporting sentence covers, in `[0, 1]`.
    pub confidence: f32,
    /// Byte offset of `text` within the context it was extracted from.
    pub start: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    pub confidence: f32,
    pub grounded: bool,
    pub sources: Vec<RetrievedChunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSummary {
    pub corpus_id: String,
    pub chunk_count: usize,
    pub embedding_model: String,
    pub dimensions: usize,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separator: String,
    pub top_k: usize,
    pub embedding_model: String,
    pub qa_model: String,
    pub min_answer_confidence: Option<f32>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1_000,
            chunk_overlap: 200,
            separator: "\n".to_string(),
            top_k: crate::retrieval::DEFAULT_TOP_K,
            embedding_model: crate::embeddings::DEFAULT_EMBEDDING_MODEL.to_string(),
            qa_model: crate::answer::DEFAULT_QA_MODEL.to_string(),
            min_answer_confidence: None,
        }
    }
}
