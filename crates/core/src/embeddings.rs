use crate::error::ModelLoadError;
use regex::Regex;

pub const CHARACTER_NGRAM_MODEL: &str = "char-ngram-128";
pub const TOKEN_HASH_MODEL: &str = "token-hash-256";
pub const DEFAULT_EMBEDDING_MODEL: &str = CHARACTER_NGRAM_MODEL;
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 128;

/// Maps text to a fixed-dimension dense vector. The same text under the same model must
/// always produce the same vector, or queries stop lining up with the index.
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;
    fn dimensions(&self) -> usize;
    fn encode(&self, text: &str) -> Result<Vec<f32>, ModelLoadError>;

    /// One vector per input, in input order.
    fn encode_many(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ModelLoadError> {
        texts.iter().map(|text| self.encode(text)).collect()
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 1469598103934665603u64;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    hash
}

fn l2_normalize(vector: &mut [f32]) {
    let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in vector.iter_mut() {
            *value /= magnitude;
        }
    }
}

/// Hashed character trigrams, L2 normalised.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl Embedder for CharacterNgramEmbedder {
    fn model_id(&self) -> &str {
        CHARACTER_NGRAM_MODEL
    }

    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, ModelLoadError> {
        let mut vector = vec![0f32; self.dimensions()];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return Ok(vector);
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let bucket = (fnv1a(token.as_bytes()) % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        l2_normalize(&mut vector);
        Ok(vector)
    }
}

/// Hashed word unigrams and bigrams with a sign bit taken from the hash.
#[derive(Debug, Clone)]
pub struct TokenHashEmbedder {
    dimensions: usize,
    token_re: Regex,
}

impl TokenHashEmbedder {
    pub fn new(dimensions: usize) -> Result<Self, ModelLoadError> {
        let token_re = Regex::new(r"[\p{L}\p{N}]+")
            .map_err(|error| ModelLoadError::new(TOKEN_HASH_MODEL, error.to_string()))?;
        Ok(Self {
            dimensions: dimensions.max(1),
            token_re,
        })
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let hash = fnv1a(feature.as_bytes());
        let bucket = (hash % vector.len() as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl Embedder for TokenHashEmbedder {
    fn model_id(&self) -> &str {
        TOKEN_HASH_MODEL
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, ModelLoadError> {
        let mut vector = vec![0f32; self.dimensions];
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = self
            .token_re
            .find_iter(&lowered)
            .map(|found| found.as_str())
            .collect();

        for token in &tokens {
            self.accumulate(&mut vector, token, 1.0);
        }
        for pair in tokens.windows(2) {
            self.accumulate(&mut vector, &format!("{} {}", pair[0], pair[1]), 0.5);
        }

        l2_normalize(&mut vector);
        Ok(vector)
    }
}
