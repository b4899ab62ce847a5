use crate::chunking::normalize_whitespace;
use crate::error::ModelLoadError;
use crate::Answer;
use regex::Regex;
use std::collections::HashSet;

pub const LEXICAL_SPAN_MODEL: &str = "lexical-span";
pub const DEFAULT_QA_MODEL: &str = LEXICAL_SPAN_MODEL;

/// Extractive question answering: picks a contiguous span of `context`.
pub trait Answerer: Send + Sync {
    fn model_id(&self) -> &str;

    /// Always yields a span, even a weak one; callers decide what confidence is enough.
    fn answer(&self, query: &str, context: &str) -> Result<Answer, ModelLoadError>;
}

const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be",
    "been", "before", "but", "by", "can", "could", "did", "do", "does", "for", "from", "had",
    "has", "have", "he", "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "me",
    "my", "no", "not", "of", "on", "or", "our", "she", "so", "than", "that", "the", "their",
    "them", "then", "there", "these", "they", "this", "those", "to", "was", "we", "were", "what",
    "when", "where", "which", "who", "whom", "why", "will", "with", "would", "you", "your",
];

/// Scores each sentence of the context by how many of the question's content terms it
/// contains, then returns the words of the best sentence that the question did not already
/// supply.
#[derive(Debug, Clone)]
pub struct LexicalSpanAnswerer {
    sentence_re: Regex,
    token_re: Regex,
    stopwords: HashSet<&'static str>,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    start: usize,
    end: usize,
}

impl LexicalSpanAnswerer {
    pub fn new() -> Result<Self, ModelLoadError> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|error| ModelLoadError::new(LEXICAL_SPAN_MODEL, error.to_string()))
        };
        Ok(Self {
            sentence_re: compile(r"[^.!?\n]+[.!?]*")?,
            token_re: compile(r"[\p{L}\p{N}]+(?:'\p{L}+)?")?,
            stopwords: STOPWORDS.iter().copied().collect(),
        })
    }

    fn tokens(&self, text: &str, base: usize) -> Vec<Token> {
        self.token_re
            .find_iter(text)
            .map(|found| Token {
                start: base + found.start(),
                end: base + found.end(),
            })
            .collect()
    }

    fn is_stopword(&self, term: &str) -> bool {
        self.stopwords.contains(term)
    }

    fn query_terms(&self, query: &str) -> HashSet<String> {
        let all: Vec<String> = self
            .token_re
            .find_iter(query)
            .map(|found| found.as_str().to_lowercase())
            .collect();
        let content: HashSet<String> = all
            .iter()
            .filter(|term| !self.is_stopword(term))
            .map(|term| stem(term))
            .collect();
        if content.is_empty() {
            all.iter().map(|term| stem(term)).collect()
        } else {
            content
        }
    }
}

fn stem(term: &str) -> String {
    let term = term.strip_suffix("'s").unwrap_or(term);
    let count = term.chars().count();
    for (suffix, min_len) in [("ing", 5), ("ed", 4), ("es", 4), ("s", 4)] {
        if count >= min_len && term.ends_with(suffix) && !term.ends_with("ss") {
            return term[..term.len() - suffix.len()].to_string();
        }
    }
    term.to_string()
}

impl Answerer for LexicalSpanAnswerer {
    fn model_id(&self) -> &str {
        LEXICAL_SPAN_MODEL
    }

    fn answer(&self, query: &str, context: &str) -> Result<Answer, ModelLoadError> {
        let query_terms = self.query_terms(query);
        let sentences: Vec<(usize, usize)> = self
            .sentence_re
            .find_iter(context)
            .filter(|found| !found.as_str().trim().is_empty())
            .map(|found| (found.start(), found.end()))
            .collect();

        let Some(&first) = sentences.first() else {
            return Ok(Answer {
                text: normalize_whitespace(context),
                confidence: 0.0,
                start: 0,
            });
        };

        let mut best: Option<((usize, usize), usize)> = None;
        for &(start, end) in &sentences {
            let matched = self
                .tokens(&context[start..end], start)
                .iter()
                .map(|token| stem(&context[token.start..token.end].to_lowercase()))
                .filter(|term| query_terms.contains(term))
                .collect::<HashSet<_>>()
                .len();
            if matched > best.map_or(0, |(_, score)| score) {
                best = Some(((start, end), matched));
            }
        }

        let Some(((start, end), matched)) = best else {
            let (start, end) = first;
            return Ok(Answer {
                text: normalize_whitespace(&context[start..end]),
                confidence: 0.0,
                start,
            });
        };

        let answer_tokens: Vec<Token> = self
            .tokens(&context[start..end], start)
            .into_iter()
            .filter(|token| {
                let lowered = context[token.start..token.end].to_lowercase();
                !self.is_stopword(&lowered) && !query_terms.contains(&stem(&lowered))
            })
            .collect();

        let (span_start, span_end) = match (answer_tokens.first(), answer_tokens.last()) {
            (Some(first), Some(last)) => (first.start, last.end),
            _ => (start, end),
        };

        Ok(Answer {
            text: normalize_whitespace(&context[span_start..span_end]),
            confidence: matched as f32 / query_terms.len().max(1) as f32,
            start: span_start,
        })
    }
}
