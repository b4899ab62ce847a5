use crate::{IndexError, Neighbor, Post, SourceError};
use async_trait::async_trait;

/// Nearest-neighbour lookup over a frozen set of vectors. Positions are insertion order.
pub trait VectorIndex {
    fn dimensions(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// At most `top_k` neighbours, closest first.
    fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<Neighbor>, IndexError>;
}

/// Anything that can hand back the posts making up a corpus.
#[async_trait]
pub trait ContentSource {
    fn describe(&self) -> String;

    async fn fetch_posts(&self) -> Result<Vec<Post>, SourceError>;
}
