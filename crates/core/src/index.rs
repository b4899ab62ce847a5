use crate::traits::VectorIndex;
use crate::{IndexError, Neighbor};

/// Exact (brute force) index over squared Euclidean distance.
///
/// Vectors are stored row-major in one buffer. There is no add or remove: a new corpus
/// means a new index.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimensions: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn build(vectors: &[Vec<f32>]) -> Result<Self, IndexError> {
        let dimensions = vectors.first().map(Vec::len).ok_or(IndexError::Empty)?;
        if dimensions == 0 {
            return Err(IndexError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }

        let mut data = Vec::with_capacity(vectors.len() * dimensions);
        for vector in vectors {
            if vector.len() != dimensions {
                return Err(IndexError::DimensionMismatch {
                    expected: dimensions,
                    actual: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }

        Ok(Self { dimensions, data })
    }

    fn row(&self, position: usize) -> &[f32] {
        let start = position * self.dimensions;
        &self.data[start..start + self.dimensions]
    }
}

fn squared_l2(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .zip(right)
        .map(|(a, b)| {
            let delta = a - b;
            delta * delta
        })
        .sum()
}

impl VectorIndex for FlatIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> usize {
        self.data.len() / self.dimensions
    }

    fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if query_vector.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: query_vector.len(),
            });
        }

        let mut neighbors: Vec<Neighbor> = (0..self.len())
            .map(|position| Neighbor {
                position,
                distance: squared_l2(self.row(position), query_vector),
            })
            .collect();

        // sort_by is stable, so equal distances keep insertion order
        neighbors.sort_by(|left, right| left.distance.total_cmp(&right.distance));
        neighbors.truncate(top_k.min(self.len()));
        Ok(neighbors)
    }
}
