//! In-memory passage vectors and cosine ranking.
//! No persistence; the matrix lives as long as the session that built it.

use thiserror::Error;

use crate::embedder::Embedding;

/// Rectangular N×D matrix of passage vectors, row i belonging to passage i.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingMatrix {
    dimension: usize,
    rows: usize,
    data: Vec<f32>,
}

#[derive(Debug, Error, PartialEq)]
#[error("row {row} has {actual} values, expected {expected}")]
pub struct ShapeError {
    pub row: usize,
    pub expected: usize,
    pub actual: usize,
}

impl EmbeddingMatrix {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            rows: 0,
            data: Vec::new(),
        }
    }

    /// Build from precomputed rows; every row must have `dimension` values.
    pub fn from_rows(dimension: usize, rows: Vec<Vec<f32>>) -> Result<Self, ShapeError> {
        let mut matrix = Self::new(dimension);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != dimension {
                return Err(ShapeError {
                    row,
                    expected: dimension,
                    actual: values.len(),
                });
            }
            matrix.data.extend(values);
            matrix.rows += 1;
        }
        Ok(matrix)
    }

    /// One row per embedding, in order. Embeddings always carry `dimension` values.
    pub fn from_embeddings(dimension: usize, embeddings: &[Embedding]) -> Self {
        let mut matrix = Self::new(dimension);
        for embedding in embeddings {
            let v = embedding.vector();
            assert_eq!(v.len(), dimension);
            matrix.data.extend_from_slice(v);
            matrix.rows += 1;
        }
        matrix
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dimension..(i + 1) * self.dimension]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }
}

/// Cosine similarity in [-1, 1]. A zero vector is 0-similar to everything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let na = norm(a);
    let nb = norm(b);
    if na <= 0.0 || nb <= 0.0 {
        return 0.0;
    }
    let sim = dot(a, b) / (na * nb);
    if sim.is_nan() {
        return 0.0;
    }
    sim.clamp(-1.0, 1.0)
}

/// Indices and scores of the `top_k` rows most similar to `query`, best first.
/// `query` must have the matrix's dimension.
/// Ties keep row order, so an all-zero query returns the first `top_k` rows.
pub fn rank(query: &[f32], matrix: &EmbeddingMatrix, top_k: usize) -> Vec<(usize, f32)> {
    if top_k == 0 || matrix.is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<(usize, f32)> = matrix
        .rows()
        .enumerate()
        .map(|(i, row)| (i, cosine_similarity(query, row)))
        .collect();
    // sort_by is stable
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
