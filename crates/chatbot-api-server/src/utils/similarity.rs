use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SimilarityError {
    #[error("Embedding dimensions differ: {0} != {1}")]
    DimensionMismatch(usize, usize),

    #[error("Embedding is empty")]
    Empty,
}

/// Cosine similarity of two embeddings in `[-1, 1]`. Zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch(a.len(), b.len()));
    }
    if a.is_empty() {
        return Err(SimilarityError::Empty);
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0))
}
