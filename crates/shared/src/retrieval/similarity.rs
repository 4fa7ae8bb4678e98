use std::cmp::Ordering;

use crate::retrieval::store::EmbeddingRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedDoc {
    pub id: String,
    pub text: String,
    pub similarity: f32,
}

/// Cosine of the angle between two vectors: dot product over the product of
/// Euclidean norms. A zero norm on either side yields 0.0 instead of
/// dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Scores every corpus record against the query vector and returns the
/// records sorted by descending similarity. The sort is stable, so ties
/// keep their original corpus order.
pub fn rank(corpus: &[EmbeddingRecord], query: &[f32]) -> Vec<RankedDoc> {
    let mut ranked: Vec<RankedDoc> = corpus
        .iter()
        .map(|record| RankedDoc {
            id: record.id.clone(),
            text: record.text.clone(),
            similarity: cosine_similarity(&record.vector, query),
        })
        .collect();

    ranked.sort_by(|left, right| {
        right
            .similarity
            .partial_cmp(&left.similarity)
            .unwrap_or(Ordering::Equal)
    });

    ranked
}
