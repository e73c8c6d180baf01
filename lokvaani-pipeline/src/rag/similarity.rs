//! Vector similarity ranking

/// Cosine similarity of two embeddings; 0 when either has zero norm
///
/// Vectors of different length are compared over their common prefix.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

/// The `k` items most similar to `query`, best first
pub fn top_k_by_similarity<T, F>(query: &[f32], items: Vec<T>, k: usize, embedding: F) -> Vec<T>
where
    F: Fn(&T) -> &[f32],
{
    let mut scored: Vec<(f64, T)> = items
        .into_iter()
        .map(|item| (cosine_similarity(query, embedding(&item)), item))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().take(k).map(|(_, item)| item).collect()
}
