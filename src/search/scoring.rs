//! BM25 term weighting

/// Term-frequency saturation parameter
pub const BM25_K1: f64 = 1.2;
/// Length-normalization parameter
pub const BM25_B: f64 = 0.75;

/// BM25 contribution of one term occurrence to one document's score
///
/// Uses the plain Robertson idf `ln((N - df + 0.5) / (df + 0.5))`, which
/// goes negative once a term appears in more than half the collection; the
/// value is deliberately not clamped.
pub fn bm25_weight(tf: u32, doc_len: u32, df: u32, total_docs: u32, avgdl: f64) -> f64 {
    let idf = ((total_docs as f64 - df as f64 + 0.5) / (df as f64 + 0.5)).ln();
    let tf = tf as f64;
    let norm = 1.0 - BM25_B + BM25_B * (doc_len as f64 / avgdl);
    idf * (tf * (BM25_K1 + 1.0)) / (tf + BM25_K1 * norm)
}
