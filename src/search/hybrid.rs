//! Dense embedding tables and reciprocal rank fusion
//!
//! The dense side is an external collaborator: unit-length float vectors
//! for passages and queries, keyed by external id. Cosine over unit vectors
//! reduces to a dot product. Fusion operates purely on ranked external-id
//! lists.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::info;

use crate::error::{Result, TrawlerError};

/// Embedding dimensionality
pub const EMBEDDING_DIM: usize = 384;
/// Rank-smoothing constant of reciprocal rank fusion
pub const RRF_K: u32 = 60;

/// Passage and query embedding tables for one corpus variant
pub struct DenseStore {
    passage_embeddings: Vec<f32>,
    passage_ids: Vec<String>,
    query_embeddings: Vec<f32>,
    query_index: HashMap<String, usize>,
}

impl DenseStore {
    /// Load `embeddings_{variant}.bin`, `passage_ids_{variant}.txt`,
    /// `query_embeddings.bin`, and `query_ids.txt` from `dir`
    pub fn open(dir: &Path, variant: &str) -> Result<Self> {
        let passage_embeddings =
            load_embeddings(&dir.join(format!("embeddings_{}.bin", variant)))?;
        let passage_ids = load_id_lines(&dir.join(format!("passage_ids_{}.txt", variant)))?;
        if passage_ids.len() * EMBEDDING_DIM != passage_embeddings.len() {
            return Err(TrawlerError::corrupt(format!(
                "{} passage ids for {} embedding rows",
                passage_ids.len(),
                passage_embeddings.len() / EMBEDDING_DIM
            )));
        }

        let query_embeddings = load_embeddings(&dir.join("query_embeddings.bin"))?;
        let query_ids = load_id_lines(&dir.join("query_ids.txt"))?;
        if query_ids.len() * EMBEDDING_DIM != query_embeddings.len() {
            return Err(TrawlerError::corrupt(format!(
                "{} query ids for {} embedding rows",
                query_ids.len(),
                query_embeddings.len() / EMBEDDING_DIM
            )));
        }
        let query_index = query_ids
            .into_iter()
            .enumerate()
            .map(|(row, id)| (id, row))
            .collect();

        let store = Self {
            passage_embeddings,
            passage_ids,
            query_embeddings,
            query_index,
        };
        info!(
            passages = store.num_passages(),
            queries = store.query_index.len(),
            "dense store loaded"
        );
        Ok(store)
    }

    pub fn num_passages(&self) -> usize {
        self.passage_ids.len()
    }

    /// Embedding-table row for a query external id
    pub fn query_row(&self, query_id: &str) -> Option<usize> {
        self.query_index.get(query_id).copied()
    }

    /// Rank all passages for one query row by dot product, descending,
    /// truncated to `top_k`; returns external ids
    pub fn rank(&self, query_row: usize, top_k: usize) -> Vec<String> {
        let query = &self.query_embeddings[query_row * EMBEDDING_DIM..][..EMBEDDING_DIM];

        let mut scored: Vec<(usize, f32)> = self
            .passage_embeddings
            .chunks_exact(EMBEDDING_DIM)
            .map(|row| row.iter().zip(query).map(|(a, b)| a * b).sum::<f32>())
            .enumerate()
            .collect();
        scored.sort_unstable_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(row, _)| self.passage_ids[row].clone())
            .collect()
    }
}

/// Fuse two ranked external-id lists with reciprocal rank fusion
///
/// Each list contributes `1 / (RRF_K + rank)` per document, rank starting
/// at 1; documents present in only one list keep only that term. The fused
/// list is sorted descending and truncated to `top_k`.
pub fn reciprocal_rank_fusion(
    lexical: &[String],
    dense: &[String],
    top_k: usize,
) -> Vec<(String, f64)> {
    let mut scores: HashMap<&str, f64> = HashMap::new();
    for list in [lexical, dense] {
        for (i, id) in list.iter().enumerate() {
            *scores.entry(id.as_str()).or_insert(0.0) += 1.0 / (RRF_K as f64 + i as f64 + 1.0);
        }
    }

    let mut fused: Vec<(String, f64)> = scores
        .into_iter()
        .map(|(id, score)| (id.to_string(), score))
        .collect();
    fused.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    fused.truncate(top_k);
    fused
}

fn load_embeddings(path: &Path) -> Result<Vec<f32>> {
    let raw = std::fs::read(path).map_err(|e| TrawlerError::open(path, e))?;
    if raw.len() < 4 {
        return Err(TrawlerError::corrupt(format!(
            "{}: missing row count",
            path.display()
        )));
    }
    let mut count_bytes = [0u8; 4];
    count_bytes.copy_from_slice(&raw[..4]);
    let rows = u32::from_le_bytes(count_bytes) as usize;

    let expected = 4 + rows * EMBEDDING_DIM * 4;
    if raw.len() != expected {
        return Err(TrawlerError::corrupt(format!(
            "{}: {} rows of dim {} require {} bytes, file has {}",
            path.display(),
            rows,
            EMBEDDING_DIM,
            expected,
            raw.len()
        )));
    }

    Ok(raw[4..]
        .chunks_exact(4)
        .map(|c| {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(c);
            f32::from_le_bytes(bytes)
        })
        .collect())
}

fn load_id_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| TrawlerError::open(path, e))?;
    let mut ids = Vec::new();
    for line in BufReader::new(file).lines() {
        ids.push(line?);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rrf_exact_scores() {
        let fused = reciprocal_rank_fusion(&ids(&["A", "C", "D"]), &ids(&["D", "A", "B"]), 10);

        let order: Vec<&str> = fused.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, vec!["A", "D", "C", "B"]);

        let score = |id: &str| fused.iter().find(|(i, _)| i == id).unwrap().1;
        assert_eq!(score("A"), 1.0 / 61.0 + 1.0 / 62.0);
        assert_eq!(score("D"), 1.0 / 63.0 + 1.0 / 61.0);
        assert_eq!(score("C"), 1.0 / 62.0);
        assert_eq!(score("B"), 1.0 / 63.0);
    }

    #[test]
    fn test_rrf_score_range() {
        // Any fused score lies in (0, 2 / (RRF_K + 1)]
        let fused = reciprocal_rank_fusion(&ids(&["A", "B"]), &ids(&["A", "B"]), 10);
        let upper = 2.0 / (RRF_K as f64 + 1.0);
        for (_, score) in &fused {
            assert!(*score > 0.0);
            assert!(*score <= upper);
        }
        assert_eq!(fused[0].1, upper);
    }

    #[test]
    fn test_rrf_single_list_document() {
        let fused = reciprocal_rank_fusion(&ids(&["A"]), &[], 10);
        assert_eq!(fused, vec![("A".to_string(), 1.0 / 61.0)]);
    }

    #[test]
    fn test_rrf_truncates() {
        let lexical = ids(&["A", "B", "C", "D"]);
        let fused = reciprocal_rank_fusion(&lexical, &[], 2);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].0, "A");
    }
}
