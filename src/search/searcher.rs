//! Disjunctive and conjunctive BM25 query plans
//!
//! OR is evaluated term-at-a-time into per-document accumulators; AND is
//! evaluated document-at-a-time, driving the rarest term's cursor and
//! probing the others with `next_geq`. Both plans produce identical
//! per-document scores, so the AND result set is always a subset of OR.

use std::collections::HashMap;

use crate::error::Result;
use crate::index::{DocId, Index, PostingCursor};

use super::scoring::bm25_weight;

/// Result cap on the batch and server paths
pub const TOP_K: usize = 1000;

/// Query plan selector
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryMode {
    Or,
    And,
}

/// One scored candidate document
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

/// Query executor borrowing a read-only index
pub struct Searcher<'a> {
    index: &'a Index,
}

impl<'a> Searcher<'a> {
    pub fn new(index: &'a Index) -> Self {
        Self { index }
    }

    /// Run a query plan over analyzed terms
    ///
    /// Returns every candidate, sorted by score descending; callers
    /// truncate to their own result cap.
    pub fn search(&self, terms: &[String], mode: QueryMode) -> Result<Vec<ScoredDoc>> {
        let mut results = match mode {
            QueryMode::Or => self.disjunctive(terms)?,
            QueryMode::And => self.conjunctive(terms)?,
        };
        results.sort_unstable_by(|a, b| b.score.total_cmp(&a.score));
        Ok(results)
    }

    /// Term-at-a-time OR: terms missing from the lexicon contribute nothing
    fn disjunctive(&self, terms: &[String]) -> Result<Vec<ScoredDoc>> {
        let total_docs = self.index.total_documents();
        let avgdl = self.index.avgdl();
        let mut accumulators: HashMap<DocId, f64> = HashMap::new();

        for term in terms {
            let Some(entry) = self.index.lexicon_entry(term) else {
                continue;
            };
            let df = entry.doc_frequency;

            let mut cursor = self.index.cursor(term)?;
            cursor.next_geq(0)?;
            while cursor.valid() {
                let doc_id = cursor.doc();
                let weight = bm25_weight(
                    cursor.freq(),
                    self.index.doc_length(doc_id),
                    df,
                    total_docs,
                    avgdl,
                );
                *accumulators.entry(doc_id).or_insert(0.0) += weight;
                cursor.advance()?;
            }
        }

        Ok(accumulators
            .into_iter()
            .map(|(doc_id, score)| ScoredDoc { doc_id, score })
            .collect())
    }

    /// Document-at-a-time AND: any term missing from the lexicon empties
    /// the result
    fn conjunctive(&self, terms: &[String]) -> Result<Vec<ScoredDoc>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut cursors: Vec<PostingCursor<'_>> = Vec::with_capacity(terms.len());
        for term in terms {
            if self.index.lexicon_entry(term).is_none() {
                return Ok(Vec::new());
            }
            cursors.push(self.index.cursor(term)?);
        }

        // Rarest term drives the scan
        cursors.sort_by_key(|c| c.doc_frequency());
        let Some((pivot, rest)) = cursors.split_first_mut() else {
            return Ok(Vec::new());
        };

        let total_docs = self.index.total_documents();
        let avgdl = self.index.avgdl();
        let mut results = Vec::new();

        pivot.next_geq(0)?;
        'outer: while pivot.valid() {
            let doc_id = pivot.doc();

            let mut all_match = true;
            let mut resume_at = doc_id;
            for cursor in rest.iter_mut() {
                cursor.next_geq(doc_id)?;
                if !cursor.valid() {
                    break 'outer;
                }
                if cursor.doc() != doc_id {
                    all_match = false;
                    resume_at = cursor.doc();
                    break;
                }
            }

            if !all_match {
                pivot.next_geq(resume_at)?;
                continue;
            }

            let doc_len = self.index.doc_length(doc_id);
            let mut score = bm25_weight(
                pivot.freq(),
                doc_len,
                pivot.doc_frequency(),
                total_docs,
                avgdl,
            );
            for cursor in rest.iter_mut() {
                score += bm25_weight(
                    cursor.freq(),
                    doc_len,
                    cursor.doc_frequency(),
                    total_docs,
                    avgdl,
                );
            }
            results.push(ScoredDoc { doc_id, score });
            pivot.advance()?;
        }

        Ok(results)
    }
}
