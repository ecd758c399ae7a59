//! Hybrid retrieval over the local document index
//!
//! Semantic similarity first, then a lexical keyword-overlap reweight: pure
//! embedding similarity misses exact-term matches (drug names, species
//! terms) that keyword overlap recovers.

use crate::db::{vectors::cosine_similarity, Database};
use crate::error::Result;
use crate::llm::Embedder;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Default lexical weight in the blended score
pub const DEFAULT_KEYWORD_WEIGHT: f64 = 0.3;

/// Rough token estimate used by the context assembler
const CHARS_PER_TOKEN: usize = 4;

/// One retrieved chunk with its blended relevance score in [0, 1]
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub content: String,
    pub source: String,
    pub page: Option<u32>,
    pub score: f64,
    pub metadata: HashMap<String, String>,
}

/// Read-only search interface over the document index
pub struct Retriever {
    db: Database,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(db: Database, embedder: Arc<dyn Embedder>) -> Self {
        Self { db, embedder }
    }

    /// Number of indexed chunks
    pub fn count(&self) -> Result<usize> {
        self.db.count_chunks()
    }

    /// Underlying store handle (writer paths borrow it administratively)
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The embedding primitive this retriever queries with
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    /// Semantic search: cosine similarity mapped to [0, 1], filtered by
    /// metadata equality and a minimum score
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        filters: &[(String, String)],
        min_score: f64,
    ) -> Result<Vec<RetrievalResult>> {
        if k == 0 || !self.db.has_embeddings() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;

        let mut similarities: Vec<(i64, f64)> = self
            .db
            .all_embeddings()?
            .iter()
            .map(|(chunk_id, embedding)| {
                let sim = cosine_similarity(&query_embedding, embedding) as f64;
                (*chunk_id, (sim + 1.0) / 2.0)
            })
            .collect();

        similarities.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut results = Vec::new();
        for (chunk_id, score) in similarities {
            if results.len() >= k {
                break;
            }
            if score < min_score {
                // Scores are sorted descending, nothing below passes either
                break;
            }

            let chunk = self.db.get_chunk(chunk_id)?;
            let matches_filters = filters
                .iter()
                .all(|(key, value)| chunk.metadata.get(key) == Some(value));
            if !matches_filters {
                continue;
            }

            results.push(RetrievalResult {
                content: chunk.content,
                source: chunk.source,
                page: chunk.page,
                score,
                metadata: chunk.metadata,
            });
        }

        Ok(results)
    }

    /// Hybrid search: over-fetch semantically, reweight by keyword overlap,
    /// re-sort, truncate to k
    pub async fn hybrid_search(
        &self,
        query: &str,
        k: usize,
        keyword_weight: f64,
    ) -> Result<Vec<RetrievalResult>> {
        let candidates = self.search(query, k * 2, &[], 0.0).await?;
        Ok(rerank_by_keywords(candidates, query, keyword_weight, k))
    }

    /// Greedily assemble ranked chunks into a context block bounded by an
    /// estimated token budget (chars / 4). Chunks are never truncated
    /// mid-way; the first overflowing chunk and everything after it are
    /// dropped.
    pub async fn relevant_context(&self, query: &str, max_tokens: usize, k: usize) -> Result<String> {
        let results = self
            .hybrid_search(query, k, DEFAULT_KEYWORD_WEIGHT)
            .await?;

        let max_chars = max_tokens * CHARS_PER_TOKEN;
        let separator = "\n---\n";
        let mut parts: Vec<String> = Vec::new();
        let mut current_length = 0;

        for result in results {
            let mut header = format!("[Fonte: {}", result.source);
            if let Some(page) = result.page {
                header.push_str(&format!(", Página {}", page));
            }
            header.push(']');
            let block = format!("{}\n{}\n", header, result.content);

            let sep_len = if parts.is_empty() { 0 } else { separator.len() };
            if current_length + sep_len + block.len() > max_chars {
                break;
            }

            current_length += sep_len + block.len();
            parts.push(block);
        }

        Ok(parts.join(separator))
    }
}

/// Blend semantic scores with the fraction of query terms present in each
/// chunk, then stable-sort descending and truncate.
///
/// Pure function: the stable sort preserves the incoming order among equal
/// blended scores.
pub fn rerank_by_keywords(
    mut results: Vec<RetrievalResult>,
    query: &str,
    keyword_weight: f64,
    k: usize,
) -> Vec<RetrievalResult> {
    let query_terms: HashSet<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(String::from)
        .collect();

    if !query_terms.is_empty() {
        for result in &mut results {
            let content_terms: HashSet<String> = result
                .content
                .to_lowercase()
                .split_whitespace()
                .map(String::from)
                .collect();
            let overlap =
                query_terms.intersection(&content_terms).count() as f64 / query_terms.len() as f64;

            result.score = (1.0 - keyword_weight) * result.score + keyword_weight * overlap;
        }
    }

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(k);
    results
}
