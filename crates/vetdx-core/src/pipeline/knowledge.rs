//! Knowledge stage
//!
//! Combines local retrieval with the web search chain. Retrieval is skipped
//! outright when the store is empty; web search failure degrades to an
//! empty contribution.

use super::types::UrgencyProfile;
use crate::error::Result;
use crate::retrieval::{RetrievalResult, Retriever, DEFAULT_KEYWORD_WEIGHT};
use crate::websearch::{format_results, ResultFormat, WebSearch};

/// Local documents fed into the diagnosis prompt
const LOCAL_DOCS_K: usize = 3;

/// Token budget for the assembled local context
const LOCAL_CONTEXT_TOKENS: usize = 1000;

/// Visual observations appended to the retrieval query are capped here
const VISUAL_HINT_CHARS: usize = 200;

/// What the knowledge stage gathered
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBundle {
    pub local_documents: Vec<RetrievalResult>,
    pub local_context: String,
    pub web_summary: String,
    pub web_results: usize,
    pub query_used: String,
}

/// Knowledge gathering over the local index and the web chain
pub struct KnowledgeGatherer {
    retriever: Retriever,
    web: WebSearch,
}

impl KnowledgeGatherer {
    pub fn new(retriever: Retriever, web: WebSearch) -> Self {
        Self { retriever, web }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Gather supporting evidence for a query, enriched with the visual
    /// observations
    pub async fn gather(
        &self,
        query: &str,
        visual_analysis: &str,
        profile: &UrgencyProfile,
    ) -> Result<KnowledgeBundle> {
        let enriched_query = format!(
            "{}. Observações: {}",
            query,
            truncate_chars(visual_analysis, VISUAL_HINT_CHARS)
        );

        let mut bundle = KnowledgeBundle {
            query_used: enriched_query.clone(),
            ..Default::default()
        };

        // Local retrieval: explicit short-circuit on an empty store
        let indexed = self.retriever.count()?;
        if indexed > 0 {
            bundle.local_documents = self
                .retriever
                .hybrid_search(&enriched_query, LOCAL_DOCS_K, DEFAULT_KEYWORD_WEIGHT)
                .await?;
            bundle.local_context = self
                .retriever
                .relevant_context(&enriched_query, LOCAL_CONTEXT_TOKENS, 10)
                .await?;
            tracing::debug!(
                "Local retrieval: {} documents for '{}'",
                bundle.local_documents.len(),
                query
            );
        } else {
            tracing::debug!("Local retrieval skipped: store is empty");
        }

        // Web search: the AI brief only when the profile allows detailed
        // research
        if profile.detailed_research {
            let vet = self
                .web
                .search_veterinary(query, profile.max_web_results, true)
                .await;
            bundle.web_results = vet.results.len();
            if !vet.results.is_empty() {
                bundle.web_summary = vet
                    .analysis
                    .unwrap_or_else(|| format_results(&vet.results, ResultFormat::Markdown));
            }
        } else {
            let results = self.web.search(query, profile.max_web_results).await;
            bundle.web_results = results.len();
            if !results.is_empty() {
                bundle.web_summary = format_results(&results, ResultFormat::Plain);
            }
        }

        tracing::debug!(
            "Knowledge gathered: {} local docs, {} web results",
            bundle.local_documents.len(),
            bundle.web_results
        );

        Ok(bundle)
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
