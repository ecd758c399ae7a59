//! Web search provider chain
//!
//! Backends are tried in order; any backend failure is swallowed and logged
//! so web search can never abort the pipeline. Results are cached per
//! `(query, max_results)` for the lifetime of the owning instance.

mod duckduckgo;

pub use duckduckgo::DuckDuckGoBackend;

use crate::config::Settings;
use crate::error::Result;
use crate::llm::{ChatRequest, InvokeOutcome, ModelInvoker};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Terms whose presence marks a query as already veterinary-scoped
const VET_TERMS: &[&str] = &[
    "veterinary",
    "veterinário",
    "vet",
    "animal",
    "dog",
    "cat",
    "diagnosis",
    "treatment",
];

/// Trusted-domain bias applied by [`WebSearch::search_veterinary`]
const VET_DOMAIN_BIAS: &str =
    "site:vetmed.edu OR site:avma.org OR site:vin.com OR veterinary medicine symptoms treatment";

/// One web search hit
#[derive(Debug, Clone, PartialEq)]
pub struct WebSearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub provider: String,
}

/// A pluggable search backend
#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebSearchResult>>;
}

/// Output shapes supported by [`format_results`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    Markdown,
    Plain,
}

/// Veterinary search outcome; `analysis` is absent whenever summarization
/// was disabled, unavailable or failed — callers must fall back to the raw
/// results
#[derive(Debug, Clone)]
pub struct VeterinarySearch {
    pub query: String,
    pub results: Vec<WebSearchResult>,
    pub analysis: Option<String>,
}

/// Ordered chain of search backends with an instance-owned result cache
pub struct WebSearch {
    backends: Vec<Arc<dyn SearchBackend>>,
    summarizer: Option<Arc<ModelInvoker>>,
    cache: Mutex<HashMap<(String, usize), Vec<WebSearchResult>>>,
}

impl WebSearch {
    pub fn new(backends: Vec<Arc<dyn SearchBackend>>) -> Self {
        Self {
            backends,
            summarizer: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a model invoker used for AI result briefs
    pub fn with_summarizer(mut self, summarizer: Arc<ModelInvoker>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Standard chain: DuckDuckGo primary, Gemini brief when a Google
    /// credential is configured
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let backend =
            DuckDuckGoBackend::new(Duration::from_secs(settings.search_timeout_secs))?;
        let mut chain = Self::new(vec![Arc::new(backend)]);

        if settings.google_api_key.is_some() {
            let provider = ModelInvoker::provider_for(settings, &settings.analysis_model.model)?;
            chain = chain.with_summarizer(Arc::new(ModelInvoker::new(vec![provider])));
        }

        Ok(chain)
    }

    /// Generic web search. Backend failures surface as an empty list, never
    /// an error.
    pub async fn search(&self, query: &str, max_results: usize) -> Vec<WebSearchResult> {
        let cache_key = (query.to_string(), max_results);
        if let Some(cached) = self.cache_guard().get(&cache_key) {
            tracing::debug!("Web search cache hit: {}", query);
            return cached.clone();
        }

        let effective_query = enrich_query(query);
        let mut results = Vec::new();

        for backend in &self.backends {
            match backend.search(&effective_query, max_results).await {
                Ok(found) if !found.is_empty() => {
                    tracing::debug!("{}: {} results for '{}'", backend.name(), found.len(), query);
                    results = found;
                    break;
                }
                Ok(_) => {
                    tracing::debug!("{}: no results for '{}'", backend.name(), query);
                }
                Err(e) => {
                    tracing::warn!("{} failed: {}", backend.name(), e);
                }
            }
        }

        self.cache_guard().insert(cache_key, results.clone());
        results
    }

    /// Veterinary-biased search with one simplified retry and an optional
    /// AI brief over the snippets
    pub async fn search_veterinary(
        &self,
        query: &str,
        max_results: usize,
        use_ai_analysis: bool,
    ) -> VeterinarySearch {
        let biased = format!("{} {}", query, VET_DOMAIN_BIAS);
        let mut results = self.search(&biased, max_results).await;

        if results.is_empty() {
            let simplified = format!("veterinary {}", query);
            results = self.search(&simplified, max_results).await;
        }

        let analysis = if use_ai_analysis && !results.is_empty() {
            self.analyze(query, &results).await
        } else {
            None
        };

        VeterinarySearch {
            query: query.to_string(),
            results,
            analysis,
        }
    }

    /// Snippet concatenation under a character budget, for prompt embedding
    pub async fn context_for_llm(&self, query: &str, max_chars: usize) -> String {
        let results = self.search(query, 5).await;
        let separator = "\n\n";

        let mut parts: Vec<String> = Vec::new();
        let mut current_length = 0;

        for r in results {
            let snippet = format!("[{}]: {}", r.title, r.snippet);
            let sep_len = if parts.is_empty() { 0 } else { separator.len() };
            if current_length + sep_len + snippet.len() > max_chars {
                break;
            }
            current_length += sep_len + snippet.len();
            parts.push(snippet);
        }

        parts.join(separator)
    }

    /// Summarize results into a structured brief. Failure degrades to `None`.
    async fn analyze(&self, query: &str, results: &[WebSearchResult]) -> Option<String> {
        let summarizer = self.summarizer.as_ref()?;

        let results_text = results
            .iter()
            .map(|r| format!("**{}**\n{}\nFonte: {}", r.title, r.snippet, r.url))
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Analisa os seguintes resultados de pesquisa sobre \"{}\" e fornece um resumo \
             conciso das informações mais relevantes para um veterinário.\n\n{}\n\n\
             Fornece um resumo estruturado com:\n\
             1. Informações principais\n\
             2. Dados relevantes para diagnóstico\n\
             3. Fontes mais confiáveis",
            query, results_text
        );

        match summarizer.invoke(&ChatRequest::text(prompt), None).await {
            InvokeOutcome::Success { text, .. } => Some(text),
            InvokeOutcome::Exhausted => {
                tracing::warn!("Result analysis failed, returning raw results only");
                None
            }
        }
    }

    fn cache_guard(&self) -> MutexGuard<'_, HashMap<(String, usize), Vec<WebSearchResult>>> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Add veterinary scope to queries that lack it
fn enrich_query(query: &str) -> String {
    let lower = query.to_lowercase();
    let has_vet_term = VET_TERMS.iter().any(|term| lower.contains(term));
    if has_vet_term {
        query.to_string()
    } else {
        format!("veterinary {} symptoms treatment", query)
    }
}

/// Render results for downstream report assembly. Pure function of the list.
pub fn format_results(results: &[WebSearchResult], format: ResultFormat) -> String {
    if results.is_empty() {
        return "Nenhum resultado encontrado.".to_string();
    }

    let mut lines = Vec::new();
    match format {
        ResultFormat::Markdown => {
            for (i, r) in results.iter().enumerate() {
                lines.push(format!("### {}. {}", i + 1, r.title));
                lines.push(r.snippet.clone());
                lines.push(format!("*Fonte: [{}]({})*\n", r.url, r.url));
            }
        }
        ResultFormat::Plain => {
            for (i, r) in results.iter().enumerate() {
                lines.push(format!("{}. {}", i + 1, r.title));
                lines.push(format!("   {}", r.snippet));
                lines.push(format!("   Fonte: {}\n", r.url));
            }
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VetDxError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubBackend {
        results: Vec<WebSearchResult>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubBackend {
        fn with_results(results: Vec<WebSearchResult>) -> Self {
            Self {
                results,
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                results: Vec::new(),
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl SearchBackend for StubBackend {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn search(&self, _query: &str, max: usize) -> Result<Vec<WebSearchResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(VetDxError::Provider("quota exceeded".to_string()));
            }
            Ok(self.results.iter().take(max).cloned().collect())
        }
    }

    fn hit(title: &str) -> WebSearchResult {
        WebSearchResult {
            title: title.to_string(),
            url: format!("https://example.org/{}", title),
            snippet: format!("snippet for {}", title),
            provider: "stub".to_string(),
        }
    }

    #[test]
    fn test_enrich_query_adds_vet_scope() {
        assert_eq!(
            enrich_query("limping after jump"),
            "veterinary limping after jump symptoms treatment"
        );
        assert_eq!(enrich_query("dog limping"), "dog limping");
    }

    #[test]
    fn test_format_results_markdown_and_plain() {
        let results = vec![hit("parvo")];
        let md = format_results(&results, ResultFormat::Markdown);
        assert!(md.contains("### 1. parvo"));
        assert!(md.contains("*Fonte:"));

        let plain = format_results(&results, ResultFormat::Plain);
        assert!(plain.contains("1. parvo"));
        assert!(!plain.contains("###"));
    }

    #[test]
    fn test_format_results_empty() {
        assert_eq!(
            format_results(&[], ResultFormat::Markdown),
            "Nenhum resultado encontrado."
        );
    }

    #[tokio::test]
    async fn test_search_caches_by_query_and_count() {
        let backend = Arc::new(StubBackend::with_results(vec![hit("a"), hit("b")]));
        let chain = WebSearch::new(vec![backend.clone()]);

        let first = chain.search("dog emesis", 2).await;
        let second = chain.search("dog emesis", 2).await;
        assert_eq!(first, second);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        // Different count is a different cache entry
        let _ = chain.search("dog emesis", 1).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_backend_failure_yields_empty_list() {
        let chain = WebSearch::new(vec![Arc::new(StubBackend::failing())]);
        let results = chain.search("dog emesis", 3).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_failing_backend_falls_back_to_next() {
        let chain = WebSearch::new(vec![
            Arc::new(StubBackend::failing()) as Arc<dyn SearchBackend>,
            Arc::new(StubBackend::with_results(vec![hit("rescued")])),
        ]);
        let results = chain.search("dog emesis", 3).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "rescued");
    }

    #[tokio::test]
    async fn test_search_veterinary_analysis_absent_without_summarizer() {
        let chain = WebSearch::new(vec![Arc::new(StubBackend::with_results(vec![hit("a")]))]);
        let outcome = chain.search_veterinary("dog emesis", 3, true).await;
        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.analysis.is_none());
    }
}
