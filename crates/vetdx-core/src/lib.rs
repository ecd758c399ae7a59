//! VetDx Core Library
//!
//! Veterinary diagnostic assistance: hybrid retrieval over a local document
//! corpus, web search with provider fallback, and multi-provider model
//! invocation orchestrated per case.
//!
//! # Features
//! - Incremental document ingestion with content-hash deduplication
//! - Semantic + keyword hybrid search over a persistent vector index
//! - Web search chain with domain biasing and optional AI briefs
//! - Ordered provider fallback (free pool → paid backups) for text and vision
//! - Urgency-budgeted pipeline that always returns a complete report

pub mod config;
pub mod db;
pub mod error;
pub mod index;
pub mod llm;
pub mod pipeline;
pub mod retrieval;
pub mod websearch;

pub use config::{EmbeddingServiceConfig, ModelRef, Settings};
pub use db::{Database, DocumentChunk};
pub use error::{Error, Result, VetDxError};
pub use index::{split_text, IngestStats, Ingestor};
pub use llm::{
    ChatProvider, ChatRequest, Embedder, HttpChatProvider, HttpEmbedder, ImageAttachment,
    InvokeOutcome, ModelInvoker, ProviderKind, ProviderSpec, FAILURE_PLACEHOLDER, NO_PROVIDER,
};
pub use pipeline::{
    CaseInput, KnowledgeGatherer, Orchestrator, PipelineRun, StepRecord, StepStatus, Urgency,
    UrgencyProfile, VisionAnalyzer,
};
pub use retrieval::{RetrievalResult, Retriever};
pub use websearch::{
    format_results, DuckDuckGoBackend, ResultFormat, SearchBackend, VeterinarySearch, WebSearch,
    WebSearchResult,
};

/// Default cache directory name
pub const CACHE_DIR_NAME: &str = "vetdx";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "vetdx";
