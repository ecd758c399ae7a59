//! Configuration management
//!
//! All credentials, model identifiers and filesystem paths are resolved once
//! per process start and treated as read-only by the pipeline.

use crate::error::Result;
use crate::llm::ProviderKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A model bound to the provider that serves it.
///
/// The provider is fixed at configuration time so nothing downstream has to
/// guess a provider from the shape of a model name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider: ProviderKind,
    pub model: String,
}

impl ModelRef {
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// OpenRouter API key (free-tier text and vision pool)
    #[serde(default = "env_openrouter_key")]
    pub openrouter_api_key: Option<String>,

    /// Google AI API key (Gemini text, vision and web-result analysis)
    #[serde(default = "env_google_key")]
    pub google_api_key: Option<String>,

    /// Mistral API key (paid backup, Pixtral vision)
    #[serde(default = "env_mistral_key")]
    pub mistral_api_key: Option<String>,

    /// Primary text model for clinical reasoning
    #[serde(default = "default_llm_model")]
    pub llm_model: ModelRef,

    /// Ordered free-tier text pool tried before the paid backups
    #[serde(default = "default_free_pool")]
    pub llm_free_pool: Vec<ModelRef>,

    /// Paid/backup text providers, tried in order after the free pool
    #[serde(default = "default_llm_backups")]
    pub llm_backups: Vec<ModelRef>,

    /// Ordered vision chain (primary first)
    #[serde(default = "default_vision_chain")]
    pub vision_chain: Vec<ModelRef>,

    /// Model used to summarize web results into a brief
    #[serde(default = "default_analysis_model")]
    pub analysis_model: ModelRef,

    /// Embedding service (OpenAI-compatible /v1/embeddings)
    #[serde(default)]
    pub embedding: EmbeddingServiceConfig,

    /// SQLite index location
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Directory scanned by administrative ingestion
    #[serde(default = "default_docs_path")]
    pub docs_path: PathBuf,

    /// Per-request timeout for model provider calls, seconds
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,

    /// Per-request timeout for web search backends, seconds
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,
}

/// Embedding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingServiceConfig {
    /// Base URL of the embeddings service
    pub url: String,

    /// Model name sent in embedding requests
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimensions (defaults to 384 when unspecified)
    #[serde(default)]
    pub dimensions: Option<usize>,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("VETDX_EMBEDDING_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            model: default_embedding_model(),
            dimensions: std::env::var("VETDX_EMBEDDING_DIMS")
                .ok()
                .and_then(|s| s.parse().ok()),
            api_key: std::env::var("VETDX_EMBEDDING_API_KEY").ok(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openrouter_api_key: env_openrouter_key(),
            google_api_key: env_google_key(),
            mistral_api_key: env_mistral_key(),
            llm_model: default_llm_model(),
            llm_free_pool: default_free_pool(),
            llm_backups: default_llm_backups(),
            vision_chain: default_vision_chain(),
            analysis_model: default_analysis_model(),
            embedding: EmbeddingServiceConfig::default(),
            index_path: default_index_path(),
            docs_path: default_docs_path(),
            provider_timeout_secs: default_provider_timeout(),
            search_timeout_secs: default_search_timeout(),
        }
    }
}

impl Settings {
    /// Load settings from the default config path, falling back to
    /// environment-derived defaults when no file exists
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let settings: Settings = serde_yaml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// API key for a given provider, if configured
    pub fn api_key_for(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::OpenRouter => self.openrouter_api_key.as_deref(),
            ProviderKind::Gemini => self.google_api_key.as_deref(),
            ProviderKind::Mistral => self.mistral_api_key.as_deref(),
        }
    }

    /// Resolve a caller-supplied model identifier against the configured
    /// model inventory.
    ///
    /// Unknown identifiers resolve to OpenRouter, which serves arbitrary
    /// `vendor/model` identifiers.
    pub fn resolve_model(&self, model: &str) -> ModelRef {
        let known = std::iter::once(&self.llm_model)
            .chain(self.llm_free_pool.iter())
            .chain(self.llm_backups.iter())
            .chain(self.vision_chain.iter())
            .chain(std::iter::once(&self.analysis_model));

        for candidate in known {
            if candidate.model == model {
                return candidate.clone();
            }
        }

        ModelRef::new(ProviderKind::OpenRouter, model)
    }
}

fn env_openrouter_key() -> Option<String> {
    std::env::var("OPENROUTER_API_KEY").ok().filter(|k| !k.is_empty())
}

fn env_google_key() -> Option<String> {
    std::env::var("GOOGLE_API_KEY").ok().filter(|k| !k.is_empty())
}

fn env_mistral_key() -> Option<String> {
    std::env::var("MISTRAL_API_KEY").ok().filter(|k| !k.is_empty())
}

fn default_llm_model() -> ModelRef {
    let model =
        std::env::var("VETDX_LLM_MODEL").unwrap_or_else(|_| "gemini-2.5-pro".to_string());
    ModelRef::new(ProviderKind::Gemini, model)
}

fn default_free_pool() -> Vec<ModelRef> {
    [
        "x-ai/grok-4.1-fast:free",
        "google/gemma-3-27b-it:free",
        "tngtech/deepseek-r1t-chimera:free",
        "z-ai/glm-4.5-air:free",
    ]
    .iter()
    .map(|m| ModelRef::new(ProviderKind::OpenRouter, *m))
    .collect()
}

fn default_llm_backups() -> Vec<ModelRef> {
    vec![
        ModelRef::new(
            ProviderKind::Mistral,
            std::env::var("VETDX_LLM_BACKUP")
                .unwrap_or_else(|_| "mistral-small-latest".to_string()),
        ),
        default_llm_model(),
    ]
}

fn default_vision_chain() -> Vec<ModelRef> {
    vec![
        ModelRef::new(
            ProviderKind::Gemini,
            std::env::var("VETDX_VLM_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
        ),
        ModelRef::new(ProviderKind::OpenRouter, "qwen/qwen2.5-vl-72b-instruct:free"),
        ModelRef::new(ProviderKind::Mistral, "mistralai/pixtral-12b:free"),
        ModelRef::new(ProviderKind::Gemini, "gemini-2.5-flash-lite"),
    ]
}

fn default_analysis_model() -> ModelRef {
    ModelRef::new(ProviderKind::Gemini, "gemini-2.0-flash")
}

fn default_embedding_model() -> String {
    std::env::var("VETDX_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "sentence-transformers/all-MiniLM-L6-v2".to_string())
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_index_path() -> PathBuf {
    std::env::var("VETDX_INDEX_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(crate::CACHE_DIR_NAME)
                .join("index.sqlite")
        })
}

fn default_docs_path() -> PathBuf {
    std::env::var("VETDX_DOCS_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./knowledge_base/documents"))
}

fn default_provider_timeout() -> u64 {
    60
}

fn default_search_timeout() -> u64 {
    30
}
