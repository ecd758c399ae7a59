//! Case orchestrator
//!
//! Sequences vision → knowledge → diagnosis under urgency-derived budgets.
//! Every stage failure degrades to a recorded step and substituted content;
//! `run_diagnosis` always returns a complete [`PipelineRun`].

use super::diagnosis::{build_prompt, fallback_report, SYSTEM_PROMPT};
use super::knowledge::{KnowledgeBundle, KnowledgeGatherer};
use super::query::{build_query, QueryFocus};
use super::types::{
    CaseInput, KnowledgeSummary, PipelineRun, StepRecord, StepStatus, UrgencyProfile,
};
use super::vision::VisionAnalyzer;
use crate::config::Settings;
use crate::db::Database;
use crate::error::Result;
use crate::index::Ingestor;
use crate::llm::{ChatProvider, ChatRequest, HttpEmbedder, InvokeOutcome, ModelInvoker};
use crate::retrieval::Retriever;
use crate::websearch::WebSearch;
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Text substituted when the case carries no image references
pub const NO_IMAGES_PROVIDED: &str = "Nenhuma imagem fornecida";

/// Marker substituted when the vision stage fails
pub const VISION_FAILED: &str = "Erro na análise de imagem";

const STEP_VISION: &str = "vision_analysis";
const STEP_KNOWLEDGE: &str = "knowledge_gathering";
const STEP_DIAGNOSIS: &str = "diagnosis";

/// Coordinates the diagnostic pipeline and owns the run history
pub struct Orchestrator {
    settings: Settings,
    vision: VisionAnalyzer,
    knowledge: KnowledgeGatherer,
    invoker: ModelInvoker,
    history: Vec<PipelineRun>,
}

impl Orchestrator {
    /// Assemble from explicit components (tests inject stubs here)
    pub fn new(
        settings: Settings,
        vision: VisionAnalyzer,
        knowledge: KnowledgeGatherer,
        invoker: ModelInvoker,
    ) -> Self {
        Self {
            settings,
            vision,
            knowledge,
            invoker,
            history: Vec::new(),
        }
    }

    /// Standard assembly: persistent index, HTTP embedder, DuckDuckGo chain
    /// and the configured provider chains
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let db = Database::open(&settings.index_path)?;
        db.initialize()?;

        let embedder = Arc::new(HttpEmbedder::new(settings.embedding.clone())?);
        let retriever = Retriever::new(db, embedder);
        let web = WebSearch::from_settings(&settings)?;
        let knowledge = KnowledgeGatherer::new(retriever, web);
        let vision = VisionAnalyzer::from_settings(&settings)?;
        let invoker = ModelInvoker::text_chain(&settings)?;

        Ok(Self::new(settings, vision, knowledge, invoker))
    }

    /// Completed runs, oldest first
    pub fn history(&self) -> &[PipelineRun] {
        &self.history
    }

    /// Run the full diagnostic pipeline for one case.
    ///
    /// Never fails: stage errors become step statuses and the diagnosis
    /// falls back to the deterministic contingency report.
    pub async fn run_diagnosis(
        &mut self,
        case: CaseInput,
        vision_model: Option<&str>,
        text_model: Option<&str>,
    ) -> PipelineRun {
        let run_start = Instant::now();
        let profile = UrgencyProfile::for_urgency(case.urgency);

        tracing::info!(
            "Starting diagnosis [{}] {} - {} - {}",
            case.urgency.as_str(),
            case.species,
            case.breed,
            case.age
        );

        let mut steps: Vec<StepRecord> = Vec::new();

        // Step 1: vision
        let visual_analysis = self
            .run_vision_step(&case, &profile, vision_model, &mut steps)
            .await;

        // Step 2: knowledge
        let bundle = self
            .run_knowledge_step(&case, &profile, &visual_analysis, &mut steps)
            .await;

        // Step 3: diagnosis
        let diagnosis = self
            .run_diagnosis_step(&case, &profile, &visual_analysis, &bundle, text_model, &mut steps)
            .await;

        let total_ms = run_start.elapsed().as_millis() as u64;
        tracing::info!("Diagnosis complete in {}ms", total_ms);

        let run = PipelineRun {
            timestamp: Utc::now(),
            knowledge: KnowledgeSummary {
                documents_found: bundle.local_documents.len(),
                web_results: bundle.web_results,
                web_chars: bundle.web_summary.len(),
            },
            case,
            steps,
            visual_analysis,
            diagnosis,
            total_ms,
        };

        self.history.push(run.clone());
        run
    }

    async fn run_vision_step(
        &self,
        case: &CaseInput,
        profile: &UrgencyProfile,
        vision_model: Option<&str>,
        steps: &mut Vec<StepRecord>,
    ) -> String {
        let started = Instant::now();

        if case.image_paths.is_empty() {
            steps.push(StepRecord::new(STEP_VISION, StepStatus::Skipped, 0));
            return NO_IMAGES_PROVIDED.to_string();
        }

        let preferred = self.preferred_provider(vision_model);
        let outcome =
            tokio::time::timeout(profile.vision_timeout, self.vision.analyze(case, preferred))
                .await;

        let elapsed = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(Ok(analysis)) => {
                tracing::info!(
                    "Analyzed {} images ({}ms)",
                    analysis.images_analyzed,
                    elapsed
                );
                let mut record = StepRecord::new(STEP_VISION, StepStatus::Success, elapsed);
                if let Some(ref model) = analysis.model {
                    record = record.with_model(model.clone());
                }
                steps.push(record);
                analysis.text
            }
            Ok(Err(e)) => {
                tracing::warn!("Vision stage failed: {}", e);
                steps.push(
                    StepRecord::new(STEP_VISION, StepStatus::Failed, elapsed)
                        .with_error(e.to_string()),
                );
                VISION_FAILED.to_string()
            }
            Err(_) => {
                tracing::warn!("Vision stage timed out");
                steps.push(
                    StepRecord::new(STEP_VISION, StepStatus::Failed, elapsed)
                        .with_error("vision analysis timed out"),
                );
                VISION_FAILED.to_string()
            }
        }
    }

    async fn run_knowledge_step(
        &self,
        case: &CaseInput,
        profile: &UrgencyProfile,
        visual_analysis: &str,
        steps: &mut Vec<StepRecord>,
    ) -> KnowledgeBundle {
        let started = Instant::now();

        let focus = QueryFocus::for_urgency(case.urgency);
        let query = build_query(case, focus);
        tracing::debug!("Knowledge query: {}", query);

        let outcome = tokio::time::timeout(
            profile.knowledge_timeout,
            self.knowledge.gather(&query, visual_analysis, profile),
        )
        .await;

        let elapsed = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(Ok(bundle)) => {
                tracing::info!(
                    "Local docs: {} | web: {} results ({}ms)",
                    bundle.local_documents.len(),
                    bundle.web_results,
                    elapsed
                );
                steps.push(StepRecord::new(STEP_KNOWLEDGE, StepStatus::Success, elapsed));
                bundle
            }
            Ok(Err(e)) => {
                tracing::warn!("Knowledge stage failed: {}", e);
                steps.push(
                    StepRecord::new(STEP_KNOWLEDGE, StepStatus::Failed, elapsed)
                        .with_error(e.to_string()),
                );
                KnowledgeBundle::default()
            }
            Err(_) => {
                tracing::warn!("Knowledge stage timed out");
                steps.push(
                    StepRecord::new(STEP_KNOWLEDGE, StepStatus::Failed, elapsed)
                        .with_error("knowledge gathering timed out"),
                );
                KnowledgeBundle::default()
            }
        }
    }

    async fn run_diagnosis_step(
        &self,
        case: &CaseInput,
        profile: &UrgencyProfile,
        visual_analysis: &str,
        bundle: &KnowledgeBundle,
        text_model: Option<&str>,
        steps: &mut Vec<StepRecord>,
    ) -> String {
        let started = Instant::now();

        let prompt = build_prompt(case, visual_analysis, bundle);
        let request = ChatRequest::text(prompt).with_system(SYSTEM_PROMPT);
        let preferred = self.preferred_provider(text_model);

        let outcome = tokio::time::timeout(
            profile.diagnosis_timeout,
            self.invoker.invoke(&request, preferred),
        )
        .await;

        let elapsed = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(InvokeOutcome::Success { text, provider }) => {
                tracing::info!("Diagnosis generated by {} ({}ms)", provider, elapsed);
                steps.push(
                    StepRecord::new(STEP_DIAGNOSIS, StepStatus::Success, elapsed)
                        .with_model(provider),
                );
                text
            }
            Ok(InvokeOutcome::Exhausted) => {
                tracing::warn!("Diagnosis chain exhausted, using contingency report");
                steps.push(
                    StepRecord::new(STEP_DIAGNOSIS, StepStatus::Fallback, elapsed)
                        .with_error("all providers exhausted"),
                );
                fallback_report(case)
            }
            Err(_) => {
                tracing::warn!("Diagnosis stage timed out, using contingency report");
                steps.push(
                    StepRecord::new(STEP_DIAGNOSIS, StepStatus::Fallback, elapsed)
                        .with_error("diagnosis timed out"),
                );
                fallback_report(case)
            }
        }
    }

    /// Resolve an explicitly requested model into a provider; resolution
    /// problems are logged and fall back to the configured chain
    fn preferred_provider(&self, model: Option<&str>) -> Option<Arc<dyn ChatProvider>> {
        let model = model?;
        match ModelInvoker::provider_for(&self.settings, model) {
            Ok(provider) => Some(provider),
            Err(e) => {
                tracing::warn!("Cannot build provider for '{}': {}", model, e);
                None
            }
        }
    }

    /// Append a resolved case to the knowledge base for future retrieval
    pub async fn archive_case(&self, case_summary: &str, diagnosis: &str) -> Result<usize> {
        let content = format!(
            "## Caso Clínico\n\n### Resumo\n{}\n\n### Diagnóstico\n{}\n",
            case_summary, diagnosis
        );

        let cache_dir = self
            .settings
            .index_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        let retriever = self.knowledge.retriever();
        let embedder = retriever.embedder();
        let mut ingestor = Ingestor::new(retriever.database(), embedder.as_ref(), &cache_dir)?;

        let mut metadata = HashMap::new();
        metadata.insert("type".to_string(), "case_study".to_string());
        ingestor
            .add_document(&content, metadata, "casos_clinicos")
            .await
    }
}
