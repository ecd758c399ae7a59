//! End-to-end pipeline tests
//!
//! All external collaborators (embedding service, web backends, model
//! providers) are stubbed through their trait seams; no network involved.

use async_trait::async_trait;
use std::sync::Arc;
use vetdx_core::error::Result;
use vetdx_core::pipeline::{NO_IMAGES_PROVIDED, VISION_FAILED};
use vetdx_core::websearch::SearchBackend;
use vetdx_core::{
    CaseInput, ChatProvider, ChatRequest, Database, Embedder, KnowledgeGatherer, ModelInvoker,
    Orchestrator, Retriever, Settings, StepStatus, Urgency, VetDxError, VisionAnalyzer, WebSearch,
    WebSearchResult,
};

/// Route pipeline logs through the env filter when a test run wants them
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

// ---------------------------------------------------------------- stubs

struct VocabEmbedder;

#[async_trait]
impl Embedder for VocabEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(["vomiting", "diarrhea", "cough", "skin"]
            .iter()
            .map(|term| lower.matches(term).count() as f32)
            .collect())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::new();
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn model_name(&self) -> &str {
        "vocab-test-embedder"
    }
}

struct StubBackend {
    results: Vec<WebSearchResult>,
}

impl StubBackend {
    fn with_two_results() -> Self {
        Self {
            results: vec![
                WebSearchResult {
                    title: "Canine gastroenteritis".to_string(),
                    url: "https://avma.org/gastro".to_string(),
                    snippet: "Vomiting and diarrhea management in dogs.".to_string(),
                    provider: "stub".to_string(),
                },
                WebSearchResult {
                    title: "Dietary indiscretion".to_string(),
                    url: "https://vin.com/diet".to_string(),
                    snippet: "Acute GI upset after garbage ingestion.".to_string(),
                    provider: "stub".to_string(),
                },
            ],
        }
    }

    fn failing() -> FailingBackend {
        FailingBackend
    }
}

#[async_trait]
impl SearchBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn search(&self, _query: &str, max: usize) -> Result<Vec<WebSearchResult>> {
        Ok(self.results.iter().take(max).cloned().collect())
    }
}

struct FailingBackend;

#[async_trait]
impl SearchBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn search(&self, _query: &str, _max: usize) -> Result<Vec<WebSearchResult>> {
        Err(VetDxError::Provider("network unreachable".to_string()))
    }
}

struct StaticProvider {
    id: String,
    reply: std::result::Result<String, String>,
}

impl StaticProvider {
    fn ok(id: &str, reply: &str) -> Arc<dyn ChatProvider> {
        Arc::new(Self {
            id: id.to_string(),
            reply: Ok(reply.to_string()),
        })
    }

    fn failing(id: &str) -> Arc<dyn ChatProvider> {
        Arc::new(Self {
            id: id.to_string(),
            reply: Err("HTTP 503".to_string()),
        })
    }
}

#[async_trait]
impl ChatProvider for StaticProvider {
    async fn invoke(&self, _request: &ChatRequest) -> Result<String> {
        self.reply.clone().map_err(VetDxError::Provider)
    }

    fn id(&self) -> &str {
        &self.id
    }
}

// ------------------------------------------------------------- assembly

fn empty_knowledge(web_backends: Vec<Arc<dyn SearchBackend>>) -> KnowledgeGatherer {
    let db = Database::open_in_memory().unwrap();
    db.initialize().unwrap();
    let retriever = Retriever::new(db, Arc::new(VocabEmbedder));
    KnowledgeGatherer::new(retriever, WebSearch::new(web_backends))
}

fn orchestrator(
    web_backends: Vec<Arc<dyn SearchBackend>>,
    vision_providers: Vec<Arc<dyn ChatProvider>>,
    text_providers: Vec<Arc<dyn ChatProvider>>,
) -> Orchestrator {
    Orchestrator::new(
        Settings::default(),
        VisionAnalyzer::new(ModelInvoker::new(vision_providers)),
        empty_knowledge(web_backends),
        ModelInvoker::new(text_providers),
    )
}

// ---------------------------------------------------------------- tests

#[tokio::test]
async fn test_end_to_end_example_with_failing_diagnosis_chain() {
    init_tracing();
    let mut orch = orchestrator(
        vec![Arc::new(StubBackend::with_two_results())],
        Vec::new(),
        vec![
            StaticProvider::failing("openrouter/a:free"),
            StaticProvider::failing("mistral/mistral-small-latest"),
        ],
    );

    let mut case = CaseInput::new("Dog", "vomiting and diarrhea for 2 days");
    case.urgency = Urgency::Routine;

    let run = orch.run_diagnosis(case, None, None).await;

    assert_eq!(run.steps.len(), 3);
    assert_eq!(run.steps[0].name, "vision_analysis");
    assert_eq!(run.steps[0].status, StepStatus::Skipped);
    assert_eq!(run.steps[1].name, "knowledge_gathering");
    assert_eq!(run.steps[1].status, StepStatus::Success);
    assert_eq!(run.steps[2].name, "diagnosis");
    assert_eq!(run.steps[2].status, StepStatus::Fallback);

    assert_eq!(run.visual_analysis, NO_IMAGES_PROVIDED);
    assert_eq!(run.knowledge.documents_found, 0);
    assert_eq!(run.knowledge.web_results, 2);

    // The contingency report always renders with the safety advice
    assert!(run.diagnosis.contains("Diagnóstico de Contingência"));
    assert!(run
        .diagnosis
        .contains("Consulte um médico veterinário presencialmente"));
}

#[tokio::test]
async fn test_pipeline_never_raises_when_everything_fails() {
    init_tracing();
    let mut orch = orchestrator(
        vec![Arc::new(StubBackend::failing())],
        Vec::new(),
        vec![StaticProvider::failing("openrouter/a:free")],
    );

    let case = CaseInput::new("Gato", "letargia e febre");
    let run = orch.run_diagnosis(case, None, None).await;

    assert!(!run.diagnosis.is_empty());
    assert_eq!(run.knowledge.web_results, 0);
    assert_eq!(run.steps[2].status, StepStatus::Fallback);
    assert_eq!(orch.history().len(), 1);
}

#[tokio::test]
async fn test_successful_diagnosis_records_winning_model() {
    let mut orch = orchestrator(
        vec![Arc::new(StubBackend::with_two_results())],
        Vec::new(),
        vec![
            StaticProvider::failing("openrouter/a:free"),
            StaticProvider::ok("mistral/mistral-small-latest", "1. Gastroenterite aguda (60%)"),
        ],
    );

    let case = CaseInput::new("Cão", "vómito e diarreia há 2 dias");
    let run = orch.run_diagnosis(case, None, None).await;

    assert_eq!(run.steps[2].status, StepStatus::Success);
    assert_eq!(
        run.steps[2].model.as_deref(),
        Some("mistral/mistral-small-latest")
    );
    assert!(run.diagnosis.contains("Gastroenterite"));
}

#[tokio::test]
async fn test_vision_step_succeeds_with_real_image() {
    let temp = tempfile::TempDir::new().unwrap();
    let image_path = temp.path().join("wound.png");
    image::RgbImage::from_pixel(64, 64, image::Rgb([180, 40, 40]))
        .save(&image_path)
        .unwrap();

    let mut orch = orchestrator(
        vec![Arc::new(StubBackend::with_two_results())],
        vec![StaticProvider::ok("gemini/gemini-2.5-flash", "Lesão eritematosa superficial.")],
        vec![StaticProvider::ok("openrouter/a:free", "Dermatite traumática provável.")],
    );

    let mut case = CaseInput::new("Cão", "ferida na pata com coceira");
    case.image_paths = vec![image_path];

    let run = orch.run_diagnosis(case, None, None).await;

    assert_eq!(run.steps[0].status, StepStatus::Success);
    assert_eq!(run.steps[0].model.as_deref(), Some("gemini/gemini-2.5-flash"));
    assert!(run.visual_analysis.contains("eritematosa"));
}

#[tokio::test]
async fn test_vision_chain_exhaustion_degrades_to_failed_step() {
    let temp = tempfile::TempDir::new().unwrap();
    let image_path = temp.path().join("wound.png");
    image::RgbImage::from_pixel(32, 32, image::Rgb([0, 0, 0]))
        .save(&image_path)
        .unwrap();

    let mut orch = orchestrator(
        vec![Arc::new(StubBackend::with_two_results())],
        vec![StaticProvider::failing("gemini/gemini-2.5-flash")],
        vec![StaticProvider::ok("openrouter/a:free", "Sem dados visuais.")],
    );

    let mut case = CaseInput::new("Cão", "ferida");
    case.image_paths = vec![image_path];

    let run = orch.run_diagnosis(case, None, None).await;

    assert_eq!(run.steps[0].status, StepStatus::Failed);
    assert_eq!(run.visual_analysis, VISION_FAILED);
    // Downstream stages still ran
    assert_eq!(run.steps[2].status, StepStatus::Success);
}

#[tokio::test]
async fn test_local_documents_flow_into_run_summary() {
    let db = Database::open_in_memory().unwrap();
    db.initialize().unwrap();

    let embedder = VocabEmbedder;
    let content = "Vomiting and diarrhea in dogs: rule out dietary indiscretion first.";
    let chunk = vetdx_core::DocumentChunk::new(content, "gastro.md", "seed");
    let embedding = embedder.embed(content).await.unwrap();
    db.insert_chunk(&chunk, "vocab-test-embedder", &embedding)
        .unwrap();

    let retriever = Retriever::new(db, Arc::new(VocabEmbedder));
    let knowledge = KnowledgeGatherer::new(
        retriever,
        WebSearch::new(vec![Arc::new(StubBackend::with_two_results())]),
    );

    let mut orch = Orchestrator::new(
        Settings::default(),
        VisionAnalyzer::new(ModelInvoker::new(Vec::new())),
        knowledge,
        ModelInvoker::new(vec![StaticProvider::ok("openrouter/a:free", "relatório")]),
    );

    let case = CaseInput::new("Cão", "vómito e diarreia");
    let run = orch.run_diagnosis(case, None, None).await;

    assert_eq!(run.steps[1].status, StepStatus::Success);
    assert!(run.knowledge.documents_found >= 1);
}

#[tokio::test]
async fn test_urgent_case_gets_emergency_banner_on_fallback() {
    let mut orch = orchestrator(
        vec![Arc::new(StubBackend::failing())],
        Vec::new(),
        vec![StaticProvider::failing("openrouter/a:free")],
    );

    let mut case = CaseInput::new("Cão", "convulsões contínuas");
    case.urgency = Urgency::Urgent;

    let run = orch.run_diagnosis(case, None, None).await;
    assert!(run.diagnosis.contains("CASO MARCADO COMO URGENTE"));
}

#[tokio::test]
async fn test_run_history_accumulates() {
    let mut orch = orchestrator(
        vec![Arc::new(StubBackend::with_two_results())],
        Vec::new(),
        vec![StaticProvider::ok("openrouter/a:free", "relatório")],
    );

    for _ in 0..3 {
        let case = CaseInput::new("Cão", "tosse");
        orch.run_diagnosis(case, None, None).await;
    }

    assert_eq!(orch.history().len(), 3);
    for run in orch.history() {
        assert_eq!(run.steps.len(), 3);
    }
}
