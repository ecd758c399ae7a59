//! Vision stage
//!
//! Validates and prepares case images, then walks the vision provider
//! chain for clinical observations.

use super::types::CaseInput;
use crate::config::Settings;
use crate::error::{Result, VetDxError};
use crate::llm::{
    is_supported_image, ChatProvider, ChatRequest, ImageAttachment, InvokeOutcome, ModelInvoker,
};
use std::sync::Arc;

/// Text substituted when a case carries no usable image
pub const NO_VALID_IMAGES: &str = "Nenhuma imagem válida fornecida.";

/// Outcome of the vision stage
#[derive(Debug, Clone)]
pub struct VisionAnalysis {
    pub text: String,
    pub images_analyzed: usize,
    pub model: Option<String>,
}

/// Vision provider chain wrapper
pub struct VisionAnalyzer {
    invoker: ModelInvoker,
}

impl VisionAnalyzer {
    pub fn new(invoker: ModelInvoker) -> Self {
        Self { invoker }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(ModelInvoker::vision_chain(settings)?))
    }

    /// Analyze the case images. Individual unreadable images are skipped;
    /// chain exhaustion is an error the orchestrator converts into a failed
    /// step.
    pub async fn analyze(
        &self,
        case: &CaseInput,
        preferred: Option<Arc<dyn ChatProvider>>,
    ) -> Result<VisionAnalysis> {
        let mut attachments = Vec::new();
        for path in &case.image_paths {
            if !path.exists() || !is_supported_image(path) {
                tracing::warn!("Skipping invalid image path: {}", path.display());
                continue;
            }
            match ImageAttachment::from_path(path) {
                Ok(attachment) => attachments.push(attachment),
                Err(e) => tracing::warn!("Failed to prepare {}: {}", path.display(), e),
            }
        }

        if attachments.is_empty() {
            return Ok(VisionAnalysis {
                text: NO_VALID_IMAGES.to_string(),
                images_analyzed: 0,
                model: None,
            });
        }

        let images_analyzed = attachments.len();
        let prompt = build_prompt(case);
        let request = ChatRequest::text(prompt)
            .with_images(attachments)
            .with_max_tokens(1500);

        match self.invoker.invoke(&request, preferred).await {
            InvokeOutcome::Success { text, provider } => Ok(VisionAnalysis {
                text,
                images_analyzed,
                model: Some(provider),
            }),
            InvokeOutcome::Exhausted => Err(VetDxError::Llm(
                "Vision provider chain exhausted".to_string(),
            )),
        }
    }
}

fn build_prompt(case: &CaseInput) -> String {
    format!(
        "És um veterinário experiente a analisar imagens clínicas.\n\n\
         **Informação do Animal:**\n\
         - Espécie: {}\n\
         - Raça: {}\n\
         - Idade: {}\n\
         - Peso: {}\n\n\
         **Sintomas Reportados:** {}\n\n\
         Analisa as imagens e descreve:\n\
         1. Observações visuais objetivas\n\
         2. Localização das alterações\n\
         3. Gravidade aparente (Leve/Moderada/Grave/Urgente)\n\n\
         Sê conciso e objetivo.",
        case.species, case.breed, case.age, case.weight, case.symptoms
    )
}
