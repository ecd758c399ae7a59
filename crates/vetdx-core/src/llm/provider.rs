//! Provider descriptors and the HTTP chat provider
//!
//! Each external backend is described by a [`ProviderSpec`] resolved at
//! configuration time: endpoint family, model, credential, request timeout
//! and image encoding. Call sites never inspect model-name strings.

use crate::config::{ModelRef, Settings};
use crate::error::{Result, VetDxError};
use crate::llm::{ChatProvider, ChatRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
const MISTRAL_ENDPOINT: &str = "https://api.mistral.ai/v1/chat/completions";
const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// External provider family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenRouter,
    Mistral,
    Gemini,
}

impl ProviderKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::Mistral => "mistral",
            Self::Gemini => "gemini",
        }
    }

    /// Wire encoding used for image attachments
    pub fn image_encoding(self) -> ImageEncoding {
        match self {
            Self::Gemini => ImageEncoding::InlineData,
            Self::OpenRouter | Self::Mistral => ImageEncoding::DataUrl,
        }
    }
}

/// How image attachments are embedded in the request body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    /// `image_url` content blocks carrying a data URL (OpenAI family)
    DataUrl,
    /// `inline_data` parts carrying raw base64 (Gemini)
    InlineData,
}

/// Capability descriptor for one provider + model pair
#[derive(Debug, Clone)]
pub struct ProviderSpec {
    pub kind: ProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub image_encoding: ImageEncoding,
}

impl ProviderSpec {
    /// Resolve a configured model reference into a full descriptor
    pub fn from_model_ref(model_ref: &ModelRef, settings: &Settings) -> Self {
        Self {
            kind: model_ref.provider,
            model: model_ref.model.clone(),
            api_key: settings.api_key_for(model_ref.provider).map(String::from),
            timeout: Duration::from_secs(settings.provider_timeout_secs),
            image_encoding: model_ref.provider.image_encoding(),
        }
    }

    /// Audit tag, e.g. `mistral/mistral-small-latest`
    pub fn tag(&self) -> String {
        format!("{}/{}", self.kind.label(), self.model)
    }
}

/// HTTP implementation of [`ChatProvider`] for all configured families
pub struct HttpChatProvider {
    client: reqwest::Client,
    spec: ProviderSpec,
    id: String,
}

impl HttpChatProvider {
    pub fn new(spec: ProviderSpec) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(spec.timeout)
            .build()
            .map_err(VetDxError::Http)?;
        let id = spec.tag();
        Ok(Self { client, spec, id })
    }

    fn api_key(&self) -> Result<&str> {
        self.spec.api_key.as_deref().ok_or_else(|| {
            VetDxError::Config(format!(
                "No API key configured for provider {}",
                self.spec.kind.label()
            ))
        })
    }

    /// OpenAI-compatible chat completion (OpenRouter, Mistral)
    async fn invoke_openai_family(&self, request: &ChatRequest) -> Result<String> {
        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChoiceMessage,
        }

        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: String,
        }

        let user_content = if request.images.is_empty() {
            json!(request.prompt)
        } else {
            let mut blocks: Vec<serde_json::Value> = request
                .images
                .iter()
                .map(|img| json!({"type": "image_url", "image_url": {"url": img.data_url()}}))
                .collect();
            blocks.push(json!({"type": "text", "text": request.prompt}));
            json!(blocks)
        };

        let mut messages = Vec::new();
        if let Some(ref system) = request.system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": user_content}));

        let body = json!({
            "model": self.spec.model,
            "messages": messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let endpoint = match self.spec.kind {
            ProviderKind::OpenRouter => OPENROUTER_ENDPOINT,
            ProviderKind::Mistral => MISTRAL_ENDPOINT,
            ProviderKind::Gemini => unreachable!("gemini uses invoke_gemini"),
        };

        let mut req = self
            .client
            .post(endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key()?))
            .json(&body);

        if self.spec.kind == ProviderKind::OpenRouter {
            req = req
                .header("HTTP-Referer", "http://localhost")
                .header("X-Title", "VetDx");
        }

        let response = req.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VetDxError::Provider(format!(
                "{} error (HTTP {}): {}",
                self.spec.kind.label(),
                status,
                truncate(&body, 200)
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| VetDxError::Llm(format!("Empty response from {}", self.id)))
    }

    /// Gemini generateContent
    async fn invoke_gemini(&self, request: &ChatRequest) -> Result<String> {
        #[derive(Deserialize)]
        struct GeminiResponse {
            candidates: Option<Vec<Candidate>>,
        }

        #[derive(Deserialize)]
        struct Candidate {
            content: Option<CandidateContent>,
            #[serde(rename = "finishReason")]
            finish_reason: Option<String>,
        }

        #[derive(Deserialize)]
        struct CandidateContent {
            parts: Option<Vec<Part>>,
        }

        #[derive(Deserialize)]
        struct Part {
            text: Option<String>,
        }

        let text = match request.system {
            Some(ref system) => format!("{}\n\n{}", system, request.prompt),
            None => request.prompt.clone(),
        };

        let mut parts = vec![json!({"text": text})];
        for img in &request.images {
            parts.push(json!({
                "inline_data": {"mime_type": img.mime_type, "data": img.base64}
            }));
        }

        let body = json!({
            "contents": [{"parts": parts}],
            "generationConfig": {
                "maxOutputTokens": request.max_tokens,
                "temperature": request.temperature,
            }
        });

        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_ENDPOINT,
            self.spec.model,
            self.api_key()?
        );

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VetDxError::Provider(format!(
                "gemini error (HTTP {}): {}",
                status,
                truncate(&body, 200)
            )));
        }

        let parsed: GeminiResponse = response.json().await?;
        let candidate = parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| VetDxError::Llm(format!("Empty response from {}", self.id)))?;

        let text = candidate
            .content
            .and_then(|c| c.parts)
            .and_then(|p| p.into_iter().next())
            .and_then(|p| p.text);

        match text {
            Some(text) => Ok(text),
            None => Err(VetDxError::Llm(format!(
                "Response from {} had no text (finish reason: {})",
                self.id,
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ))),
        }
    }
}

#[async_trait]
impl ChatProvider for HttpChatProvider {
    async fn invoke(&self, request: &ChatRequest) -> Result<String> {
        match self.spec.kind {
            ProviderKind::Gemini => self.invoke_gemini(request).await,
            ProviderKind::OpenRouter | ProviderKind::Mistral => {
                self.invoke_openai_family(request).await
            }
        }
    }

    fn id(&self) -> &str {
        &self.id
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
