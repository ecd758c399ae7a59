//! Model invocation layer
//!
//! Provider descriptors, the HTTP chat/embedding clients and the ordered
//! fallback invoker.

mod embedder;
pub mod image;
mod invoker;
mod provider;
mod traits;

pub use embedder::HttpEmbedder;
pub use self::image::{is_supported_image, ImageAttachment, JPEG_QUALITY, MAX_IMAGE_EDGE};
pub use invoker::{InvokeOutcome, ModelInvoker, FAILURE_PLACEHOLDER, NO_PROVIDER};
pub use provider::{HttpChatProvider, ImageEncoding, ProviderKind, ProviderSpec};
pub use traits::{ChatProvider, Embedder};

/// One chat request, provider-agnostic.
///
/// Temperature defaults low: conservative, repeatable output is preferred
/// over creativity for a quasi-clinical tool.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub images: Vec<ImageAttachment>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    /// Plain text request with the default budget and temperature
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            images: Vec::new(),
            max_tokens: 4000,
            temperature: 0.2,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_images(mut self, images: Vec<ImageAttachment>) -> Self {
        self.images = images;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}
