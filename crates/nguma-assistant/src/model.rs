use futures_util::future::BoxFuture;

use crate::error::ModelError;

/// Sampling settings for a single generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl GenerationRequest {
    pub fn new(prompt: String) -> Self {
        Self {
            prompt,
            temperature: 0.8,
            max_output_tokens: 1000,
            top_p: 0.95,
            top_k: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    /// The provider stopped because it hit the output token limit.
    pub truncated: bool,
}

/// Embedding + text generation provider. Object-safe so the responder can
/// hold an `Arc<dyn LanguageModel>` and tests can swap in a fake.
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, ModelError>>;

    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<Generation, ModelError>>;
}
