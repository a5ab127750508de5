//! Support assistant: simple-phrase replies, knowledge-base retrieval,
//! escalation to human agents, and grounded answers from a generative model.

pub mod config;
pub mod error;
pub mod gemini;
pub mod model;
pub mod phrases;
pub mod prompt;
pub mod responder;

pub use config::AssistantConfig;
pub use error::{AssistantError, ModelError};
pub use gemini::GeminiClient;
pub use model::{Generation, GenerationRequest, LanguageModel};
pub use responder::{AssistantReply, Responder};
