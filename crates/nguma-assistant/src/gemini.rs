//! Gemini REST client for embeddings (`embedContent`) and text generation
//! (`generateContent`).
//!
//! The API key is sent in the `x-goog-api-key` header and is never logged.

use std::time::Duration;

use futures_util::future::BoxFuture;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ModelError;
use crate::model::{Generation, GenerationRequest, LanguageModel};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-flash-latest";
pub const EMBEDDING_MODEL: &str = "text-embedding-004";

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: SecretString, model: String) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
        })
    }

    /// Override the base URL (proxies, local test servers).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: String,
        body: &B,
    ) -> Result<R, ModelError> {
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Gemini call to {} failed with {}", url, status);
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<R>()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let body = EmbedContentRequest {
            model: format!("models/{}", EMBEDDING_MODEL),
            content: Content {
                parts: vec![Part { text: text.to_string() }],
            },
        };
        let resp: EmbedContentResponse = self
            .post(self.endpoint(EMBEDDING_MODEL, "embedContent"), &body)
            .await?;

        if resp.embedding.values.is_empty() {
            return Err(ModelError::InvalidResponse("empty embedding".into()));
        }
        debug!("Embedded {} chars into {} dims", text.len(), resp.embedding.values.len());
        Ok(resp.embedding.values)
    }

    async fn generate_text(&self, request: &GenerationRequest) -> Result<Generation, ModelError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
                top_p: request.top_p,
                top_k: request.top_k,
            },
        };
        let resp: GenerateContentResponse = self
            .post(self.endpoint(&self.model, "generateContent"), &body)
            .await?;

        parse_generation(resp)
    }
}

impl LanguageModel for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, ModelError>> {
        Box::pin(self.embed_text(text))
    }

    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<Generation, ModelError>> {
        Box::pin(self.generate_text(request))
    }
}

fn parse_generation(resp: GenerateContentResponse) -> Result<Generation, ModelError> {
    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::InvalidResponse("no candidates".into()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    let truncated = candidate.finish_reason.as_deref() == Some("MAX_TOKENS");
    if truncated {
        warn!("Gemini hit MAX_TOKENS, response was truncated");
    }

    if text.trim().is_empty() {
        return Err(ModelError::InvalidResponse("AI response invalid".into()));
    }

    Ok(Generation { text, truncated })
}

// -- Wire types --

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest {
    model: String,
    content: Content,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
    top_k: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_normal_completion() {
        let generation = parse_generation(response(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Les retraits prennent 48h." }] },
                "finishReason": "STOP"
            }]
        })))
        .unwrap();
        assert_eq!(generation.text, "Les retraits prennent 48h.");
        assert!(!generation.truncated);
    }

    #[test]
    fn flags_max_tokens() {
        let generation = parse_generation(response(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Début" }, { "text": " de réponse" }] },
                "finishReason": "MAX_TOKENS"
            }]
        })))
        .unwrap();
        assert_eq!(generation.text, "Début de réponse");
        assert!(generation.truncated);
    }

    #[test]
    fn empty_candidates_are_invalid() {
        assert!(matches!(
            parse_generation(response(json!({ "candidates": [] }))),
            Err(ModelError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_generation(response(json!({ "candidates": [{ "finishReason": "SAFETY" }] }))),
            Err(ModelError::InvalidResponse(_))
        ));
    }

    #[test]
    fn generation_config_uses_camel_case() {
        let body = GenerateContentRequest {
            contents: vec![],
            generation_config: GenerationConfig {
                temperature: 0.8,
                max_output_tokens: 1000,
                top_p: 0.95,
                top_k: 40,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 1000);
        assert_eq!(value["generationConfig"]["topK"], 40);
    }

    #[test]
    fn base_url_override_builds_endpoints() {
        let client = GeminiClient::new(SecretString::from("k".to_string()), DEFAULT_MODEL.into())
            .unwrap()
            .with_base_url("http://localhost:9999/".into());
        assert_eq!(
            client.endpoint(EMBEDDING_MODEL, "embedContent"),
            "http://localhost:9999/v1beta/models/text-embedding-004:embedContent"
        );
    }
}
