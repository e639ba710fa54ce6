//! Gemini (Google) image transformation client.

use crate::config::{Config, GeminiModel};
use crate::error::{parse_retry_after, sanitize_error_message, ProPhotoError, Result};
use crate::image::EncodedImage;
use crate::transform::prompt::PROFESSIONAL_HEADSHOT_PROMPT;
use crate::transform::provider::Transformer;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Builder for [`GeminiTransformer`].
#[derive(Debug, Clone)]
pub struct GeminiTransformerBuilder {
    config: Config,
}

impl GeminiTransformerBuilder {
    /// Creates a builder from an explicit configuration.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Builds the transformer.
    pub fn build(self) -> Result<GeminiTransformer> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(GeminiTransformer {
            client: builder.build()?,
            config: self.config,
        })
    }
}

/// Gemini-backed [`Transformer`].
pub struct GeminiTransformer {
    client: reqwest::Client,
    config: Config,
}

impl GeminiTransformer {
    /// Creates a new builder.
    pub fn builder(config: Config) -> GeminiTransformerBuilder {
        GeminiTransformerBuilder::new(config)
    }

    /// The model this client calls.
    pub fn model(&self) -> GeminiModel {
        self.config.model()
    }

    fn model_url(&self) -> String {
        format!(
            "{}/models/{}",
            self.config.base_url(),
            self.config.model().as_str()
        )
    }

    async fn transform_impl(&self, image: &EncodedImage, mime_type: &str) -> Result<EncodedImage> {
        let mime_type = mime_type.trim();
        if mime_type.is_empty() {
            return Err(ProPhotoError::InvalidInput("empty mime type".into()));
        }

        // Normalizes the payload and proves it decodes before anything is sent.
        let bytes = image.decode()?;
        let body = GeminiRequest::for_image(mime_type, &bytes);

        let start = Instant::now();
        tracing::debug!(
            model = %self.config.model(),
            mime_type,
            payload_bytes = bytes.len(),
            "sending transformation request"
        );

        let response = self
            .client
            .post(format!("{}:generateContent", self.model_url()))
            .header("x-goog-api-key", self.config.api_key())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let transformed = extract_image(gemini_response)?;

        tracing::debug!(
            model = %self.config.model(),
            duration_ms = start.elapsed().as_millis() as u64,
            "transformation response received"
        );
        Ok(transformed)
    }
}

#[async_trait]
impl Transformer for GeminiTransformer {
    async fn transform(&self, image: &EncodedImage, mime_type: &str) -> Result<EncodedImage> {
        self.transform_impl(image, mime_type).await.inspect_err(|e| {
            tracing::error!(
                model = %self.config.model(),
                kind = e.kind(),
                "transformation request failed: {e}"
            );
        })
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .client
            .get(self.model_url())
            .header("x-goog-api-key", self.config.api_key())
            .send()
            .await?;

        match response.status().as_u16() {
            401 | 403 => Err(ProPhotoError::Auth("Invalid API key".into())),
            404 => Err(ProPhotoError::Api {
                status: 404,
                message: "Model not found. Verify the model name is correct.".into(),
            }),
            s if !(200..300).contains(&s) => Err(ProPhotoError::Api {
                status: s,
                message: "Health check failed".into(),
            }),
            _ => Ok(()),
        }
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> ProPhotoError {
    let text = sanitize_error_message(text);
    match status {
        401 | 403 => ProPhotoError::Auth(text),
        429 => ProPhotoError::RateLimited {
            retry_after: parse_retry_after(headers).map(std::time::Duration::from_secs),
        },
        _ => {
            let lower = text.to_lowercase();
            if lower.contains("safety") || lower.contains("blocked") || lower.contains("prohibited")
            {
                ProPhotoError::ContentBlocked(text)
            } else {
                ProPhotoError::Api {
                    status,
                    message: text,
                }
            }
        }
    }
}

/// Pulls the first inline image out of a response and re-encodes it as a data URI.
fn extract_image(response: GeminiResponse) -> Result<EncodedImage> {
    // Blocks arrive as HTTP 200 with prompt feedback instead of candidates.
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_ref())
    {
        let msg = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason_message.clone())
            .unwrap_or_else(|| format!("Prompt blocked: {reason}"));
        return Err(ProPhotoError::ContentBlocked(msg));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProPhotoError::NoImage("no candidates in response".into()))?;

    if let Some(ref finish_reason) = candidate.finish_reason {
        match finish_reason.as_str() {
            "SAFETY"
            | "IMAGE_SAFETY"
            | "IMAGE_PROHIBITED_CONTENT"
            | "IMAGE_RECITATION"
            | "RECITATION"
            | "PROHIBITED_CONTENT"
            | "BLOCKLIST" => {
                return Err(ProPhotoError::ContentBlocked(format!(
                    "blocked by safety filter: {finish_reason}"
                )));
            }
            _ => {}
        }
    }

    let inline_data = candidate
        .content
        .into_iter()
        .flat_map(|c| c.parts)
        .find_map(|p| p.inline_data.filter(|d| !d.data.trim().is_empty()))
        .ok_or_else(|| ProPhotoError::NoImage("no image part found in response".into()))?;

    let mime_type = if inline_data.mime_type.trim().is_empty() {
        "image/png"
    } else {
        inline_data.mime_type.trim()
    };
    let bytes = EncodedImage::from_payload(mime_type, inline_data.data.trim()).decode()?;
    Ok(EncodedImage::from_bytes(mime_type, &bytes))
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - either text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text { text: String },
    InlineData { inline_data: GeminiInlineData },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn for_image(mime_type: &str, bytes: &[u8]) -> Self {
        let parts = vec![
            GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: mime_type.to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(bytes),
                },
            },
            GeminiRequestPart::Text {
                text: PROFESSIONAL_HEADSHOT_PROMPT.to_string(),
            },
        ];

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default, alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default, alias = "mime_type")]
    mime_type: String,
    #[serde(default)]
    data: String,
}
