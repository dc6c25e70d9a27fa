//! # Gemini Client Module
//!
//! `GenerationClient` implementation backed by the Gemini `generateContent`
//! REST endpoint. One HTTP call per request, no retries.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GeminiConfig;
use crate::errors::GenerationError;
use crate::generation::{GenerationClient, GenerationRequest};

/// Finish reasons meaning the service withheld the answer
const REJECTING_FINISH_REASONS: [&str; 5] = [
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Gemini REST client
pub struct GeminiClient {
    http_client: HttpClient,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            http_client: HttpClient::new(),
            config,
        }
    }

    /// Model serving the given request shape
    pub fn model_for(&self, request: &GenerationRequest) -> &str {
        match request {
            GenerationRequest::Text { .. } => &self.config.models.text,
            GenerationRequest::Code { .. } => &self.config.models.code,
            GenerationRequest::Vision { .. } => &self.config.models.vision,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.config.base_url, model)
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let model = self.model_for(&request).to_string();
        let url = self.endpoint(&model);
        let body = build_request_body(&request)?;

        debug!(
            model = %model,
            kind = request.kind(),
            prompt_length = request.prompt().len(),
            "Sending generation request"
        );

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = service_error_message(&text);
            warn!(
                model = %model,
                status = status.as_u16(),
                error = %message,
                "Generation service returned an error"
            );
            return Err(GenerationError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let output = extract_text(&text)?;
        debug!(model = %model, output_length = output.len(), "Generation request completed");
        Ok(output)
    }
}

fn build_request_body(
    request: &GenerationRequest,
) -> Result<GenerateContentRequest, GenerationError> {
    let mut parts = Vec::new();

    match request {
        GenerationRequest::Text { prompt } | GenerationRequest::Code { prompt } => {
            parts.push(Part::Text {
                text: prompt.clone(),
            });
        }
        GenerationRequest::Vision { prompt, image } => {
            if !prompt.is_empty() {
                parts.push(Part::Text {
                    text: prompt.clone(),
                });
            }
            let png = image
                .encode_png()
                .map_err(|e| GenerationError::Encoding(e.to_string()))?;
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: "image/png",
                    data: BASE64.encode(png),
                },
            });
        }
    }

    Ok(GenerateContentRequest {
        contents: vec![Content { role: "user", parts }],
    })
}

/// Pull the answer text out of a successful response body
fn extract_text(body: &str) -> Result<String, GenerationError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(GenerationError::ContentRejected(reason));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(GenerationError::EmptyOutput)?;

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if !text.trim().is_empty() {
        return Ok(text);
    }

    match candidate.finish_reason {
        Some(reason) if REJECTING_FINISH_REASONS.contains(&reason.as_str()) => {
            Err(GenerationError::ContentRejected(reason))
        }
        _ => Err(GenerationError::EmptyOutput),
    }
}

fn service_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => "no response body".to_string(),
        Err(_) => body.chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::dialogue::PendingImage;
    use image::{DynamicImage, RgbImage};

    fn client() -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            api_key: "test-key".to_string(),
            base_url: "http://localhost:9".to_string(),
            models: ModelConfig::default(),
        })
    }

    fn vision_request(prompt: &str) -> GenerationRequest {
        GenerationRequest::Vision {
            prompt: prompt.to_string(),
            image: PendingImage::from_image(DynamicImage::ImageRgb8(RgbImage::new(2, 2))),
        }
    }

    #[test]
    fn test_model_selection() {
        let client = client();
        let models = ModelConfig::default();
        assert_eq!(
            client.model_for(&GenerationRequest::Text { prompt: "q".into() }),
            models.text
        );
        assert_eq!(
            client.model_for(&GenerationRequest::Code { prompt: "q".into() }),
            models.code
        );
        assert_eq!(client.model_for(&vision_request("q")), models.vision);
        assert_eq!(
            client.endpoint("gemini-1.5-flash"),
            "http://localhost:9/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_text_request_body() {
        let body = build_request_body(&GenerationRequest::Text {
            prompt: "Why is the sky blue?".into(),
        })
        .unwrap();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "Why is the sky blue?"}]}]
            })
        );
    }

    #[test]
    fn test_vision_request_body_carries_png() {
        let body = build_request_body(&vision_request("what is this?")).unwrap();
        let json = serde_json::to_value(body).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "what is this?");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");

        let data = parts[1]["inline_data"]["data"].as_str().unwrap();
        let png = BASE64.decode(data).unwrap();
        assert_eq!(PendingImage::decode(&png).unwrap().dimensions(), (2, 2));
    }

    #[test]
    fn test_vision_request_without_caption_sends_image_only() {
        let json = serde_json::to_value(build_request_body(&vision_request("")).unwrap()).unwrap();
        let parts = json["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert!(parts[0].get("inline_data").is_some());
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello "},{"text":"world"}]},"finishReason":"STOP"}]}"#;
        assert_eq!(extract_text(body).unwrap(), "Hello world");
    }

    #[test]
    fn test_extract_text_blocked_prompt() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert_eq!(
            extract_text(body),
            Err(GenerationError::ContentRejected("SAFETY".to_string()))
        );
    }

    #[test]
    fn test_extract_text_safety_finish_without_text() {
        let body = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        assert_eq!(
            extract_text(body),
            Err(GenerationError::ContentRejected("SAFETY".to_string()))
        );
    }

    #[test]
    fn test_extract_text_empty_and_malformed() {
        assert_eq!(extract_text(r#"{"candidates":[]}"#), Err(GenerationError::EmptyOutput));
        assert_eq!(
            extract_text(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]},"finishReason":"STOP"}]}"#),
            Err(GenerationError::EmptyOutput)
        );
        assert!(matches!(
            extract_text("<html>"),
            Err(GenerationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_service_error_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(service_error_message(body), "API key not valid.");
        assert_eq!(service_error_message(""), "no response body");
        assert_eq!(service_error_message("Bad Gateway"), "Bad Gateway");
    }
}
