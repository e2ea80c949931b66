use super::DescriptionProvider;
use crate::config::VisionConfig;
use crate::error::VisionError;
use crate::frame::{FrameData, FrameProcessor};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Describes frames with the Gemini `generateContent` API
pub struct GeminiDescriber {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    prompt: String,
}

impl GeminiDescriber {
    pub fn new(config: &VisionConfig) -> Result<Self, VisionError> {
        let api_key = config.resolve_api_key().ok_or(VisionError::MissingApiKey)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            prompt: config.prompt.clone(),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    /// Request body carrying the prompt and the frame as inline data
    pub(crate) fn build_payload(&self, frame: &FrameData) -> Result<Value, VisionError> {
        let upload = FrameProcessor::encode_for_upload(frame).map_err(|e| VisionError::Encoding {
            details: e.to_string(),
        })?;

        Ok(json!({
            "contents": [{
                "parts": [
                    { "text": self.prompt },
                    {
                        "inline_data": {
                            "mime_type": upload.mime_type,
                            "data": STANDARD.encode(upload.data.as_slice()),
                        }
                    }
                ]
            }]
        }))
    }
}

#[async_trait]
impl DescriptionProvider for GeminiDescriber {
    async fn describe(&self, frame: &FrameData) -> Result<String, VisionError> {
        let payload = self.build_payload(frame)?;

        debug!("Requesting description of frame {} from {}", frame.id, self.model);

        let res = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!("Gemini returned {} for frame {}", status, frame.id);
            return Err(VisionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = res.json().await?;
        let text = extract_text(&body).ok_or(VisionError::EmptyResponse)?;

        debug!("Frame {} described as: {}", frame.id, text);
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Join the text parts of the first candidate
pub fn extract_text(body: &Value) -> Option<String> {
    let parts = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("");

    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
