use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::ai_service::{InferenceService, ModelKind, Prompt};
use super::credentials::Credential;
use super::error::ServiceError;

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
pub const DEFAULT_VISION_MODEL: &str = "qwen-vl-max";
pub const DEFAULT_TEXT_MODEL: &str = "qwen-plus";

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: MessageBody,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageBody {
    Plain(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        #[serde(rename = "type")]
        content_type: String,
        text: String,
    },
    ImageUrl {
        #[serde(rename = "type")]
        content_type: String,
        image_url: ImageData,
    },
}

#[derive(Debug, Serialize)]
struct ImageData {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

/// Error body of the compatible endpoint, `{"error": {...}}`, or of the
/// native one, `{"code": ..., "message": ...}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: Option<Value>,
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DashScopeSettings {
    pub base_url: String,
    pub vision_model: String,
    pub text_model: String,
    pub timeout: Duration,
}

impl Default for DashScopeSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            timeout: Duration::from_secs(45),
        }
    }
}

/// Client for DashScope's OpenAI-compatible chat completions endpoint.
pub struct DashScopeClient {
    settings: DashScopeSettings,
    client: reqwest::Client,
}

impl DashScopeClient {
    pub fn new(settings: DashScopeSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        Ok(Self { settings, client })
    }

    fn model_name(&self, kind: ModelKind) -> &str {
        match kind {
            ModelKind::Vision => &self.settings.vision_model,
            ModelKind::Text => &self.settings.text_model,
        }
    }

    fn build_request(&self, prompt: &Prompt) -> ChatRequest {
        let content = match &prompt.image {
            Some(image) => {
                let base64_image = general_purpose::STANDARD.encode(&image.bytes);
                log::debug!(
                    "📊 Image size: {} bytes, base64: {} bytes",
                    image.bytes.len(),
                    base64_image.len()
                );

                MessageBody::Parts(vec![
                    ContentPart::ImageUrl {
                        content_type: "image_url".to_string(),
                        image_url: ImageData {
                            url: format!("data:{};base64,{}", image.mime_type, base64_image),
                        },
                    },
                    ContentPart::Text {
                        content_type: "text".to_string(),
                        text: prompt.text.clone(),
                    },
                ])
            }
            None => MessageBody::Plain(prompt.text.clone()),
        };

        ChatRequest {
            model: self.model_name(prompt.model).to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content,
            }],
            max_tokens: prompt.model.max_tokens(),
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> ServiceError {
        if e.is_timeout() {
            ServiceError::Timeout(self.settings.timeout)
        } else {
            ServiceError::Transport(e)
        }
    }
}

#[async_trait::async_trait]
impl InferenceService for DashScopeClient {
    async fn complete(
        &self,
        credential: &Credential,
        prompt: &Prompt,
    ) -> Result<String, ServiceError> {
        let request = self.build_request(prompt);
        let url = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        log::info!("🤖 Sending {:?} prompt to DashScope with model: {}", prompt.model, request.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(credential.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        log::debug!("📥 DashScope response status: {}", status);

        let response_text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            log::error!("❌ DashScope API error ({}): {}", status, response_text);
            return Err(remote_error(status.as_u16(), &response_text));
        }

        log::debug!("📄 Raw DashScope response size: {} bytes", response_text.len());

        let chat_response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| ServiceError::MalformedResponse(format!("unexpected response body: {}", e)))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ServiceError::MalformedResponse("response has no message content".to_string()))?;

        log::debug!("💬 DashScope response content: {}", content);
        Ok(content)
    }
}

fn remote_error(status: u16, body: &str) -> ServiceError {
    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: Some(detail),
            ..
        }) => (
            detail.code.map(|c| match c {
                Value::String(s) => s,
                other => other.to_string(),
            }),
            detail.message,
        ),
        Ok(envelope) => (envelope.code, envelope.message),
        Err(_) => (None, None),
    };

    ServiceError::Remote {
        status,
        code: code.unwrap_or_else(|| "unknown".to_string()),
        message: message.unwrap_or_else(|| body.trim().to_string()),
    }
}
