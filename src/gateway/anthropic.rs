//! Anthropic adapter for the Messages API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::error::ProviderError;
use super::{
    check_input_size, data_url_payload, read_capped_body, sniff_media_type, EMPTY_COMPLETION_TEXT,
};
use crate::catalog::Vendor;
use crate::pipeline::types::Prompt;

use super::ProviderAdapter;

const VENDOR: &str = "anthropic";

const API_VERSION: &str = "2023-06-01";

const MAX_COMPLETION_TOKENS: u32 = 1000;

/// Anthropic API adapter.
#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl AnthropicAdapter {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_config(api_key, "https://api.anthropic.com/v1", Duration::from_secs(120))
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| ProviderError::config("ANTHROPIC_API_KEY not set"))?;

        let base_url = std::env::var("ANTHROPIC_BASE_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com/v1".into());

        let timeout = std::env::var("ANTHROPIC_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(120));

        Self::with_config(api_key, base_url, timeout)
    }

    pub fn with_config(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        let base_url = base_url.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));

        let key_value = HeaderValue::from_str(&api_key)
            .map_err(|_| ProviderError::config("Invalid API key format"))?;
        headers.insert("x-api-key", key_value);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.base_url)
    }
}

// =============================================================================
// API TYPES
// =============================================================================

#[derive(Serialize)]
struct MessagesApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { source: ImageSource },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: &'static str,
    data: String,
}

fn content_blocks(prompt: &Prompt) -> Vec<ContentBlock> {
    let mut blocks = vec![ContentBlock::Text {
        text: prompt.text.clone(),
    }];
    for img in &prompt.images {
        blocks.push(ContentBlock::Image {
            source: ImageSource {
                source_type: "base64",
                media_type: sniff_media_type(img),
                data: data_url_payload(img).to_string(),
            },
        });
    }
    blocks
}

#[derive(Deserialize)]
struct MessagesApiResponse {
    content: Option<Vec<ResponseBlock>>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
}

// =============================================================================
// PROVIDER ADAPTER IMPL
// =============================================================================

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Anthropic
    }

    async fn generate(&self, model_id: &str, prompt: &Prompt) -> Result<String, ProviderError> {
        check_input_size(prompt)?;

        let api_req = MessagesApiRequest {
            model: model_id,
            max_tokens: MAX_COMPLETION_TOKENS,
            messages: vec![ApiMessage {
                role: "user",
                content: content_blocks(prompt),
            }],
        };

        let response = self
            .client
            .post(self.messages_url())
            .json(&api_req)
            .send()
            .await?;

        let status = response.status();
        let body = read_capped_body(response, VENDOR).await?;

        if !status.is_success() {
            if let Ok(parsed) = serde_json::from_str::<MessagesApiResponse>(&body) {
                if let Some(error) = parsed.error {
                    return Err(ProviderError::provider_with_status(
                        VENDOR,
                        error.message.unwrap_or_default(),
                        status.as_u16(),
                    ));
                }
            }
            return Err(ProviderError::provider_with_status(
                VENDOR,
                format!("HTTP {}", status.as_u16()),
                status.as_u16(),
            ));
        }

        let parsed: MessagesApiResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::provider(VENDOR, format!("Invalid JSON: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(ProviderError::provider(
                VENDOR,
                error.message.unwrap_or_default(),
            ));
        }

        // First text block wins; tool-use and thinking blocks are skipped.
        let content = parsed
            .content
            .unwrap_or_default()
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| EMPTY_COMPLETION_TEXT.to_string());

        Ok(content)
    }
}
