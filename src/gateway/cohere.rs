//! Cohere adapter for the chat API. Text only; Cohere models in the catalog
//! have no vision flag, and image payloads are ignored here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::error::ProviderError;
use super::{check_input_size, read_capped_body, EMPTY_COMPLETION_TEXT};
use crate::catalog::Vendor;
use crate::pipeline::types::Prompt;

use super::ProviderAdapter;

const VENDOR: &str = "cohere";

/// Cohere API adapter.
#[derive(Debug, Clone)]
pub struct CohereAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl CohereAdapter {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_config(api_key, "https://api.cohere.com/v1", Duration::from_secs(120))
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var("COHERE_API_KEY")
            .map_err(|_| ProviderError::config("COHERE_API_KEY not set"))?;

        let base_url = std::env::var("COHERE_BASE_URL")
            .unwrap_or_else(|_| "https://api.cohere.com/v1".into());

        let timeout = std::env::var("COHERE_TIMEOUT_SECONDS")
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

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| ProviderError::config("Invalid API key format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url)
    }
}

// =============================================================================
// API TYPES
// =============================================================================

#[derive(Serialize)]
struct ChatApiRequest<'a> {
    model: &'a str,
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatApiResponse {
    text: Option<String>,
    message: Option<String>,
}

// =============================================================================
// PROVIDER ADAPTER IMPL
// =============================================================================

#[async_trait]
impl ProviderAdapter for CohereAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Cohere
    }

    async fn generate(&self, model_id: &str, prompt: &Prompt) -> Result<String, ProviderError> {
        check_input_size(prompt)?;

        let api_req = ChatApiRequest {
            model: model_id,
            message: &prompt.text,
        };

        let response = self
            .client
            .post(self.chat_url())
            .json(&api_req)
            .send()
            .await?;

        let status = response.status();
        let body = read_capped_body(response, VENDOR).await?;

        if !status.is_success() {
            // Cohere error bodies carry the detail in `message`.
            let message = serde_json::from_str::<ChatApiResponse>(&body)
                .ok()
                .and_then(|p| p.message)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(ProviderError::provider_with_status(
                VENDOR,
                message,
                status.as_u16(),
            ));
        }

        let parsed: ChatApiResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::provider(VENDOR, format!("Invalid JSON: {e}")))?;

        let content = parsed
            .text
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| EMPTY_COMPLETION_TEXT.to_string());

        Ok(content)
    }
}
