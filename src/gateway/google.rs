//! Google adapter for the Gemini generateContent API.
//!
//! Also the transport for the arbiter model (see `catalog::ARBITER_MODEL`).

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

const VENDOR: &str = "google";

/// Google Generative Language API adapter.
#[derive(Debug, Clone)]
pub struct GoogleAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleAdapter {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_config(
            api_key,
            "https://generativelanguage.googleapis.com/v1beta",
            Duration::from_secs(120),
        )
    }

    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .map_err(|_| ProviderError::config("GOOGLE_API_KEY not set"))?;

        let base_url = std::env::var("GOOGLE_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());

        let timeout = std::env::var("GOOGLE_TIMEOUT_SECONDS")
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
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    fn generate_url(&self, model_id: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model_id)
    }
}

// =============================================================================
// API TYPES
// =============================================================================

#[derive(Serialize)]
struct GenerateApiRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
enum Part {
    #[serde(rename = "text")]
    Text(String),
    #[serde(rename = "inlineData")]
    InlineData {
        #[serde(rename = "mimeType")]
        mime_type: &'static str,
        data: String,
    },
}

fn request_parts(prompt: &Prompt) -> Vec<Part> {
    let mut parts = vec![Part::Text(prompt.text.clone())];
    for img in &prompt.images {
        parts.push(Part::InlineData {
            mime_type: sniff_media_type(img),
            data: data_url_payload(img).to_string(),
        });
    }
    parts
}

#[derive(Deserialize)]
struct GenerateApiResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
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
impl ProviderAdapter for GoogleAdapter {
    fn vendor(&self) -> Vendor {
        Vendor::Google
    }

    async fn generate(&self, model_id: &str, prompt: &Prompt) -> Result<String, ProviderError> {
        check_input_size(prompt)?;

        let api_req = GenerateApiRequest {
            contents: vec![Content {
                parts: request_parts(prompt),
            }],
        };

        let response = self
            .client
            .post(self.generate_url(model_id))
            .query(&[("key", self.api_key.as_str())])
            .json(&api_req)
            .send()
            .await?;

        let status = response.status();
        let body = read_capped_body(response, VENDOR).await?;

        if !status.is_success() {
            if let Ok(parsed) = serde_json::from_str::<GenerateApiResponse>(&body) {
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

        let parsed: GenerateApiResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::provider(VENDOR, format!("Invalid JSON: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(ProviderError::provider(
                VENDOR,
                error.message.unwrap_or_default(),
            ));
        }

        // Concatenate the text parts of the first candidate.
        let content: String = parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        if content.trim().is_empty() {
            return Ok(EMPTY_COMPLETION_TEXT.to_string());
        }

        Ok(content)
    }
}
