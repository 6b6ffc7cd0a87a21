//! Provider adapters for the vendor chat APIs.
//!
//! One adapter per vendor, all behind the [`ProviderAdapter`] trait. The
//! pipeline never branches on a provider string; it looks the vendor up in
//! the catalog and dispatches through an [`AdapterRegistry`].

pub mod anthropic;
pub mod cohere;
pub mod error;
pub mod google;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;

use crate::catalog::Vendor;
use crate::pipeline::types::Prompt;

pub use anthropic::AnthropicAdapter;
pub use cohere::CohereAdapter;
pub use error::ProviderError;
pub use google::GoogleAdapter;
pub use openai::OpenAiAdapter;

/// Maximum allowed response content length (1MB).
pub(crate) const MAX_RESPONSE_LEN: usize = 1_024 * 1_024;

/// Maximum allowed input characters across prompt text (~125k tokens).
pub(crate) const MAX_INPUT_CHARS: usize = 500_000;

/// Fallback text when a vendor returns an empty completion.
pub(crate) const EMPTY_COMPLETION_TEXT: &str = "No response";

/// Capability one vendor implementation provides: turn a prompt into text.
///
/// The same method serves plain generation and the evaluation/ranking calls;
/// the latter simply pass a text-only prompt.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Vendor this adapter speaks for.
    fn vendor(&self) -> Vendor;

    /// Generate text from `model_id` for the given prompt.
    async fn generate(&self, model_id: &str, prompt: &Prompt) -> Result<String, ProviderError>;
}

/// One adapter per vendor, constructed explicitly and passed into the
/// coordinators. Tests inject doubles through [`AdapterRegistry::new`].
#[derive(Clone)]
pub struct AdapterRegistry {
    openai: Arc<dyn ProviderAdapter>,
    anthropic: Arc<dyn ProviderAdapter>,
    google: Arc<dyn ProviderAdapter>,
    cohere: Arc<dyn ProviderAdapter>,
}

impl AdapterRegistry {
    pub fn new(
        openai: Arc<dyn ProviderAdapter>,
        anthropic: Arc<dyn ProviderAdapter>,
        google: Arc<dyn ProviderAdapter>,
        cohere: Arc<dyn ProviderAdapter>,
    ) -> Self {
        Self {
            openai,
            anthropic,
            google,
            cohere,
        }
    }

    /// Build the real adapters from `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`,
    /// `GOOGLE_API_KEY` and `COHERE_API_KEY`.
    pub fn from_env() -> Result<Self, ProviderError> {
        Ok(Self::new(
            Arc::new(OpenAiAdapter::from_env()?),
            Arc::new(AnthropicAdapter::from_env()?),
            Arc::new(GoogleAdapter::from_env()?),
            Arc::new(CohereAdapter::from_env()?),
        ))
    }

    pub fn adapter_for(&self, vendor: Vendor) -> &Arc<dyn ProviderAdapter> {
        match vendor {
            Vendor::OpenAi => &self.openai,
            Vendor::Anthropic => &self.anthropic,
            Vendor::Google => &self.google,
            Vendor::Cohere => &self.cohere,
        }
    }
}

/// Reject oversized prompts before spending a network call.
pub(crate) fn check_input_size(prompt: &Prompt) -> Result<(), ProviderError> {
    let total = prompt.text.len() + prompt.images.iter().map(String::len).sum::<usize>();
    if total > MAX_INPUT_CHARS {
        return Err(ProviderError::invalid_request(format!(
            "Input too large: {total} chars (max {MAX_INPUT_CHARS})"
        )));
    }
    Ok(())
}

/// Read a response body, enforcing the size limit while streaming.
pub(crate) async fn read_capped_body(
    mut response: reqwest::Response,
    vendor: &'static str,
) -> Result<String, ProviderError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let new_len = bytes.len() + chunk.len();
        if new_len > MAX_RESPONSE_LEN {
            return Err(ProviderError::provider(
                vendor,
                format!("Response too large: {new_len} bytes"),
            ));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&bytes).to_string())
}

/// Media type of a data-URL image, sniffed from its prefix. JPEG is the
/// default the vendor APIs tolerate best.
pub(crate) fn sniff_media_type(data_url: &str) -> &'static str {
    if data_url.contains("image/png") {
        "image/png"
    } else if data_url.contains("image/webp") {
        "image/webp"
    } else if data_url.contains("image/gif") {
        "image/gif"
    } else {
        "image/jpeg"
    }
}

/// Base64 payload of a data URL (everything after the first comma), or the
/// string itself when it carries no data-URL header.
pub(crate) fn data_url_payload(data_url: &str) -> &str {
    data_url
        .split_once(',')
        .map(|(_, payload)| payload)
        .unwrap_or(data_url)
}
