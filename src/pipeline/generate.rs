//! Generation fan-out: one prompt, several models, one response each.

use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::catalog::{self, ModelDescriptor};
use crate::gateway::AdapterRegistry;

use super::error::PipelineError;
use super::types::{now_epoch_ms, GeneratedResponse, Prompt};

/// Prefix of the text substituted when a provider call fails, so downstream
/// stages have a value to process instead of a hole in the data.
pub const SENTINEL_PREFIX: &str = "Error: Failed to generate response from ";

/// Sentinel text for a failed generation call, naming the model.
pub fn sentinel_text(display_name: &str) -> String {
    format!("{SENTINEL_PREFIX}{display_name}")
}

/// Whether a response carries sentinel text instead of a real answer.
pub fn is_sentinel(text: &str) -> bool {
    text.starts_with(SENTINEL_PREFIX)
}

/// Fan the prompt out to every recognized model in `model_ids`, concurrently,
/// and join on all calls.
///
/// Output order matches input order. Unknown ids are silently skipped. A
/// transport failure from one adapter yields a sentinel response for that
/// model only; the stage itself fails solely on structurally invalid input.
pub async fn generate_responses(
    registry: &AdapterRegistry,
    prompt: &Prompt,
    model_ids: &[String],
) -> Result<Vec<GeneratedResponse>, PipelineError> {
    if prompt.text.trim().is_empty() {
        return Err(PipelineError::InvalidInput(
            "prompt text must not be empty".into(),
        ));
    }
    if model_ids.is_empty() {
        return Err(PipelineError::InvalidInput(
            "modelIds must not be empty".into(),
        ));
    }

    let selected: Vec<&'static ModelDescriptor> =
        model_ids.iter().filter_map(|id| catalog::find(id)).collect();

    // Bounded by the selection size; 4-5 models, no pool needed.
    let concurrency = selected.len().max(1);

    // Owned descriptors keep the stage future Send for the server handlers.
    let responses = stream::iter(selected.into_iter().copied())
        .map(|model| {
            // Non-vision models get the prompt with image payloads omitted.
            let send_prompt = if model.supports_vision || !prompt.has_images() {
                prompt.clone()
            } else {
                prompt.without_images()
            };
            async move {
                let adapter = registry.adapter_for(model.vendor);
                let text = match adapter.generate(model.id, &send_prompt).await {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(
                            model_id = model.id,
                            code = err.code(),
                            error = %err,
                            "Generation call failed; substituting sentinel text"
                        );
                        sentinel_text(model.display_name)
                    }
                };
                GeneratedResponse {
                    model_id: model.id.to_string(),
                    display_name: model.display_name.to_string(),
                    text,
                    created_at: now_epoch_ms(),
                }
            }
        })
        .buffered(concurrency)
        .collect::<Vec<_>>()
        .await;

    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_names_the_model() {
        let s = sentinel_text("Claude 3 Haiku");
        assert_eq!(s, "Error: Failed to generate response from Claude 3 Haiku");
        assert!(is_sentinel(&s));
        assert!(!is_sentinel("a perfectly fine answer"));
    }
}
