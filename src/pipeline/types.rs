//! Wire and data model for the comparison pipeline.
//!
//! Field names are serialized in camelCase because the three HTTP endpoints
//! are schema-compatible with the original web client (`modelId`,
//! `topThreeResponses`, ...).

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A user prompt: text plus zero or more data-URL encoded images.
///
/// Immutable once dispatched; coordinators clone it per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub text: String,
    /// Base64 data-URL strings, order preserved.
    #[serde(default)]
    pub images: Vec<String>,
}

impl Prompt {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            images: Vec::new(),
        }
    }

    pub fn with_images(text: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            text: text.into(),
            images,
        }
    }

    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    /// Copy of this prompt with image payloads omitted, for non-vision models.
    pub fn without_images(&self) -> Self {
        Self {
            text: self.text.clone(),
            images: Vec::new(),
        }
    }
}

/// One model's answer to the user prompt.
///
/// Created exactly once by the generation stage and never mutated. A failed
/// provider call still yields an entry; its `text` carries the sentinel error
/// string (see `pipeline::generate`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedResponse {
    pub model_id: String,
    pub display_name: String,
    pub text: String,
    /// Creation time, epoch milliseconds.
    pub created_at: i64,
}

/// One evaluator's score for one target response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    pub evaluator_model_id: String,
    pub target_model_id: String,
    /// Score in [1, 10].
    pub score: f64,
    pub reasoning: String,
}

/// The arbiter's final verdict over the top three responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingOutcome {
    /// Exactly three model ids, best to worst. A permutation of the ids that
    /// went into the arbiter call.
    pub ordered_model_ids: Vec<String>,
    pub reasoning: String,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub prompt: Prompt,
    pub selected_models: Vec<String>,
    pub responses: Vec<GeneratedResponse>,
    pub evaluations: Vec<EvaluationRecord>,
    /// Model ids with the three highest mean scores, best mean first.
    pub top_three: Vec<String>,
    pub ranking: RankingOutcome,
    /// The model the human picked in the end, if a frontend attached one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_choice: Option<String>,
}

impl PipelineResult {
    /// Attach the user's own pick. The only mutation allowed after a run.
    pub fn set_user_choice(&mut self, model_id: impl Into<String>) {
        self.user_choice = Some(model_id.into());
    }
}

pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
