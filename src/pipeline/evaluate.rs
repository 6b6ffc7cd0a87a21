//! Cross-evaluation fan-out and untrusted-output parsing.
//!
//! Every selected model judges every generated response. Evaluator replies
//! are supposed to be a bare JSON array but routinely arrive wrapped in
//! prose or code fences, truncated, or malformed; the parse ladder here is
//! strict parse -> balanced-bracket extraction -> per-element validation,
//! dropping what fails at each rung instead of aborting the stage.

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::warn;

use crate::catalog::{self, ModelDescriptor};
use crate::gateway::AdapterRegistry;
use crate::prompts::evaluation_prompt;

use super::error::PipelineError;
use super::types::{EvaluationRecord, GeneratedResponse, Prompt};

/// Raw element of the evaluator's JSON array, before validation.
#[derive(Debug, Deserialize)]
struct EvalElementJson {
    #[serde(default, rename = "responseIndex")]
    response_index: Option<i64>,
    /// Accepted as any JSON value and coerced; vendors sometimes quote numbers.
    #[serde(default)]
    score: Option<serde_json::Value>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Extract the first balanced `[...]` substring, skipping brackets inside
/// JSON string literals.
fn extract_json_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let remainder = &raw[start..];

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in remainder.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&remainder[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Coerce a JSON value into a finite score, clamped into [1, 10].
fn coerce_score(value: &serde_json::Value) -> Option<f64> {
    let n = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    Some(n.clamp(1.0, 10.0))
}

/// Parse one evaluator's raw reply into validated records.
///
/// A reply that fails every rung of the ladder yields zero records; elements
/// failing validation are dropped individually.
pub fn parse_evaluator_reply(
    evaluator_model_id: &str,
    raw: &str,
    responses: &[GeneratedResponse],
) -> Vec<EvaluationRecord> {
    let trimmed = raw.trim();

    let elements: Vec<EvalElementJson> = match serde_json::from_str(trimmed) {
        Ok(elements) => elements,
        Err(strict_err) => match extract_json_array(trimmed)
            .and_then(|candidate| serde_json::from_str(candidate).ok())
        {
            Some(elements) => elements,
            None => {
                warn!(
                    evaluator = evaluator_model_id,
                    error = %strict_err,
                    "Evaluator reply is not a JSON array; dropping its scores"
                );
                return Vec::new();
            }
        },
    };

    elements
        .into_iter()
        .filter_map(|el| {
            let idx = el.response_index?;
            if idx < 0 {
                return None;
            }
            let target = responses.get(idx as usize)?;
            let score = coerce_score(el.score.as_ref()?)?;
            Some(EvaluationRecord {
                evaluator_model_id: evaluator_model_id.to_string(),
                target_model_id: target.model_id.clone(),
                score,
                reasoning: el.reasoning.unwrap_or_default(),
            })
        })
        .collect()
}

/// Fan the evaluation prompt out to every recognized evaluator and join.
///
/// Transport errors and unparseable replies are isolated per evaluator: that
/// evaluator contributes zero records and the stage proceeds once every call
/// has settled.
pub async fn evaluate_responses(
    registry: &AdapterRegistry,
    prompt: &Prompt,
    responses: &[GeneratedResponse],
    model_ids: &[String],
) -> Result<Vec<EvaluationRecord>, PipelineError> {
    if prompt.text.trim().is_empty() {
        return Err(PipelineError::InvalidInput(
            "prompt text must not be empty".into(),
        ));
    }
    if responses.is_empty() {
        return Err(PipelineError::InvalidInput(
            "responses must not be empty".into(),
        ));
    }
    if model_ids.is_empty() {
        return Err(PipelineError::InvalidInput(
            "modelIds must not be empty".into(),
        ));
    }

    let evaluators: Vec<&'static ModelDescriptor> =
        model_ids.iter().filter_map(|id| catalog::find(id)).collect();

    let eval_prompt = evaluation_prompt(prompt, responses);
    let concurrency = evaluators.len().max(1);

    // Owned descriptors keep the stage future Send for the server handlers.
    let per_evaluator: Vec<Vec<EvaluationRecord>> = stream::iter(evaluators.into_iter().copied())
        .map(|model| {
            let eval_prompt = eval_prompt.clone();
            async move {
                let adapter = registry.adapter_for(model.vendor);
                match adapter.generate(model.id, &eval_prompt).await {
                    Ok(reply) => parse_evaluator_reply(model.id, &reply, responses),
                    Err(err) => {
                        warn!(
                            evaluator = model.id,
                            code = err.code(),
                            error = %err,
                            "Evaluator call failed; dropping its scores"
                        );
                        Vec::new()
                    }
                }
            }
        })
        .buffered(concurrency)
        .collect()
        .await;

    Ok(per_evaluator.into_iter().flatten().collect())
}
