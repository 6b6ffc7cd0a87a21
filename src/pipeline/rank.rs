//! Arbiter ranking: one call to the fixed arbiter model over the top three.
//!
//! Unlike the evaluation stage there is only one call here, so a malformed
//! reply has no fallback and fails the stage.

use serde::Deserialize;

use crate::catalog::{ARBITER_MODEL, ARBITER_VENDOR};
use crate::gateway::AdapterRegistry;
use crate::prompts::ranking_prompt;

use super::error::PipelineError;
use super::types::{GeneratedResponse, Prompt, RankingOutcome};

#[derive(Debug, Deserialize)]
struct RankingJson {
    ranking: Vec<usize>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Extract the first balanced `{...}` substring, skipping braces inside JSON
/// string literals.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
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
            '{' => depth += 1,
            '}' => {
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

/// Parse the arbiter's reply and map its indices back to model ids.
///
/// `ranking` must be a permutation of `{0, 1, 2}`; anything else is a stage
/// failure.
pub fn parse_arbiter_reply(
    raw: &str,
    top_three: &[GeneratedResponse],
) -> Result<RankingOutcome, PipelineError> {
    if top_three.len() != 3 {
        return Err(PipelineError::InvalidInput(format!(
            "ranking requires exactly 3 responses, got {}",
            top_three.len()
        )));
    }

    let trimmed = raw.trim();
    let candidate = extract_json_object(trimmed).unwrap_or(trimmed);

    let parsed: RankingJson = serde_json::from_str(candidate)
        .map_err(|e| PipelineError::ArbiterOutput(format!("not a ranking object: {e}")))?;

    let mut seen = [false; 3];
    if parsed.ranking.len() != 3 {
        return Err(PipelineError::ArbiterOutput(format!(
            "ranking has {} entries, expected 3",
            parsed.ranking.len()
        )));
    }
    for &idx in &parsed.ranking {
        if idx > 2 || seen[idx] {
            return Err(PipelineError::ArbiterOutput(format!(
                "ranking {:?} is not a permutation of [0, 1, 2]",
                parsed.ranking
            )));
        }
        seen[idx] = true;
    }

    let ordered_model_ids = parsed
        .ranking
        .iter()
        .map(|&idx| top_three[idx].model_id.clone())
        .collect();

    Ok(RankingOutcome {
        ordered_model_ids,
        reasoning: parsed.reasoning.unwrap_or_default(),
    })
}

/// Ask the arbiter model to order exactly three responses, best to worst.
///
/// Any transport or parse failure here is fatal to the run; this is the
/// pipeline's final judgment.
pub async fn rank_top_three(
    registry: &AdapterRegistry,
    prompt: &Prompt,
    top_three: &[GeneratedResponse],
) -> Result<RankingOutcome, PipelineError> {
    if top_three.len() != 3 {
        return Err(PipelineError::InvalidInput(format!(
            "ranking requires exactly 3 responses, got {}",
            top_three.len()
        )));
    }

    let rank_prompt = ranking_prompt(prompt, top_three);
    let adapter = registry.adapter_for(ARBITER_VENDOR);
    let reply = adapter.generate(ARBITER_MODEL, &rank_prompt).await?;

    parse_arbiter_reply(&reply, top_three)
}
