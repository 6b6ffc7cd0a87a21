//! Score aggregation: mean per target model, top-three selection.

use std::collections::HashMap;

use super::error::PipelineError;
use super::types::{EvaluationRecord, GeneratedResponse};

/// The aggregator's output: the three best-scoring model ids (best mean
/// first) and their responses.
///
/// `responses` is a selection set in original generation order, not rank
/// order; the arbiter receives it positionally and ranks it itself.
#[derive(Debug, Clone)]
pub struct TopThree {
    pub ids: Vec<String>,
    pub responses: Vec<GeneratedResponse>,
}

/// Mean score per target model, in first-appearance order of the response
/// set. Targets with zero valid records are absent. Records referencing a
/// model outside the response set are ignored.
pub fn mean_scores(
    responses: &[GeneratedResponse],
    evaluations: &[EvaluationRecord],
) -> Vec<(String, f64)> {
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for record in evaluations {
        let entry = sums.entry(record.target_model_id.as_str()).or_insert((0.0, 0));
        entry.0 += record.score;
        entry.1 += 1;
    }

    responses
        .iter()
        .filter_map(|r| {
            let (sum, count) = sums.get(r.model_id.as_str())?;
            Some((r.model_id.clone(), sum / *count as f64))
        })
        .collect()
}

/// Select the three targets with the highest mean score.
///
/// Ties keep first-appearance order in the response set (stable sort), and a
/// tie extending past the third place is truncated the same way. Fewer than
/// three scored targets yield a shorter selection; zero is the distinct
/// [`PipelineError::NoScoredModels`] outcome.
pub fn select_top_three(
    responses: &[GeneratedResponse],
    evaluations: &[EvaluationRecord],
) -> Result<TopThree, PipelineError> {
    let mut means = mean_scores(responses, evaluations);
    if means.is_empty() {
        return Err(PipelineError::NoScoredModels);
    }

    // Stable: equal means keep response-set order.
    means.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    means.truncate(3);

    let ids: Vec<String> = means.into_iter().map(|(id, _)| id).collect();
    let selected: Vec<GeneratedResponse> = responses
        .iter()
        .filter(|r| ids.contains(&r.model_id))
        .cloned()
        .collect();

    Ok(TopThree {
        ids,
        responses: selected,
    })
}
