//! The four-stage comparison pipeline and its controller.
//!
//! Data flows strictly forward:
//! Prompt -> generate -> [GeneratedResponse] -> evaluate -> [EvaluationRecord]
//! -> aggregate -> top three -> rank -> ordered model ids.

pub mod aggregate;
pub mod error;
pub mod evaluate;
pub mod generate;
pub mod rank;
pub mod types;

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::gateway::AdapterRegistry;

pub use aggregate::{mean_scores, select_top_three, TopThree};
pub use error::PipelineError;
pub use evaluate::{evaluate_responses, parse_evaluator_reply};
pub use generate::{generate_responses, is_sentinel, sentinel_text, SENTINEL_PREFIX};
pub use rank::{parse_arbiter_reply, rank_top_three};
pub use types::{
    now_epoch_ms, EvaluationRecord, GeneratedResponse, PipelineResult, Prompt, RankingOutcome,
};

/// Where a run is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Generating,
    Evaluating,
    Aggregating,
    Ranking,
    Complete,
    Failed,
}

/// What a failed run still managed to produce. Generated responses remain
/// useful to the caller even when a later stage failed.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialResults {
    pub responses: Vec<GeneratedResponse>,
    pub evaluations: Vec<EvaluationRecord>,
    pub top_three: Vec<String>,
}

/// A failed run: the stage it failed in, the error kind, and the partial
/// results accumulated before the failure.
#[derive(Debug, thiserror::Error)]
#[error("pipeline failed while {stage:?}: {error}")]
pub struct PipelineFailure {
    pub stage: PipelineStage,
    pub error: PipelineError,
    pub partial: PartialResults,
}

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Resolves once the flag is raised; pends forever when there is no flag.
async fn cancel_raised(flag: Option<&AtomicBool>) {
    match flag {
        Some(flag) => {
            while !flag.load(AtomicOrdering::Relaxed) {
                tokio::time::sleep(CANCEL_POLL_INTERVAL).await;
            }
        }
        None => std::future::pending().await,
    }
}

/// Sequences the four stages, passing each stage's complete output as the
/// next stage's input. One run executes per call; no state crosses runs.
pub struct PipelineController {
    registry: Arc<AdapterRegistry>,
}

impl PipelineController {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self { registry }
    }

    /// Run the full pipeline once.
    ///
    /// Stages are strictly sequential; within the generating and evaluating
    /// stages, per-model calls run concurrently behind a join barrier. If
    /// `cancel_flag` is raised the current stage future is dropped, aborting
    /// its in-flight provider calls, and the run reports
    /// [`PipelineError::Cancelled`] with the partials discarded.
    pub async fn run(
        &self,
        prompt: Prompt,
        model_ids: Vec<String>,
        cancel_flag: Option<&AtomicBool>,
    ) -> Result<PipelineResult, PipelineFailure> {
        let cancelled = || {
            cancel_flag
                .map(|flag| flag.load(AtomicOrdering::Relaxed))
                .unwrap_or(false)
        };
        let fail = |stage: PipelineStage, error: PipelineError, partial: PartialResults| {
            PipelineFailure {
                stage,
                error,
                partial,
            }
        };

        if cancelled() {
            return Err(fail(
                PipelineStage::Idle,
                PipelineError::Cancelled,
                PartialResults::default(),
            ));
        }

        debug!(models = model_ids.len(), "Pipeline: generating");
        let responses = tokio::select! {
            res = generate_responses(&self.registry, &prompt, &model_ids) => {
                res.map_err(|e| fail(PipelineStage::Generating, e, PartialResults::default()))?
            }
            _ = cancel_raised(cancel_flag) => {
                return Err(fail(
                    PipelineStage::Generating,
                    PipelineError::Cancelled,
                    PartialResults::default(),
                ));
            }
        };

        if cancelled() {
            return Err(fail(
                PipelineStage::Generating,
                PipelineError::Cancelled,
                PartialResults::default(),
            ));
        }

        debug!(responses = responses.len(), "Pipeline: evaluating");
        let evaluations = tokio::select! {
            res = evaluate_responses(&self.registry, &prompt, &responses, &model_ids) => {
                res.map_err(|e| {
                    fail(
                        PipelineStage::Evaluating,
                        e,
                        PartialResults {
                            responses: responses.clone(),
                            ..Default::default()
                        },
                    )
                })?
            }
            _ = cancel_raised(cancel_flag) => {
                return Err(fail(
                    PipelineStage::Evaluating,
                    PipelineError::Cancelled,
                    PartialResults::default(),
                ));
            }
        };

        if cancelled() {
            return Err(fail(
                PipelineStage::Evaluating,
                PipelineError::Cancelled,
                PartialResults::default(),
            ));
        }

        debug!(records = evaluations.len(), "Pipeline: aggregating");
        let top_three = select_top_three(&responses, &evaluations).map_err(|e| {
            fail(
                PipelineStage::Aggregating,
                e,
                PartialResults {
                    responses: responses.clone(),
                    evaluations: evaluations.clone(),
                    ..Default::default()
                },
            )
        })?;

        if cancelled() {
            return Err(fail(
                PipelineStage::Aggregating,
                PipelineError::Cancelled,
                PartialResults::default(),
            ));
        }

        debug!(top = ?top_three.ids, "Pipeline: ranking");
        let ranking = tokio::select! {
            res = rank_top_three(&self.registry, &prompt, &top_three.responses) => {
                res.map_err(|e| {
                    fail(
                        PipelineStage::Ranking,
                        e,
                        PartialResults {
                            responses: responses.clone(),
                            evaluations: evaluations.clone(),
                            top_three: top_three.ids.clone(),
                        },
                    )
                })?
            }
            _ = cancel_raised(cancel_flag) => {
                return Err(fail(
                    PipelineStage::Ranking,
                    PipelineError::Cancelled,
                    PartialResults::default(),
                ));
            }
        };

        Ok(PipelineResult {
            prompt,
            selected_models: model_ids,
            responses,
            evaluations,
            top_three: top_three.ids,
            ranking,
            user_choice: None,
        })
    }
}
