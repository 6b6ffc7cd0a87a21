//! Stage-fatal error taxonomy for the pipeline.

use crate::gateway::ProviderError;

/// Errors that abort a stage (and therefore the run).
///
/// Isolated per-model failures never appear here; they degrade into sentinel
/// response text or missing evaluation records and the run continues.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Rejected before any external call is made.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Aggregation found no target model with a single valid score. Reported
    /// distinctly so the caller can explain "all evaluators failed".
    #[error("no target model received a valid score")]
    NoScoredModels,

    /// The one arbiter call failed at the transport level. Fatal: the final
    /// ranking has no degraded path.
    #[error("arbiter call failed: {0}")]
    ArbiterTransport(#[from] ProviderError),

    /// The arbiter's reply did not parse as the demanded JSON shape.
    #[error("arbiter output malformed: {0}")]
    ArbiterOutput(String),

    /// The caller abandoned the run; partial results are discarded.
    #[error("run cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Short error kind for logging and HTTP bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NoScoredModels => "no_scored_models",
            Self::ArbiterTransport(_) => "arbiter_transport",
            Self::ArbiterOutput(_) => "arbiter_output",
            Self::Cancelled => "cancelled",
        }
    }
}
