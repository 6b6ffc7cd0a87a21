#![forbid(unsafe_code)]

//! # model-arena
//!
//! Run one prompt against several LLM vendors, have those same models grade
//! each other's answers, narrow the field to the three best performers, and
//! get an independent final ranking from a fixed arbiter model.
//!
//! The pipeline has four strictly sequential stages: generation fan-out,
//! cross-evaluation fan-out (with untrusted-output parsing), score
//! aggregation, and arbiter ranking. Per-model calls within a stage run
//! concurrently and failures are isolated per call; a bad provider degrades
//! its own entry instead of sinking the run.

pub mod catalog;
pub mod gateway;
pub mod pipeline;
pub mod prompts;
pub mod server;

pub use catalog::{ModelDescriptor, Vendor, ARBITER_MODEL, AVAILABLE_MODELS};
pub use gateway::{AdapterRegistry, ProviderAdapter, ProviderError};
pub use pipeline::{
    EvaluationRecord, GeneratedResponse, PartialResults, PipelineController, PipelineError,
    PipelineFailure, PipelineResult, PipelineStage, Prompt, RankingOutcome,
};
