//! # Pipelines
//!
//! Behavior chains wrapped around terminal handlers, plus the built-in behaviors.
//!
//! - [`composer`] - request pipelines ([`PipelineBehavior`], [`Next`])
//! - [`stream`] - stream pipelines ([`StreamPipelineBehavior`], [`StreamNext`])
//! - [`ranking`] - specificity ranking of exception handler candidates
//! - [`exception_recovery`] / [`exception_action`] - failure handling behaviors
//! - [`processors`] - pre- and post-processor behaviors

pub mod composer;
pub mod exception_action;
pub mod exception_recovery;
pub mod processors;
pub mod ranking;
pub mod stream;

pub use composer::{Next, PipelineBehavior, PipelineComposer};
pub use exception_action::ExceptionActionBehavior;
pub use exception_recovery::ExceptionRecoveryBehavior;
pub use processors::{PostProcessorBehavior, PreProcessorBehavior};
pub use ranking::{Candidate, HandlerSpecificityRanker, Ranked};
pub use stream::{ItemStream, StreamNext, StreamPipelineBehavior, StreamPipelineComposer};
