//! # Mediator Error Types
//!
//! Structured errors surfaced to callers of the mediator, built with thiserror
//! instead of `Box<dyn Error>` patterns.
//!
//! Resolution problems (no handler, ambiguous handlers, unrecognized message
//! types) are reported before any pipeline stage runs and are never retried.
//! Failures raised inside the pipeline reach the caller as [`MediatorError::Handler`]
//! (or [`MediatorError::Aggregate`] for fan-out strategies that aggregate).

use crate::failure::{AggregateFailure, Cancelled, Failure, Fault};
use crate::messages::TypeKey;
use thiserror::Error;

/// Comprehensive mediator error types
#[derive(Error, Debug, Clone)]
pub enum MediatorError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("No handler registered for {contract}")]
    HandlerNotFound { contract: String },

    #[error("Ambiguous handlers for {contract}: {candidates} registrations found, expected exactly one")]
    AmbiguousHandler { contract: String, candidates: usize },

    #[error("Operation was cancelled")]
    Cancelled,

    #[error(transparent)]
    Handler(Failure),

    #[error(transparent)]
    Aggregate(AggregateFailure),
}

impl MediatorError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an invalid operation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create a handler not found error
    pub fn handler_not_found(contract: impl Into<String>) -> Self {
        Self::HandlerNotFound {
            contract: contract.into(),
        }
    }

    /// Create an ambiguous handler error
    pub fn ambiguous_handler(contract: impl Into<String>, candidates: usize) -> Self {
        Self::AmbiguousHandler {
            contract: contract.into(),
            candidates,
        }
    }

    /// Error for a type-erased message that satisfies no recognized contract
    pub fn unrecognized_message(message_type: TypeKey, expected: &str) -> Self {
        Self::invalid_argument(format!(
            "{} does not implement {expected}",
            message_type.short_name()
        ))
    }

    /// Error for a type-erased message whose type was never registered
    pub fn unregistered_message(message: std::any::TypeId, expected: &str) -> Self {
        Self::invalid_argument(format!(
            "Message type {message:?} has no registered contract, expected {expected}"
        ))
    }

    /// Map a pipeline failure back onto the caller-facing error.
    ///
    /// Nested mediator errors (a handler that dispatched another message and
    /// propagated its error with `?`) are unwrapped rather than double wrapped.
    pub fn from_failure(failure: Failure) -> Self {
        if let Some(error) = failure.downcast_ref::<MediatorError>() {
            return error.clone();
        }
        if let Some(aggregate) = failure.downcast_ref::<AggregateFailure>() {
            return Self::Aggregate(aggregate.clone());
        }
        if failure.is::<Cancelled>() {
            return Self::Cancelled;
        }
        Self::Handler(failure)
    }

    /// Convert into a pipeline failure, unwrapping handler failures so they keep
    /// their identity when crossing a nested dispatch.
    pub fn into_failure(self) -> Failure {
        match self {
            Self::Handler(failure) => failure,
            Self::Aggregate(aggregate) => Failure::new(aggregate),
            Self::Cancelled => Failure::new(Cancelled),
            other => Failure::wrap(other),
        }
    }

    /// The handler failure behind this error, if any
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Handler(failure) => Some(failure),
            _ => None,
        }
    }

    /// True for errors raised while resolving handlers, before any stage ran
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. }
                | Self::InvalidOperation { .. }
                | Self::HandlerNotFound { .. }
                | Self::AmbiguousHandler { .. }
        )
    }
}

impl Fault for MediatorError {}

/// Conversion from pipeline failures
impl From<Failure> for MediatorError {
    fn from(failure: Failure) -> Self {
        Self::from_failure(failure)
    }
}

/// Result type alias for mediator operations
pub type Result<T, E = MediatorError> = std::result::Result<T, E>;
