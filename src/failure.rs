//! # Handler Failures
//!
//! Failure values raised by handlers and pipeline behaviors.
//!
//! ## Overview
//!
//! Rust error types have no inheritance, yet recovery handlers need "catch this kind
//! or any of its parents" semantics. A [`Fault`] is an error type that declares its
//! supertype chain explicitly; a [`Failure`] is the cloneable, type-erased carrier the
//! pipeline passes around. The lineage of a failure is:
//!
//! ```text
//! concrete kind -> declared supertypes (nearest first) -> root `dyn Fault`
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use mediator_core::failure::{Failure, Fault};
//! use mediator_core::messages::TypeKey;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("connection failed")]
//! struct ConnectionError;
//! impl Fault for ConnectionError {}
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("timed out")]
//! struct TimeoutError;
//! impl Fault for TimeoutError {
//!     fn supertypes(&self) -> Vec<TypeKey> {
//!         vec![TypeKey::of::<ConnectionError>()]
//!     }
//! }
//!
//! let failure = Failure::new(TimeoutError);
//! assert_eq!(failure.lineage()[1], TypeKey::of::<ConnectionError>());
//! assert!(failure.is::<TimeoutError>());
//! ```

use crate::error::MediatorError;
use crate::messages::TypeKey;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Object-safe access to the concrete type behind a trait object.
///
/// Blanket-implemented for every sized `'static` type; callers go through the
/// [`Fault`] vtable so the answer describes the concrete error, not the wrapper.
pub trait Reflect: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn type_key(&self) -> TypeKey;
}

impl<T: Any + Send + Sync> Reflect for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }
}

/// An error type that can flow through the mediator pipeline.
pub trait Fault: std::error::Error + Reflect {
    /// Kinds this fault specializes, nearest parent first. The root kind is implied.
    fn supertypes(&self) -> Vec<TypeKey> {
        Vec::new()
    }
}

/// Kind shared by every failure; the last entry of every lineage.
pub fn root_kind() -> TypeKey {
    TypeKey::of::<dyn Fault>()
}

/// Cloneable, type-erased handler failure.
///
/// Clones share the underlying fault, so a failure re-raised by the recovery
/// behavior is the very same value the handler produced ([`Failure::same_as`]).
#[derive(Clone)]
pub struct Failure {
    inner: Arc<dyn Fault>,
}

impl Failure {
    /// Wrap `fault`.
    ///
    /// A [`MediatorError`] from a nested dispatch is unwrapped to the failure it
    /// carries, so its kind and lineage stay those of the original fault.
    pub fn new<F: Fault>(fault: F) -> Self {
        match Reflect::as_any(&fault).downcast_ref::<MediatorError>() {
            Some(error) => error.clone().into_failure(),
            None => Self::wrap(fault),
        }
    }

    pub(crate) fn wrap<F: Fault>(fault: F) -> Self {
        Self {
            inner: Arc::new(fault),
        }
    }

    /// Concrete kind of the underlying fault
    pub fn kind(&self) -> TypeKey {
        Reflect::type_key(self.fault())
    }

    /// Kind hierarchy from the concrete kind up to the root kind, without repeats.
    pub fn lineage(&self) -> Vec<TypeKey> {
        let mut lineage = vec![self.kind()];
        for kind in self.fault().supertypes() {
            if !lineage.contains(&kind) {
                lineage.push(kind);
            }
        }
        let root = root_kind();
        if !lineage.contains(&root) {
            lineage.push(root);
        }
        lineage
    }

    pub fn fault(&self) -> &dyn Fault {
        &*self.inner
    }

    pub fn downcast_ref<F: Fault>(&self) -> Option<&F> {
        Reflect::as_any(self.fault()).downcast_ref::<F>()
    }

    pub fn is<F: Fault>(&self) -> bool {
        self.downcast_ref::<F>().is_some()
    }

    /// True when both values share the same underlying fault instance
    pub fn same_as(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Failure for a task that panicked instead of returning
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::new(HandlerPanicked { message })
    }
}

impl<F: Fault> From<F> for Failure {
    fn from(fault: F) -> Self {
        Self::new(fault)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("kind", &self.kind().short_name())
            .field("fault", &self.inner)
            .finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// Several failures raised by one fan-out, in the order they were observed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{} handler failure(s): {}", .failures.len(), summarize(.failures))]
pub struct AggregateFailure {
    failures: Vec<Failure>,
}

impl AggregateFailure {
    /// Builds an aggregate, flattening any nested aggregates into their constituents.
    pub fn new(failures: Vec<Failure>) -> Self {
        let mut flattened = Vec::with_capacity(failures.len());
        for failure in failures {
            match failure.downcast_ref::<AggregateFailure>() {
                Some(nested) => flattened.extend(nested.failures.iter().cloned()),
                None => flattened.push(failure),
            }
        }
        Self {
            failures: flattened,
        }
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Fault for AggregateFailure {}

fn summarize(failures: &[Failure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Raised when the cancellation token fired before or during dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Operation was cancelled")]
pub struct Cancelled;

impl Fault for Cancelled {}

/// A handler task panicked; the panic message is preserved.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Handler panicked: {message}")]
pub struct HandlerPanicked {
    pub message: String,
}

impl Fault for HandlerPanicked {}
