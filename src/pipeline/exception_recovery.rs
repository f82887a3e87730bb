//! # Exception Recovery
//!
//! Pipeline behavior that offers a failure to the registered [`ExceptionHandler`]s
//! of its kind and of every kind in its lineage, most specific first.
//!
//! ## Recovery walk
//!
//! 1. Run the rest of the chain; a success passes through untouched.
//! 2. For each kind of [`Failure::lineage`] resolve the handlers registered for
//!    `(M, R, kind)`. A handler type reached through several kinds is kept once,
//!    at its most specific kind.
//! 3. Rank the candidates with [`HandlerSpecificityRanker`].
//! 4. Invoke them in order with one shared [`ExceptionHandlerState`], stopping at
//!    the first that marks the failure handled.
//!
//! A handled state carrying a response becomes the pipeline result. Anything else
//! re-raises the original failure unchanged. A failure raised by a recovery handler
//! itself propagates as-is.

use super::composer::{Next, PipelineBehavior};
use super::ranking::{gather_candidates, HandlerSpecificityRanker};
use crate::error::MediatorError;
use crate::failure::Failure;
use crate::handlers::{ExceptionHandler, ExceptionHandlerState};
use crate::registry::{ContractKey, ServiceProvider};
use async_trait::async_trait;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Recovers failures of request `M` into a response `R` when a handler allows it
pub struct ExceptionRecoveryBehavior<M, R> {
    provider: ServiceProvider,
    _contract: PhantomData<fn(&M) -> R>,
}

impl<M, R> ExceptionRecoveryBehavior<M, R>
where
    M: Send + Sync + 'static,
    R: Send + 'static,
{
    pub fn new(provider: ServiceProvider) -> Self {
        Self {
            provider,
            _contract: PhantomData,
        }
    }

    async fn recover(
        &self,
        request: &M,
        failure: Failure,
        cancellation: &CancellationToken,
    ) -> Result<R, Failure> {
        let lineage = failure.lineage();
        let candidates = gather_candidates::<dyn ExceptionHandler<M, R>, _, _>(
            &lineage,
            |kind| {
                self.provider
                    .get_all::<dyn ExceptionHandler<M, R>>(&ContractKey::exception_handler::<M, R>(
                        kind,
                    ))
            },
            |handler| handler.overrides(),
        )
        .map_err(MediatorError::into_failure)?;

        if candidates.is_empty() {
            return Err(failure);
        }

        let ranked = HandlerSpecificityRanker::new(lineage).rank(candidates);
        let mut state = ExceptionHandlerState::new();
        for candidate in &ranked {
            debug!(
                failure_kind = %failure.kind().short_name(),
                handler = %candidate.service.implementation().short_name(),
                target = %candidate.target.short_name(),
                "Invoking exception handler"
            );
            candidate
                .service
                .instance()
                .handle(request, &failure, &mut state, cancellation)
                .await?;
            if state.is_handled() {
                break;
            }
        }

        match state.into_response() {
            Some(response) => {
                debug!(failure_kind = %failure.kind().short_name(), "Failure recovered");
                Ok(response)
            }
            None => Err(failure),
        }
    }
}

#[async_trait]
impl<M, R> PipelineBehavior<M, R> for ExceptionRecoveryBehavior<M, R>
where
    M: Send + Sync + 'static,
    R: Send + 'static,
{
    async fn handle(
        &self,
        request: &M,
        next: Next<'_, R>,
        cancellation: &CancellationToken,
    ) -> Result<R, Failure> {
        match next.run().await {
            Ok(response) => Ok(response),
            Err(failure) => self.recover(request, failure, cancellation).await,
        }
    }
}
