//! # Exception Actions
//!
//! Pipeline behavior that runs side effects (alerting, auditing) for a failure
//! without recovering from it. Actions registered for any kind in the failure's
//! lineage run once each, most specific first, and the original failure is then
//! re-raised.

use super::composer::{Next, PipelineBehavior};
use super::ranking::{gather_candidates, HandlerSpecificityRanker};
use crate::error::MediatorError;
use crate::failure::Failure;
use crate::handlers::ExceptionAction;
use crate::registry::{ContractKey, ServiceProvider};
use async_trait::async_trait;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct ExceptionActionBehavior<M, R> {
    provider: ServiceProvider,
    _contract: PhantomData<fn(&M) -> R>,
}

impl<M, R> ExceptionActionBehavior<M, R>
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

    async fn run_actions(
        &self,
        request: &M,
        failure: &Failure,
        cancellation: &CancellationToken,
    ) -> Result<(), Failure> {
        let lineage = failure.lineage();
        let candidates = gather_candidates::<dyn ExceptionAction<M>, _, _>(
            &lineage,
            |kind| {
                self.provider
                    .get_all::<dyn ExceptionAction<M>>(&ContractKey::exception_action::<M>(kind))
            },
            |action| action.overrides(),
        )
        .map_err(MediatorError::into_failure)?;

        for candidate in HandlerSpecificityRanker::new(lineage).rank(candidates) {
            debug!(
                failure_kind = %failure.kind().short_name(),
                action = %candidate.service.implementation().short_name(),
                "Executing exception action"
            );
            candidate
                .service
                .instance()
                .execute(request, failure, cancellation)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<M, R> PipelineBehavior<M, R> for ExceptionActionBehavior<M, R>
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
            Err(failure) => {
                self.run_actions(request, &failure, cancellation).await?;
                Err(failure)
            }
        }
    }
}
