//! # Notification Publishers
//!
//! One [`NotificationPublisher`] per fan-out strategy. Every publisher invokes each
//! executor exactly once per call and shares the notification through an `Arc`.

use super::executor::{NotificationHandlerExecutor, SharedNotification};
use crate::failure::{AggregateFailure, Cancelled, Failure};
use async_trait::async_trait;
use futures::future::{join_all, select_all, BoxFuture, FutureExt};
use std::panic::AssertUnwindSafe;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Delivers one notification to its resolved handlers
#[async_trait]
pub trait NotificationPublisher: Send + Sync + 'static {
    async fn publish(
        &self,
        executors: Vec<NotificationHandlerExecutor>,
        notification: SharedNotification,
        cancellation: &CancellationToken,
    ) -> Result<(), Failure>;
}

/// Awaits handlers one at a time; the first failure aborts the rest
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialPublisher;

#[async_trait]
impl NotificationPublisher for SequentialPublisher {
    async fn publish(
        &self,
        executors: Vec<NotificationHandlerExecutor>,
        notification: SharedNotification,
        cancellation: &CancellationToken,
    ) -> Result<(), Failure> {
        for executor in executors {
            if cancellation.is_cancelled() {
                return Err(Failure::new(Cancelled));
            }
            executor
                .call(notification.clone(), cancellation.clone())
                .await?;
        }
        Ok(())
    }
}

/// Awaits handlers one at a time, collecting every failure into an aggregate
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialContinuePublisher;

#[async_trait]
impl NotificationPublisher for SequentialContinuePublisher {
    async fn publish(
        &self,
        executors: Vec<NotificationHandlerExecutor>,
        notification: SharedNotification,
        cancellation: &CancellationToken,
    ) -> Result<(), Failure> {
        let mut failures = Vec::new();
        for executor in executors {
            if cancellation.is_cancelled() {
                failures.push(Failure::new(Cancelled));
                break;
            }
            if let Err(failure) = executor
                .call(notification.clone(), cancellation.clone())
                .await
            {
                debug!(
                    handler = %executor.handler_type().short_name(),
                    error = %failure,
                    "Notification handler failed, continuing"
                );
                failures.push(failure);
            }
        }
        always_aggregate(failures)
    }
}

/// Spawns every handler and waits for all of them
#[derive(Debug, Default, Clone, Copy)]
pub struct WaitAllPublisher;

#[async_trait]
impl NotificationPublisher for WaitAllPublisher {
    async fn publish(
        &self,
        executors: Vec<NotificationHandlerExecutor>,
        notification: SharedNotification,
        cancellation: &CancellationToken,
    ) -> Result<(), Failure> {
        let tasks = executors
            .iter()
            .map(|executor| tokio::spawn(executor.call(notification.clone(), cancellation.clone())));

        let mut failures = join_all(tasks)
            .await
            .into_iter()
            .filter_map(|joined| flatten_join(joined).err())
            .collect::<Vec<_>>();

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(Failure::new(AggregateFailure::new(failures))),
        }
    }
}

/// Spawns every handler and returns the outcome of whichever finishes first.
///
/// The remaining handlers keep running detached.
#[derive(Debug, Default, Clone, Copy)]
pub struct WaitAnyPublisher;

#[async_trait]
impl NotificationPublisher for WaitAnyPublisher {
    async fn publish(
        &self,
        executors: Vec<NotificationHandlerExecutor>,
        notification: SharedNotification,
        cancellation: &CancellationToken,
    ) -> Result<(), Failure> {
        if executors.is_empty() {
            return Ok(());
        }

        let tasks = executors
            .iter()
            .map(|executor| tokio::spawn(executor.call(notification.clone(), cancellation.clone())))
            .collect::<Vec<_>>();

        let (first, index, _detached) = select_all(tasks).await;
        debug!(
            handler = %executors[index].handler_type().short_name(),
            "First notification handler completed"
        );
        flatten_join(first)
    }
}

/// Spawns every handler and returns immediately; failures are only logged
#[derive(Debug, Default, Clone, Copy)]
pub struct FireAndForgetPublisher;

#[async_trait]
impl NotificationPublisher for FireAndForgetPublisher {
    async fn publish(
        &self,
        executors: Vec<NotificationHandlerExecutor>,
        notification: SharedNotification,
        cancellation: &CancellationToken,
    ) -> Result<(), Failure> {
        for executor in executors {
            let invocation = executor.call(notification.clone(), cancellation.clone());
            let handler = executor.handler_type();
            tokio::spawn(async move {
                if let Err(failure) = invocation.await {
                    warn!(
                        handler = %handler.short_name(),
                        error = %failure,
                        "Fire-and-forget notification handler failed"
                    );
                }
            });
        }
        Ok(())
    }
}

/// Polls every handler concurrently on the publishing task and aggregates all
/// failures, panics included, once they have all finished
#[derive(Debug, Default, Clone, Copy)]
pub struct ContinueOnErrorPublisher;

#[async_trait]
impl NotificationPublisher for ContinueOnErrorPublisher {
    async fn publish(
        &self,
        executors: Vec<NotificationHandlerExecutor>,
        notification: SharedNotification,
        cancellation: &CancellationToken,
    ) -> Result<(), Failure> {
        let mut failures = Vec::new();
        let mut invocations: Vec<BoxFuture<'static, Result<(), Failure>>> = Vec::new();

        for executor in &executors {
            let started = std::panic::catch_unwind(AssertUnwindSafe(|| {
                executor.call(notification.clone(), cancellation.clone())
            }));
            match started {
                Ok(invocation) => invocations.push(invocation),
                Err(payload) => failures.push(Failure::from_panic(payload)),
            }
        }

        let outcomes = join_all(
            invocations
                .into_iter()
                .map(|invocation| AssertUnwindSafe(invocation).catch_unwind()),
        )
        .await;

        for outcome in outcomes {
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(failure)) => failures.push(failure),
                Err(payload) => failures.push(Failure::from_panic(payload)),
            }
        }
        always_aggregate(failures)
    }
}

fn always_aggregate(failures: Vec<Failure>) -> Result<(), Failure> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(Failure::new(AggregateFailure::new(failures)))
    }
}

fn flatten_join(joined: Result<Result<(), Failure>, JoinError>) -> Result<(), Failure> {
    match joined {
        Ok(outcome) => outcome,
        Err(error) if error.is_panic() => Err(Failure::from_panic(error.into_panic())),
        Err(_) => Err(Failure::new(Cancelled)),
    }
}
