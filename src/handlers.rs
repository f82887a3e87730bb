//! # Handler Contracts
//!
//! Traits implemented by application code and resolved through the service locator.
//!
//! ## Overview
//!
//! | Contract | Resolved | Returns |
//! |----------|----------|---------|
//! | [`QueryHandler`] | exactly one per query type | the query's response |
//! | [`CommandHandler`] | exactly one per command type | nothing |
//! | [`StreamQueryHandler`] | exactly one per stream query type | a lazy [`ItemStream`] |
//! | [`NotificationHandler`] | zero or more per notification type | nothing |
//! | [`ExceptionHandler`] | zero or more per (request, response, fault kind) | may recover with a response |
//! | [`ExceptionAction`] | zero or more per (request, fault kind) | side effects only |
//! | [`RequestPreProcessor`] / [`RequestPostProcessor`] | zero or more per request | side effects only |
//!
//! Every fallible method returns [`Failure`]; any [`Fault`](crate::failure::Fault)
//! converts into it with `?`.

use crate::failure::Failure;
use crate::messages::{Command, Notification, Query, StreamQuery, TypeKey};
use crate::pipeline::stream::ItemStream;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Handles a query and produces its response
#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync + 'static {
    async fn handle(
        &self,
        query: &Q,
        cancellation: &CancellationToken,
    ) -> Result<Q::Response, Failure>;
}

/// Handles a command
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync + 'static {
    async fn handle(&self, command: &C, cancellation: &CancellationToken) -> Result<(), Failure>;
}

/// Produces the lazy item sequence for a stream query.
///
/// Implementations must not produce items eagerly; the returned stream is pulled
/// by the consumer through every stream behavior.
pub trait StreamQueryHandler<S: StreamQuery>: Send + Sync + 'static {
    fn handle(&self, query: Arc<S>, cancellation: CancellationToken) -> ItemStream<S::Item>;
}

/// Handles one notification type; any number may be registered
#[async_trait]
pub trait NotificationHandler<N: Notification>: Send + Sync + 'static {
    async fn handle(&self, notification: &N, cancellation: &CancellationToken)
        -> Result<(), Failure>;
}

/// Per-invocation recovery state shared by the exception handlers of one failure.
#[derive(Debug)]
pub struct ExceptionHandlerState<R> {
    handled: bool,
    response: Option<R>,
}

impl<R> ExceptionHandlerState<R> {
    pub fn new() -> Self {
        Self {
            handled: false,
            response: None,
        }
    }

    /// Mark the failure as handled and supply the response returned to the caller
    pub fn set_handled(&mut self, response: R) {
        self.handled = true;
        self.response = Some(response);
    }

    /// Mark the failure as handled without supplying a response.
    ///
    /// The recovery behavior treats this as not recovered and re-raises the
    /// original failure.
    pub fn mark_handled(&mut self) {
        self.handled = true;
    }

    pub fn is_handled(&self) -> bool {
        self.handled
    }

    pub fn response(&self) -> Option<&R> {
        self.response.as_ref()
    }

    pub(crate) fn into_response(self) -> Option<R> {
        if self.handled {
            self.response
        } else {
            None
        }
    }
}

impl<R> Default for ExceptionHandlerState<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Attempts recovery from a failure raised while handling request `M`.
///
/// Registered per failure kind; the recovery behavior offers the failure to handlers
/// of the concrete kind first, then to handlers of each supertype.
#[async_trait]
pub trait ExceptionHandler<M, R>: Send + Sync + 'static
where
    M: Send + Sync + 'static,
    R: Send + 'static,
{
    async fn handle(
        &self,
        request: &M,
        failure: &Failure,
        state: &mut ExceptionHandlerState<R>,
        cancellation: &CancellationToken,
    ) -> Result<(), Failure>;

    /// Handler types this handler specializes; those are dropped when both match.
    fn overrides(&self) -> Vec<TypeKey> {
        Vec::new()
    }
}

/// Side effect executed for a failure raised while handling request `M`.
/// Actions never recover; the failure is re-raised after all of them ran.
#[async_trait]
pub trait ExceptionAction<M>: Send + Sync + 'static
where
    M: Send + Sync + 'static,
{
    async fn execute(
        &self,
        request: &M,
        failure: &Failure,
        cancellation: &CancellationToken,
    ) -> Result<(), Failure>;

    fn overrides(&self) -> Vec<TypeKey> {
        Vec::new()
    }
}

/// Runs before the handler of request `M`
#[async_trait]
pub trait RequestPreProcessor<M>: Send + Sync + 'static
where
    M: Send + Sync + 'static,
{
    async fn process(&self, request: &M, cancellation: &CancellationToken) -> Result<(), Failure>;
}

/// Runs after the handler of request `M` produced response `R`
#[async_trait]
pub trait RequestPostProcessor<M, R>: Send + Sync + 'static
where
    M: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    async fn process(
        &self,
        request: &M,
        response: &R,
        cancellation: &CancellationToken,
    ) -> Result<(), Failure>;
}
