//! # Stream Pipeline Composition
//!
//! Streaming counterpart of [`PipelineComposer`](super::composer::PipelineComposer).
//! Behaviors receive the lazy stream produced by the rest of the chain through a
//! [`StreamNext`] and return a (possibly transformed) stream of their own.
//!
//! Nothing is buffered: items flow one at a time from the terminal handler through
//! every layer to the consumer, and only when the consumer pulls. Every layer is
//! guarded by the cancellation token, so cancelling stops production at all levels
//! on the next poll.

use crate::failure::Failure;
use crate::messages::StreamQuery;
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Lazily pulled sequence of items or failures
pub type ItemStream<T> = BoxStream<'static, Result<T, Failure>>;

type StreamContinuation<T> = Box<dyn FnOnce(CancellationToken) -> ItemStream<T> + Send>;

/// The remainder of a stream pipeline, invoked at most once
pub struct StreamNext<T> {
    cancellation: CancellationToken,
    inner: StreamContinuation<T>,
}

impl<T: Send + 'static> StreamNext<T> {
    pub fn new<F>(cancellation: CancellationToken, inner: F) -> Self
    where
        F: FnOnce(CancellationToken) -> ItemStream<T> + Send + 'static,
    {
        Self {
            cancellation,
            inner: Box::new(inner),
        }
    }

    pub fn run(self) -> ItemStream<T> {
        (self.inner)(self.cancellation)
    }

    pub fn run_with(self, cancellation: CancellationToken) -> ItemStream<T> {
        (self.inner)(cancellation)
    }
}

/// Decorator over the item stream of stream query `S`
pub trait StreamPipelineBehavior<S: StreamQuery>: Send + Sync + 'static {
    fn handle(
        &self,
        request: Arc<S>,
        next: StreamNext<S::Item>,
        cancellation: CancellationToken,
    ) -> ItemStream<S::Item>;
}

/// Right fold of stream behaviors onto the terminal stream
pub struct StreamPipelineComposer;

impl StreamPipelineComposer {
    pub fn compose<S, T>(
        request: Arc<S>,
        behaviors: &[Arc<dyn StreamPipelineBehavior<S>>],
        cancellation: &CancellationToken,
        terminal: T,
    ) -> StreamNext<S::Item>
    where
        S: StreamQuery,
        T: FnOnce(CancellationToken) -> ItemStream<S::Item> + Send + 'static,
    {
        let innermost = StreamNext::new(cancellation.clone(), move |token: CancellationToken| {
            guard(terminal(token.clone()), token)
        });
        behaviors.iter().rev().fold(innermost, |next, behavior| {
            let behavior = Arc::clone(behavior);
            let request = Arc::clone(&request);
            StreamNext::new(cancellation.clone(), move |token: CancellationToken| {
                guard(behavior.handle(request, next, token.clone()), token)
            })
        })
    }
}

/// End `stream` as soon as `cancellation` fires
pub fn guard<T: Send + 'static>(stream: ItemStream<T>, cancellation: CancellationToken) -> ItemStream<T> {
    stream.take_until(cancellation.cancelled_owned()).boxed()
}
