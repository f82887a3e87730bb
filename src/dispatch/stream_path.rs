//! Invocation path for stream queries.

use crate::error::{MediatorError, Result};
use crate::handlers::StreamQueryHandler;
use crate::messages::{StreamQuery, TypeKey};
use crate::pipeline::{ItemStream, StreamPipelineBehavior, StreamPipelineComposer};
use crate::registry::{ContractKey, ServiceProvider};
use futures::stream::{BoxStream, StreamExt};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Stream of boxed items produced by an object-typed stream query
pub type AnyItemStream = BoxStream<'static, Result<Box<dyn Any + Send>>>;

pub trait ErasedStreamPath: Send + Sync + 'static {
    fn message_type(&self) -> TypeKey;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Resolve and compose the pipeline for a type-erased stream query
    fn open(
        &self,
        message: Arc<dyn Any + Send + Sync>,
        provider: &ServiceProvider,
        cancellation: &CancellationToken,
    ) -> Result<AnyItemStream>;
}

/// Cached invocation path for stream query `S`
pub struct StreamPath<S: StreamQuery> {
    handler_key: ContractKey,
    behavior_key: ContractKey,
    _message: PhantomData<fn(&S)>,
}

impl<S: StreamQuery> StreamPath<S> {
    pub fn new() -> Self {
        Self {
            handler_key: ContractKey::stream_handler::<S>(),
            behavior_key: ContractKey::stream_behavior::<S>(),
            _message: PhantomData,
        }
    }

    pub fn erased() -> Arc<dyn ErasedStreamPath> {
        Arc::new(Self::new())
    }

    /// Resolve the handler and stream behaviors and compose them.
    ///
    /// Resolution happens now; no item is produced until the returned stream is polled.
    pub fn open(
        &self,
        query: Arc<S>,
        provider: &ServiceProvider,
        cancellation: &CancellationToken,
    ) -> Result<ItemStream<S::Item>> {
        let handler = provider
            .get_one::<dyn StreamQueryHandler<S>>(&self.handler_key)?
            .into_instance();
        let behaviors: Vec<Arc<dyn StreamPipelineBehavior<S>>> = provider
            .get_all::<dyn StreamPipelineBehavior<S>>(&self.behavior_key)?
            .into_iter()
            .map(|behavior| behavior.into_instance())
            .collect();
        debug!(
            message_type = %TypeKey::of::<S>().short_name(),
            behaviors = behaviors.len(),
            "Opening stream"
        );

        let request = Arc::clone(&query);
        Ok(
            StreamPipelineComposer::compose(query, &behaviors, cancellation, move |token| {
                handler.handle(request, token)
            })
            .run(),
        )
    }
}

impl<S: StreamQuery> Default for StreamPath<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: StreamQuery> ErasedStreamPath for StreamPath<S> {
    fn message_type(&self) -> TypeKey {
        TypeKey::of::<S>()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn open(
        &self,
        message: Arc<dyn Any + Send + Sync>,
        provider: &ServiceProvider,
        cancellation: &CancellationToken,
    ) -> Result<AnyItemStream> {
        let query = message.downcast::<S>().map_err(|_| {
            MediatorError::invalid_argument(format!(
                "Stream path for {} received a different message type",
                TypeKey::of::<S>().short_name()
            ))
        })?;
        let items = StreamPath::open(self, query, provider, cancellation)?;
        Ok(items
            .map(|item| {
                item.map(|value| Box::new(value) as Box<dyn Any + Send>)
                    .map_err(MediatorError::from_failure)
            })
            .boxed())
    }
}
