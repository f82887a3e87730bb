//! Invocation paths for single-response requests: queries and commands.

use crate::error::{MediatorError, Result};
use crate::handlers::{CommandHandler, QueryHandler};
use crate::messages::{Command, Query, TypeKey};
use crate::pipeline::{PipelineBehavior, PipelineComposer};
use crate::registry::{ContractKey, ServiceProvider};
use futures::future::BoxFuture;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Boxed response of an object-typed request
pub type AnyResponse = Box<dyn Any + Send>;

/// A request path invocable without knowing the message type statically
pub trait ErasedRequestPath: Send + Sync + 'static {
    fn message_type(&self) -> TypeKey;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Dispatch a type-erased message; commands respond with a boxed `()`
    fn invoke<'a>(
        &'a self,
        message: &'a (dyn Any + Send + Sync),
        provider: &'a ServiceProvider,
        cancellation: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<AnyResponse>>;
}

pub(crate) fn resolve_behaviors<M, R>(
    provider: &ServiceProvider,
    key: &ContractKey,
) -> Result<Vec<Arc<dyn PipelineBehavior<M, R>>>>
where
    M: Send + Sync + 'static,
    R: Send + 'static,
{
    Ok(provider
        .get_all::<dyn PipelineBehavior<M, R>>(key)?
        .into_iter()
        .map(|behavior| behavior.into_instance())
        .collect())
}

fn downcast_message<'a, M: 'static>(message: &'a (dyn Any + Send + Sync)) -> Result<&'a M> {
    message.downcast_ref::<M>().ok_or_else(|| {
        MediatorError::invalid_argument(format!(
            "Dispatch path for {} received a different message type",
            TypeKey::of::<M>().short_name()
        ))
    })
}

/// Cached invocation path for query `Q`
pub struct QueryPath<Q: Query> {
    handler_key: ContractKey,
    behavior_key: ContractKey,
    _message: PhantomData<fn(&Q)>,
}

impl<Q: Query> QueryPath<Q> {
    pub fn new() -> Self {
        Self {
            handler_key: ContractKey::query_handler::<Q>(),
            behavior_key: ContractKey::pipeline_behavior::<Q, Q::Response>(),
            _message: PhantomData,
        }
    }

    pub fn erased() -> Arc<dyn ErasedRequestPath> {
        Arc::new(Self::new())
    }

    /// Resolve the handler and behaviors, then run the composed pipeline
    pub async fn handle(
        &self,
        query: &Q,
        provider: &ServiceProvider,
        cancellation: &CancellationToken,
    ) -> Result<Q::Response> {
        let handler = provider
            .get_one::<dyn QueryHandler<Q>>(&self.handler_key)?
            .into_instance();
        let behaviors = resolve_behaviors::<Q, Q::Response>(provider, &self.behavior_key)?;
        debug!(
            message_type = %TypeKey::of::<Q>().short_name(),
            behaviors = behaviors.len(),
            "Dispatching query"
        );

        PipelineComposer::compose(query, &behaviors, cancellation, move |token| {
            Box::pin(async move { handler.handle(query, &token).await })
        })
        .run()
        .await
        .map_err(MediatorError::from_failure)
    }
}

impl<Q: Query> Default for QueryPath<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q: Query> ErasedRequestPath for QueryPath<Q> {
    fn message_type(&self) -> TypeKey {
        TypeKey::of::<Q>()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn invoke<'a>(
        &'a self,
        message: &'a (dyn Any + Send + Sync),
        provider: &'a ServiceProvider,
        cancellation: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<AnyResponse>> {
        Box::pin(async move {
            let query = downcast_message::<Q>(message)?;
            let response = self.handle(query, provider, cancellation).await?;
            Ok(Box::new(response) as AnyResponse)
        })
    }
}

/// Cached invocation path for command `C`
pub struct CommandPath<C: Command> {
    handler_key: ContractKey,
    behavior_key: ContractKey,
    _message: PhantomData<fn(&C)>,
}

impl<C: Command> CommandPath<C> {
    pub fn new() -> Self {
        Self {
            handler_key: ContractKey::command_handler::<C>(),
            behavior_key: ContractKey::pipeline_behavior::<C, ()>(),
            _message: PhantomData,
        }
    }

    pub fn erased() -> Arc<dyn ErasedRequestPath> {
        Arc::new(Self::new())
    }

    pub async fn handle(
        &self,
        command: &C,
        provider: &ServiceProvider,
        cancellation: &CancellationToken,
    ) -> Result<()> {
        let handler = provider
            .get_one::<dyn CommandHandler<C>>(&self.handler_key)?
            .into_instance();
        let behaviors = resolve_behaviors::<C, ()>(provider, &self.behavior_key)?;
        debug!(
            message_type = %TypeKey::of::<C>().short_name(),
            behaviors = behaviors.len(),
            "Dispatching command"
        );

        PipelineComposer::compose(command, &behaviors, cancellation, move |token| {
            Box::pin(async move { handler.handle(command, &token).await })
        })
        .run()
        .await
        .map_err(MediatorError::from_failure)
    }
}

impl<C: Command> Default for CommandPath<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Command> ErasedRequestPath for CommandPath<C> {
    fn message_type(&self) -> TypeKey {
        TypeKey::of::<C>()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn invoke<'a>(
        &'a self,
        message: &'a (dyn Any + Send + Sync),
        provider: &'a ServiceProvider,
        cancellation: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<AnyResponse>> {
        Box::pin(async move {
            let command = downcast_message::<C>(message)?;
            self.handle(command, provider, cancellation).await?;
            Ok(Box::new(()) as AnyResponse)
        })
    }
}
