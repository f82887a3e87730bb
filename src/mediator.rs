//! # Mediator
//!
//! Caller-facing entry point: typed and object-typed dispatch of queries, commands,
//! stream queries and notifications.
//!
//! ## Overview
//!
//! A [`Mediator`] owns a [`ServiceProvider`] for resolution, a shared
//! [`DispatchCache`] of invocation paths and a [`MediatorConfig`]. Each dispatch
//! checks the cancellation token, fetches (or builds) the path for the message
//! type and runs it. Pipeline failures reach the caller as [`MediatorError`].
//!
//! ## Usage
//!
//! ```rust
//! use async_trait::async_trait;
//! use mediator_core::failure::Failure;
//! use mediator_core::handlers::QueryHandler;
//! use mediator_core::messages::Query;
//! use mediator_core::registry::HandlerRegistry;
//! use mediator_core::Mediator;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Ping;
//! impl Query for Ping {
//!     type Response = String;
//! }
//!
//! struct PingHandler;
//!
//! #[async_trait]
//! impl QueryHandler<Ping> for PingHandler {
//!     async fn handle(&self, _query: &Ping, _c: &CancellationToken) -> Result<String, Failure> {
//!         Ok("Pong".to_string())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = HandlerRegistry::new();
//! registry.add_query_handler::<Ping, _>(PingHandler);
//!
//! let mediator = Mediator::new(registry.into_provider());
//! let pong = mediator.send(&Ping, &CancellationToken::new()).await?;
//! assert_eq!(pong, "Pong");
//! # Ok(())
//! # }
//! ```

use crate::config::MediatorConfig;
use crate::dispatch::{AnyItemStream, AnyResponse, DispatchCache, ErasedNotificationPath};
use crate::error::{MediatorError, Result};
use crate::logging::log_dispatch_operation;
use crate::messages::{Command, Notification, Query, StreamQuery, TypeKey};
use crate::notifications::{
    NotificationHandlerExecutor, NotificationPublisher, PublishStrategy, SharedNotification,
};
use crate::registry::{MessageContract, ServiceProvider};
use futures::stream::{BoxStream, StreamExt};
use std::any::{Any, TypeId};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// In-process mediator
#[derive(Clone)]
pub struct Mediator {
    provider: ServiceProvider,
    cache: Arc<DispatchCache>,
    config: MediatorConfig,
    publisher: Option<Arc<dyn NotificationPublisher>>,
}

impl Mediator {
    /// Mediator with its own dispatch cache and default configuration
    pub fn new(provider: ServiceProvider) -> Self {
        Self {
            provider,
            cache: Arc::new(DispatchCache::new()),
            config: MediatorConfig::default(),
            publisher: None,
        }
    }

    /// Share a dispatch cache with other mediators
    pub fn with_cache(mut self, cache: Arc<DispatchCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_config(mut self, config: MediatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Deliver notifications through a custom publisher instead of the configured strategy
    pub fn with_publisher(mut self, publisher: Arc<dyn NotificationPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn provider(&self) -> &ServiceProvider {
        &self.provider
    }

    pub fn cache(&self) -> &Arc<DispatchCache> {
        &self.cache
    }

    pub fn config(&self) -> &MediatorConfig {
        &self.config
    }

    /// Send a query through its pipeline to its single handler
    pub async fn send<Q: Query>(
        &self,
        query: &Q,
        cancellation: &CancellationToken,
    ) -> Result<Q::Response> {
        ensure_active(cancellation)?;
        let path = self.cache.query_path::<Q>()?;
        path.handle(query, &self.provider, cancellation).await
    }

    /// Execute a command through its pipeline to its single handler
    pub async fn execute<C: Command>(
        &self,
        command: &C,
        cancellation: &CancellationToken,
    ) -> Result<()> {
        ensure_active(cancellation)?;
        let path = self.cache.command_path::<C>()?;
        path.handle(command, &self.provider, cancellation).await
    }

    /// Send a message whose type is only known at runtime.
    ///
    /// Queries respond with their boxed response, commands with a boxed `()`. Any
    /// other contract, or a type never registered, is an invalid argument.
    pub async fn send_dyn(
        &self,
        message: &(dyn Any + Send + Sync),
        cancellation: &CancellationToken,
    ) -> Result<AnyResponse> {
        ensure_active(cancellation)?;
        let message_type = (*message).type_id();
        let path = match self.contract(message_type, "Query or Command")? {
            MessageContract::Query { path, .. } => self.cache.erased_query(message_type, path),
            MessageContract::Command { path } => self.cache.erased_command(message_type, path),
            MessageContract::Stream { path, .. } => {
                return Err(MediatorError::unrecognized_message(
                    path().message_type(),
                    "Query or Command",
                ))
            }
            MessageContract::Notification { path } => {
                return Err(MediatorError::unrecognized_message(
                    path().message_type(),
                    "Query or Command",
                ))
            }
        };
        path.invoke(message, &self.provider, cancellation).await
    }

    /// Open the lazy item stream of a stream query.
    ///
    /// The handler and stream behaviors are resolved now; items are produced only as
    /// the returned stream is polled, and production stops once `cancellation` fires.
    pub fn create_stream<S: StreamQuery>(
        &self,
        query: S,
        cancellation: &CancellationToken,
    ) -> Result<BoxStream<'static, Result<S::Item>>> {
        ensure_active(cancellation)?;
        let path = self.cache.stream_path::<S>()?;
        let items = path.open(Arc::new(query), &self.provider, cancellation)?;
        Ok(items
            .map(|item| item.map_err(MediatorError::from_failure))
            .boxed())
    }

    /// Object-typed [`Mediator::create_stream`]; items are boxed
    pub fn create_stream_dyn(
        &self,
        query: Arc<dyn Any + Send + Sync>,
        cancellation: &CancellationToken,
    ) -> Result<AnyItemStream> {
        ensure_active(cancellation)?;
        let message_type = (*query).type_id();
        match self.contract(message_type, "StreamQuery")? {
            MessageContract::Stream { path, .. } => self
                .cache
                .erased_stream(message_type, path)
                .open(query, &self.provider, cancellation),
            other => Err(unexpected_contract(&other, "StreamQuery")),
        }
    }

    /// Publish a notification with the configured strategy
    pub async fn publish<N: Notification>(
        &self,
        notification: N,
        cancellation: &CancellationToken,
    ) -> Result<()> {
        let publisher = self.default_publisher();
        self.publish_typed(notification, publisher, cancellation)
            .await
    }

    /// Publish a notification with `strategy`, overriding the configured one for this call
    pub async fn publish_with<N: Notification>(
        &self,
        notification: N,
        strategy: PublishStrategy,
        cancellation: &CancellationToken,
    ) -> Result<()> {
        self.publish_typed(notification, strategy.publisher(), cancellation)
            .await
    }

    /// Publish a notification whose type is only known at runtime
    pub async fn publish_dyn(
        &self,
        notification: Arc<dyn Any + Send + Sync>,
        cancellation: &CancellationToken,
    ) -> Result<()> {
        ensure_active(cancellation)?;
        let message_type = (*notification).type_id();
        let path = match self.contract(message_type, "Notification")? {
            MessageContract::Notification { path } => {
                self.cache.erased_notification(message_type, path)
            }
            other => return Err(unexpected_contract(&other, "Notification")),
        };
        let executors = path.executors(&self.provider)?;
        self.deliver(
            path.message_type(),
            executors,
            notification,
            self.default_publisher(),
            cancellation,
        )
        .await
    }

    async fn publish_typed<N: Notification>(
        &self,
        notification: N,
        publisher: Arc<dyn NotificationPublisher>,
        cancellation: &CancellationToken,
    ) -> Result<()> {
        ensure_active(cancellation)?;
        let path = self.cache.notification_path::<N>()?;
        let executors = path.executors(&self.provider)?;
        self.deliver(
            TypeKey::of::<N>(),
            executors,
            Arc::new(notification),
            publisher,
            cancellation,
        )
        .await
    }

    async fn deliver(
        &self,
        message_type: TypeKey,
        executors: Vec<NotificationHandlerExecutor>,
        notification: SharedNotification,
        publisher: Arc<dyn NotificationPublisher>,
        cancellation: &CancellationToken,
    ) -> Result<()> {
        let name = message_type.short_name();
        let handlers = executors.len();
        log_dispatch_operation("publish", name, "started", Some(handlers), None);

        match publisher.publish(executors, notification, cancellation).await {
            Ok(()) => {
                log_dispatch_operation("publish", name, "completed", Some(handlers), None);
                Ok(())
            }
            Err(failure) => {
                let details = failure.to_string();
                log_dispatch_operation("publish", name, "failed", Some(handlers), Some(&details));
                Err(MediatorError::from_failure(failure))
            }
        }
    }

    fn default_publisher(&self) -> Arc<dyn NotificationPublisher> {
        match &self.publisher {
            Some(publisher) => Arc::clone(publisher),
            None => self.config.default_strategy.publisher(),
        }
    }

    fn contract(&self, message_type: TypeId, expected: &str) -> Result<MessageContract> {
        self.provider
            .contract_of(message_type)
            .ok_or_else(|| MediatorError::unregistered_message(message_type, expected))
    }
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .field("custom_publisher", &self.publisher.is_some())
            .finish()
    }
}

fn ensure_active(cancellation: &CancellationToken) -> Result<()> {
    if cancellation.is_cancelled() {
        return Err(MediatorError::Cancelled);
    }
    Ok(())
}

fn unexpected_contract(contract: &MessageContract, expected: &str) -> MediatorError {
    let message_type = match contract {
        MessageContract::Query { path, .. } | MessageContract::Command { path } => {
            path().message_type()
        }
        MessageContract::Stream { path, .. } => path().message_type(),
        MessageContract::Notification { path } => path().message_type(),
    };
    MediatorError::unrecognized_message(message_type, expected)
}
