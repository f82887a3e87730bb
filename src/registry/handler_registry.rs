//! # Handler Registry
//!
//! Explicit, typed registry implementing [`ServiceLocator`].
//!
//! ## Overview
//!
//! Registration is an ordinary startup step: every `add_*` method is generic over the
//! message and implementation types, so a handler can only be registered under a
//! contract it actually implements. Behind the typed surface each registration is a
//! factory keyed by [`ContractKey`]. Instance registrations clone a shared `Arc`;
//! factory registrations build a fresh service per resolution and receive the
//! [`ServiceProvider`], which is how the built-in exception and processor behaviors
//! reach the handlers they orchestrate.
//!
//! Registering a handler also records the [`MessageContract`] of its message type,
//! which object-typed dispatch uses to infer how to invoke a type-erased message.
//!
//! ## Usage
//!
//! ```rust
//! use mediator_core::failure::Failure;
//! use mediator_core::handlers::QueryHandler;
//! use mediator_core::messages::Query;
//! use mediator_core::registry::HandlerRegistry;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Ping;
//! impl Query for Ping {
//!     type Response = String;
//! }
//!
//! struct PingHandler;
//!
//! #[async_trait::async_trait]
//! impl QueryHandler<Ping> for PingHandler {
//!     async fn handle(&self, _query: &Ping, _c: &CancellationToken) -> Result<String, Failure> {
//!         Ok("Pong".to_string())
//!     }
//! }
//!
//! let registry = HandlerRegistry::new();
//! registry.add_query_handler::<Ping, _>(PingHandler);
//! assert_eq!(registry.stats().total_registrations, 1);
//! ```

use super::service_locator::{
    ContractKey, MessageContract, Registered, Service, ServiceLocator, ServiceProvider,
};
use crate::config::ExceptionActionStrategy;
use crate::handlers::{
    CommandHandler, ExceptionAction, ExceptionHandler, NotificationHandler, QueryHandler,
    RequestPostProcessor, RequestPreProcessor, StreamQueryHandler,
};
use crate::messages::{Command, Notification, Query, StreamQuery, TypeKey};
use crate::pipeline::composer::PipelineBehavior;
use crate::pipeline::exception_action::ExceptionActionBehavior;
use crate::pipeline::exception_recovery::ExceptionRecoveryBehavior;
use crate::pipeline::processors::{PostProcessorBehavior, PreProcessorBehavior};
use crate::pipeline::stream::StreamPipelineBehavior;
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type ServiceFactory = Arc<dyn Fn(&ServiceProvider) -> Service + Send + Sync>;

/// Registry statistics
#[derive(Debug, Clone)]
pub struct RegistryStats {
    pub total_registrations: usize,
    pub total_contracts: usize,
    pub message_types: usize,
}

/// In-memory typed registry of handlers, behaviors and message contracts
pub struct HandlerRegistry {
    /// Factories per contract, in registration order
    services: RwLock<HashMap<ContractKey, Vec<ServiceFactory>>>,
    /// Contract recorded for each message type
    contracts: RwLock<HashMap<TypeId, MessageContract>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            contracts: RwLock::new(HashMap::new()),
        }
    }

    /// Provider handle over this registry, for building a mediator
    pub fn into_provider(self) -> ServiceProvider {
        ServiceProvider::new(Arc::new(self))
    }

    /// Record the contract a message type satisfies without registering a handler.
    ///
    /// Needed for object-typed publishing of notifications that have no handlers.
    pub fn declare<M: 'static>(&self, contract: MessageContract) -> &Self {
        self.contracts.write().insert(TypeId::of::<M>(), contract);
        self
    }

    /// Register a query handler instance
    pub fn add_query_handler<Q, H>(&self, handler: H) -> &Self
    where
        Q: Query,
        H: QueryHandler<Q>,
    {
        self.declare::<Q>(MessageContract::query::<Q>());
        let instance: Arc<dyn QueryHandler<Q>> = Arc::new(handler);
        self.add_instance(
            ContractKey::query_handler::<Q>(),
            Registered::new(instance, TypeKey::of::<H>()),
        )
    }

    /// Register a command handler instance
    pub fn add_command_handler<C, H>(&self, handler: H) -> &Self
    where
        C: Command,
        H: CommandHandler<C>,
    {
        self.declare::<C>(MessageContract::command::<C>());
        let instance: Arc<dyn CommandHandler<C>> = Arc::new(handler);
        self.add_instance(
            ContractKey::command_handler::<C>(),
            Registered::new(instance, TypeKey::of::<H>()),
        )
    }

    /// Register a stream query handler instance
    pub fn add_stream_handler<S, H>(&self, handler: H) -> &Self
    where
        S: StreamQuery,
        H: StreamQueryHandler<S>,
    {
        self.declare::<S>(MessageContract::stream::<S>());
        let instance: Arc<dyn StreamQueryHandler<S>> = Arc::new(handler);
        self.add_instance(
            ContractKey::stream_handler::<S>(),
            Registered::new(instance, TypeKey::of::<H>()),
        )
    }

    /// Register a notification handler instance; any number may be registered
    pub fn add_notification_handler<N, H>(&self, handler: H) -> &Self
    where
        N: Notification,
        H: NotificationHandler<N>,
    {
        self.declare::<N>(MessageContract::notification::<N>());
        let instance: Arc<dyn NotificationHandler<N>> = Arc::new(handler);
        self.add_instance(
            ContractKey::notification_handler::<N>(),
            Registered::new(instance, TypeKey::of::<H>()),
        )
    }

    /// Append a pipeline behavior for request `M` producing `R`.
    ///
    /// Behaviors run outermost-first in registration order.
    pub fn add_pipeline_behavior<M, R, B>(&self, behavior: B) -> &Self
    where
        M: Send + Sync + 'static,
        R: Send + 'static,
        B: PipelineBehavior<M, R>,
    {
        let instance: Arc<dyn PipelineBehavior<M, R>> = Arc::new(behavior);
        self.add_instance(
            ContractKey::pipeline_behavior::<M, R>(),
            Registered::new(instance, TypeKey::of::<B>()),
        )
    }

    /// Append a pipeline behavior built per resolution from the provider
    pub fn add_pipeline_behavior_factory<M, R, B, F>(&self, factory: F) -> &Self
    where
        M: Send + Sync + 'static,
        R: Send + 'static,
        B: PipelineBehavior<M, R>,
        F: Fn(&ServiceProvider) -> B + Send + Sync + 'static,
    {
        self.add_factory(
            ContractKey::pipeline_behavior::<M, R>(),
            Arc::new(move |provider: &ServiceProvider| -> Service {
                let instance: Arc<dyn PipelineBehavior<M, R>> = Arc::new(factory(provider));
                Arc::new(Registered::new(instance, TypeKey::of::<B>()))
            }),
        )
    }

    /// Append a stream pipeline behavior for stream query `S`
    pub fn add_stream_behavior<S, B>(&self, behavior: B) -> &Self
    where
        S: StreamQuery,
        B: StreamPipelineBehavior<S>,
    {
        let instance: Arc<dyn StreamPipelineBehavior<S>> = Arc::new(behavior);
        self.add_instance(
            ContractKey::stream_behavior::<S>(),
            Registered::new(instance, TypeKey::of::<B>()),
        )
    }

    /// Register a recovery handler for failures of kind `E` (or any kind whose
    /// lineage contains `E`) raised while handling `M`.
    ///
    /// `E` may be a concrete [`Fault`](crate::failure::Fault) type, a marker type used
    /// as a supertype, or `dyn Fault` for every failure.
    pub fn add_exception_handler<M, R, E, H>(&self, handler: H) -> &Self
    where
        M: Send + Sync + 'static,
        R: Send + 'static,
        E: ?Sized + 'static,
        H: ExceptionHandler<M, R>,
    {
        let instance: Arc<dyn ExceptionHandler<M, R>> = Arc::new(handler);
        self.add_instance(
            ContractKey::exception_handler::<M, R>(TypeKey::of::<E>()),
            Registered::new(instance, TypeKey::of::<H>()),
        )
    }

    /// Register an exception action for failures of kind `E` raised while handling `M`
    pub fn add_exception_action<M, E, A>(&self, action: A) -> &Self
    where
        M: Send + Sync + 'static,
        E: ?Sized + 'static,
        A: ExceptionAction<M>,
    {
        let instance: Arc<dyn ExceptionAction<M>> = Arc::new(action);
        self.add_instance(
            ContractKey::exception_action::<M>(TypeKey::of::<E>()),
            Registered::new(instance, TypeKey::of::<A>()),
        )
    }

    pub fn add_pre_processor<M, P>(&self, processor: P) -> &Self
    where
        M: Send + Sync + 'static,
        P: RequestPreProcessor<M>,
    {
        let instance: Arc<dyn RequestPreProcessor<M>> = Arc::new(processor);
        self.add_instance(
            ContractKey::pre_processor::<M>(),
            Registered::new(instance, TypeKey::of::<P>()),
        )
    }

    pub fn add_post_processor<M, R, P>(&self, processor: P) -> &Self
    where
        M: Send + Sync + 'static,
        R: Send + Sync + 'static,
        P: RequestPostProcessor<M, R>,
    {
        let instance: Arc<dyn RequestPostProcessor<M, R>> = Arc::new(processor);
        self.add_instance(
            ContractKey::post_processor::<M, R>(),
            Registered::new(instance, TypeKey::of::<P>()),
        )
    }

    /// Append the exception action and exception recovery behaviors for `M`.
    ///
    /// With [`ExceptionActionStrategy::ApplyForUnhandled`] the action behavior wraps
    /// the recovery behavior, so actions only see failures no handler recovered from.
    /// With [`ExceptionActionStrategy::ApplyForAll`] the order is reversed.
    pub fn add_exception_behaviors<M, R>(&self, strategy: ExceptionActionStrategy) -> &Self
    where
        M: Send + Sync + 'static,
        R: Send + 'static,
    {
        match strategy {
            ExceptionActionStrategy::ApplyForUnhandled => {
                self.add_pipeline_behavior_factory::<M, R, _, _>(|provider| {
                    ExceptionActionBehavior::<M, R>::new(provider.clone())
                });
                self.add_pipeline_behavior_factory::<M, R, _, _>(|provider| {
                    ExceptionRecoveryBehavior::<M, R>::new(provider.clone())
                })
            }
            ExceptionActionStrategy::ApplyForAll => {
                self.add_pipeline_behavior_factory::<M, R, _, _>(|provider| {
                    ExceptionRecoveryBehavior::<M, R>::new(provider.clone())
                });
                self.add_pipeline_behavior_factory::<M, R, _, _>(|provider| {
                    ExceptionActionBehavior::<M, R>::new(provider.clone())
                })
            }
        }
    }

    /// Append the pre- and post-processor behaviors for `M`
    pub fn add_processor_behaviors<M, R>(&self) -> &Self
    where
        M: Send + Sync + 'static,
        R: Send + Sync + 'static,
    {
        self.add_pipeline_behavior_factory::<M, R, _, _>(|provider| {
            PreProcessorBehavior::<M, R>::new(provider.clone())
        });
        self.add_pipeline_behavior_factory::<M, R, _, _>(|provider| {
            PostProcessorBehavior::<M, R>::new(provider.clone())
        })
    }

    /// Get registry statistics
    pub fn stats(&self) -> RegistryStats {
        let services = self.services.read();
        RegistryStats {
            total_registrations: services.values().map(Vec::len).sum(),
            total_contracts: services.len(),
            message_types: self.contracts.read().len(),
        }
    }

    /// Number of registrations for a contract
    pub fn registrations(&self, key: &ContractKey) -> usize {
        self.services.read().get(key).map_or(0, Vec::len)
    }

    fn add_instance<T>(&self, key: ContractKey, registered: Registered<T>) -> &Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let service: Service = Arc::new(registered);
        self.add_factory(key, Arc::new(move |_: &ServiceProvider| Arc::clone(&service)))
    }

    fn add_factory(&self, key: ContractKey, factory: ServiceFactory) -> &Self {
        let mut services = self.services.write();
        let registrations = services.entry(key).or_default();
        registrations.push(factory);
        debug!(
            contract = %key,
            registrations = registrations.len(),
            "Registered service"
        );
        self
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceLocator for HandlerRegistry {
    fn resolve_all(&self, key: &ContractKey, provider: &ServiceProvider) -> Vec<Service> {
        // Clone the factories out so that factories may resolve through the provider
        let factories = match self.services.read().get(key) {
            Some(factories) => factories.clone(),
            None => return Vec::new(),
        };
        factories.iter().map(|factory| factory(provider)).collect()
    }

    fn contract_of(&self, message: TypeId) -> Option<MessageContract> {
        self.contracts.read().get(&message).copied()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("HandlerRegistry")
            .field("total_registrations", &stats.total_registrations)
            .field("total_contracts", &stats.total_contracts)
            .field("message_types", &stats.message_types)
            .finish()
    }
}
