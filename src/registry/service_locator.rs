//! # Service Locator Boundary
//!
//! The seam between the dispatch engine and whatever owns handler registrations.
//!
//! ## Overview
//!
//! The engine never constructs handlers. It asks a [`ServiceLocator`] for services by
//! [`ContractKey`] in two modes:
//!
//! - **get one** ([`ServiceLocator::resolve_one`]) - exactly one registration, fails on
//!   zero or many
//! - **get all** ([`ServiceLocator::resolve_all`]) - every registration in registration
//!   order, empty if none
//!
//! Services travel as `Arc<dyn Any>` holding a [`Registered<T>`]; the typed accessors
//! on [`ServiceProvider`] downcast them back to the contract trait object.
//!
//! Object-typed dispatch additionally needs to know which contract a message type
//! satisfies; [`ServiceLocator::contract_of`] answers with a [`MessageContract`].

use crate::dispatch::{
    CommandPath, ErasedNotificationPath, ErasedRequestPath, ErasedStreamPath, NotificationPath,
    QueryPath, StreamPath,
};
use crate::error::{MediatorError, Result};
use crate::messages::{Command, Notification, Query, StreamQuery, TypeKey};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A resolved service instance, type-erased for transport across the locator seam
pub type Service = Arc<dyn Any + Send + Sync>;

/// What a registration provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractRole {
    QueryHandler,
    CommandHandler,
    StreamHandler,
    NotificationHandler,
    PipelineBehavior,
    StreamBehavior,
    ExceptionHandler,
    ExceptionAction,
    PreProcessor,
    PostProcessor,
}

impl fmt::Display for ContractRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContractRole::QueryHandler => "QueryHandler",
            ContractRole::CommandHandler => "CommandHandler",
            ContractRole::StreamHandler => "StreamQueryHandler",
            ContractRole::NotificationHandler => "NotificationHandler",
            ContractRole::PipelineBehavior => "PipelineBehavior",
            ContractRole::StreamBehavior => "StreamPipelineBehavior",
            ContractRole::ExceptionHandler => "ExceptionHandler",
            ContractRole::ExceptionAction => "ExceptionAction",
            ContractRole::PreProcessor => "RequestPreProcessor",
            ContractRole::PostProcessor => "RequestPostProcessor",
        };
        f.write_str(name)
    }
}

/// Identifies a contract: role plus the message, response and fault types it binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractKey {
    pub role: ContractRole,
    pub message: TypeKey,
    pub response: Option<TypeKey>,
    pub fault: Option<TypeKey>,
}

impl ContractKey {
    fn new(role: ContractRole, message: TypeKey, response: Option<TypeKey>) -> Self {
        Self {
            role,
            message,
            response,
            fault: None,
        }
    }

    pub fn query_handler<Q: Query>() -> Self {
        Self::new(
            ContractRole::QueryHandler,
            TypeKey::of::<Q>(),
            Some(TypeKey::of::<Q::Response>()),
        )
    }

    pub fn command_handler<C: Command>() -> Self {
        Self::new(ContractRole::CommandHandler, TypeKey::of::<C>(), None)
    }

    pub fn stream_handler<S: StreamQuery>() -> Self {
        Self::new(
            ContractRole::StreamHandler,
            TypeKey::of::<S>(),
            Some(TypeKey::of::<S::Item>()),
        )
    }

    pub fn notification_handler<N: Notification>() -> Self {
        Self::new(ContractRole::NotificationHandler, TypeKey::of::<N>(), None)
    }

    pub fn pipeline_behavior<M: 'static, R: 'static>() -> Self {
        Self::new(
            ContractRole::PipelineBehavior,
            TypeKey::of::<M>(),
            Some(TypeKey::of::<R>()),
        )
    }

    pub fn stream_behavior<S: StreamQuery>() -> Self {
        Self::new(
            ContractRole::StreamBehavior,
            TypeKey::of::<S>(),
            Some(TypeKey::of::<S::Item>()),
        )
    }

    /// Recovery handlers for request `M` producing `R`, registered for fault kind `fault`
    pub fn exception_handler<M: 'static, R: 'static>(fault: TypeKey) -> Self {
        Self {
            fault: Some(fault),
            ..Self::new(
                ContractRole::ExceptionHandler,
                TypeKey::of::<M>(),
                Some(TypeKey::of::<R>()),
            )
        }
    }

    pub fn exception_action<M: 'static>(fault: TypeKey) -> Self {
        Self {
            fault: Some(fault),
            ..Self::new(ContractRole::ExceptionAction, TypeKey::of::<M>(), None)
        }
    }

    pub fn pre_processor<M: 'static>() -> Self {
        Self::new(ContractRole::PreProcessor, TypeKey::of::<M>(), None)
    }

    pub fn post_processor<M: 'static, R: 'static>() -> Self {
        Self::new(
            ContractRole::PostProcessor,
            TypeKey::of::<M>(),
            Some(TypeKey::of::<R>()),
        )
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}", self.role, self.message.short_name())?;
        if let Some(response) = self.response {
            write!(f, " -> {}", response.short_name())?;
        }
        if let Some(fault) = self.fault {
            write!(f, ", {}", fault.short_name())?;
        }
        f.write_str(">")
    }
}

/// A service instance together with the concrete type that implements it.
pub struct Registered<T: ?Sized> {
    instance: Arc<T>,
    implementation: TypeKey,
}

impl<T: ?Sized> Registered<T> {
    pub fn new(instance: Arc<T>, implementation: TypeKey) -> Self {
        Self {
            instance,
            implementation,
        }
    }

    pub fn instance(&self) -> &Arc<T> {
        &self.instance
    }

    pub fn into_instance(self) -> Arc<T> {
        self.instance
    }

    /// Concrete type registered for the contract
    pub fn implementation(&self) -> TypeKey {
        self.implementation
    }
}

impl<T: ?Sized> Clone for Registered<T> {
    fn clone(&self) -> Self {
        Self {
            instance: Arc::clone(&self.instance),
            implementation: self.implementation,
        }
    }
}

impl<T: ?Sized> fmt::Debug for Registered<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registered")
            .field("implementation", &self.implementation)
            .finish()
    }
}

/// Which dispatch contract a message type satisfies, with the factory for its path.
#[derive(Clone, Copy)]
pub enum MessageContract {
    Query {
        response: TypeKey,
        path: fn() -> Arc<dyn ErasedRequestPath>,
    },
    Command {
        path: fn() -> Arc<dyn ErasedRequestPath>,
    },
    Stream {
        item: TypeKey,
        path: fn() -> Arc<dyn ErasedStreamPath>,
    },
    Notification {
        path: fn() -> Arc<dyn ErasedNotificationPath>,
    },
}

impl MessageContract {
    pub fn query<Q: Query>() -> Self {
        Self::Query {
            response: TypeKey::of::<Q::Response>(),
            path: QueryPath::<Q>::erased,
        }
    }

    pub fn command<C: Command>() -> Self {
        Self::Command {
            path: CommandPath::<C>::erased,
        }
    }

    pub fn stream<S: StreamQuery>() -> Self {
        Self::Stream {
            item: TypeKey::of::<S::Item>(),
            path: StreamPath::<S>::erased,
        }
    }

    pub fn notification<N: Notification>() -> Self {
        Self::Notification {
            path: NotificationPath::<N>::erased,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Query { .. } => "Query",
            Self::Command { .. } => "Command",
            Self::Stream { .. } => "StreamQuery",
            Self::Notification { .. } => "Notification",
        }
    }
}

impl fmt::Debug for MessageContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query { response, .. } => write!(f, "Query(-> {response})"),
            Self::Command { .. } => f.write_str("Command"),
            Self::Stream { item, .. } => write!(f, "StreamQuery(-> {item})"),
            Self::Notification { .. } => f.write_str("Notification"),
        }
    }
}

/// Resolves registered services by contract.
pub trait ServiceLocator: Send + Sync + 'static {
    /// Every registration for `key` in registration order; empty if none
    fn resolve_all(&self, key: &ContractKey, provider: &ServiceProvider) -> Vec<Service>;

    /// The single registration for `key`; zero or several is an error
    fn resolve_one(&self, key: &ContractKey, provider: &ServiceProvider) -> Result<Service> {
        let mut services = self.resolve_all(key, provider);
        match (services.pop(), services.len()) {
            (Some(service), 0) => Ok(service),
            (Some(_), others) => Err(MediatorError::ambiguous_handler(
                key.to_string(),
                others + 1,
            )),
            (None, _) => Err(MediatorError::handler_not_found(key.to_string())),
        }
    }

    /// The dispatch contract a message type was registered under
    fn contract_of(&self, message: TypeId) -> Option<MessageContract>;
}

/// Cloneable handle to a locator, passed to service factories and behaviors.
#[derive(Clone)]
pub struct ServiceProvider {
    locator: Arc<dyn ServiceLocator>,
}

impl ServiceProvider {
    pub fn new(locator: Arc<dyn ServiceLocator>) -> Self {
        Self { locator }
    }

    pub fn locator(&self) -> &Arc<dyn ServiceLocator> {
        &self.locator
    }

    /// Resolve exactly one service and downcast it to its contract
    pub fn get_one<T>(&self, key: &ContractKey) -> Result<Registered<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let service = self.locator.resolve_one(key, self)?;
        Self::downcast(key, &service)
    }

    /// Resolve all services for a contract in registration order
    pub fn get_all<T>(&self, key: &ContractKey) -> Result<Vec<Registered<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.locator
            .resolve_all(key, self)
            .iter()
            .map(|service| Self::downcast(key, service))
            .collect()
    }

    pub fn contract_of(&self, message: TypeId) -> Option<MessageContract> {
        self.locator.contract_of(message)
    }

    fn downcast<T>(key: &ContractKey, service: &Service) -> Result<Registered<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        service
            .downcast_ref::<Registered<T>>()
            .cloned()
            .ok_or_else(|| {
                MediatorError::invalid_operation(format!(
                    "Service registered for {key} does not provide {}",
                    std::any::type_name::<T>()
                ))
            })
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider").finish_non_exhaustive()
    }
}
