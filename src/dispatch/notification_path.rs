//! Invocation path for notifications: resolves every handler into an executor.

use crate::error::Result;
use crate::handlers::NotificationHandler;
use crate::messages::{Notification, TypeKey};
use crate::notifications::NotificationHandlerExecutor;
use crate::registry::{ContractKey, ServiceProvider};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

pub trait ErasedNotificationPath: Send + Sync + 'static {
    fn message_type(&self) -> TypeKey;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Executors for every registered handler, in registration order
    fn executors(&self, provider: &ServiceProvider) -> Result<Vec<NotificationHandlerExecutor>>;
}

/// Cached invocation path for notification `N`
pub struct NotificationPath<N: Notification> {
    handler_key: ContractKey,
    _message: PhantomData<fn(&N)>,
}

impl<N: Notification> NotificationPath<N> {
    pub fn new() -> Self {
        Self {
            handler_key: ContractKey::notification_handler::<N>(),
            _message: PhantomData,
        }
    }

    pub fn erased() -> Arc<dyn ErasedNotificationPath> {
        Arc::new(Self::new())
    }
}

impl<N: Notification> Default for NotificationPath<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Notification> ErasedNotificationPath for NotificationPath<N> {
    fn message_type(&self) -> TypeKey {
        TypeKey::of::<N>()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn executors(&self, provider: &ServiceProvider) -> Result<Vec<NotificationHandlerExecutor>> {
        let executors: Vec<NotificationHandlerExecutor> = provider
            .get_all::<dyn NotificationHandler<N>>(&self.handler_key)?
            .into_iter()
            .map(NotificationHandlerExecutor::for_handler::<N>)
            .collect();
        debug!(
            message_type = %TypeKey::of::<N>().short_name(),
            handlers = executors.len(),
            "Resolved notification handlers"
        );
        Ok(executors)
    }
}
