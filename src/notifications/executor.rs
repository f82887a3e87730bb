use crate::error::MediatorError;
use crate::failure::Failure;
use crate::handlers::NotificationHandler;
use crate::messages::{Notification, TypeKey};
use crate::registry::{Registered, Service};
use futures::future::BoxFuture;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A notification shared by every handler of one publish call
pub type SharedNotification = Arc<dyn Any + Send + Sync>;

/// Type-erased invocation of one notification handler
pub type NotificationCallback = Arc<
    dyn Fn(SharedNotification, CancellationToken) -> BoxFuture<'static, Result<(), Failure>>
        + Send
        + Sync,
>;

/// A resolved notification handler bound to the callback that invokes it.
///
/// Built fresh for every publish call; publishers only ever see executors, so a
/// custom [`NotificationPublisher`](super::NotificationPublisher) can change how
/// delivery happens without touching resolution.
#[derive(Clone)]
pub struct NotificationHandlerExecutor {
    handler: Service,
    handler_type: TypeKey,
    callback: NotificationCallback,
}

impl NotificationHandlerExecutor {
    pub fn new(handler: Service, handler_type: TypeKey, callback: NotificationCallback) -> Self {
        Self {
            handler,
            handler_type,
            callback,
        }
    }

    /// Bind a resolved handler for notification `N`
    pub fn for_handler<N: Notification>(registered: Registered<dyn NotificationHandler<N>>) -> Self {
        let handler_type = registered.implementation();
        let instance = Arc::clone(registered.instance());
        let callback: NotificationCallback = Arc::new(
            move |notification: SharedNotification, cancellation: CancellationToken| {
                let handler = Arc::clone(&instance);
                Box::pin(async move {
                    let notification = notification.downcast::<N>().map_err(|_| {
                        Failure::new(MediatorError::invalid_argument(format!(
                            "{} received a notification that is not {}",
                            handler_type.short_name(),
                            TypeKey::of::<N>().short_name()
                        )))
                    })?;
                    handler.handle(&notification, &cancellation).await
                }) as BoxFuture<'static, Result<(), Failure>>
            },
        );
        Self::new(Arc::new(registered), handler_type, callback)
    }

    /// The resolved handler, as a `Registered<dyn NotificationHandler<N>>`
    pub fn handler(&self) -> &Service {
        &self.handler
    }

    pub fn handler_type(&self) -> TypeKey {
        self.handler_type
    }

    /// Invoke the handler; the returned future owns everything it needs
    pub fn call(
        &self,
        notification: SharedNotification,
        cancellation: CancellationToken,
    ) -> BoxFuture<'static, Result<(), Failure>> {
        (self.callback)(notification, cancellation)
    }
}

impl fmt::Debug for NotificationHandlerExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationHandlerExecutor")
            .field("handler_type", &self.handler_type)
            .finish()
    }
}
