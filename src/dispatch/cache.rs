use super::notification_path::{ErasedNotificationPath, NotificationPath};
use super::request_path::{CommandPath, ErasedRequestPath, QueryPath};
use super::stream_path::{ErasedStreamPath, StreamPath};
use crate::error::{MediatorError, Result};
use crate::messages::{Command, Notification, Query, StreamQuery, TypeKey};
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tracing::debug;

/// Per-type cache of invocation paths.
///
/// Paths are built on first use and never evicted. Concurrent first lookups for the
/// same type converge on a single entry: the first writer wins and every later
/// lookup returns that same `Arc`. Typed and object-typed lookups share entries.
#[derive(Default)]
pub struct DispatchCache {
    queries: DashMap<TypeId, Arc<dyn ErasedRequestPath>>,
    commands: DashMap<TypeId, Arc<dyn ErasedRequestPath>>,
    streams: DashMap<TypeId, Arc<dyn ErasedStreamPath>>,
    notifications: DashMap<TypeId, Arc<dyn ErasedNotificationPath>>,
}

impl DispatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query_path<Q: Query>(&self) -> Result<Arc<QueryPath<Q>>> {
        let path = self.erased_query(TypeId::of::<Q>(), QueryPath::<Q>::erased);
        Self::typed(path.into_any(), TypeKey::of::<Q>())
    }

    pub fn command_path<C: Command>(&self) -> Result<Arc<CommandPath<C>>> {
        let path = self.erased_command(TypeId::of::<C>(), CommandPath::<C>::erased);
        Self::typed(path.into_any(), TypeKey::of::<C>())
    }

    pub fn stream_path<S: StreamQuery>(&self) -> Result<Arc<StreamPath<S>>> {
        let path = self.erased_stream(TypeId::of::<S>(), StreamPath::<S>::erased);
        Self::typed(path.into_any(), TypeKey::of::<S>())
    }

    pub fn notification_path<N: Notification>(&self) -> Result<Arc<NotificationPath<N>>> {
        let path = self.erased_notification(TypeId::of::<N>(), NotificationPath::<N>::erased);
        Self::typed(path.into_any(), TypeKey::of::<N>())
    }

    pub fn erased_query(
        &self,
        message: TypeId,
        build: fn() -> Arc<dyn ErasedRequestPath>,
    ) -> Arc<dyn ErasedRequestPath> {
        Self::cached(&self.queries, message, build, |path| path.message_type(), "query")
    }

    pub fn erased_command(
        &self,
        message: TypeId,
        build: fn() -> Arc<dyn ErasedRequestPath>,
    ) -> Arc<dyn ErasedRequestPath> {
        Self::cached(&self.commands, message, build, |path| path.message_type(), "command")
    }

    pub fn erased_stream(
        &self,
        message: TypeId,
        build: fn() -> Arc<dyn ErasedStreamPath>,
    ) -> Arc<dyn ErasedStreamPath> {
        Self::cached(&self.streams, message, build, |path| path.message_type(), "stream")
    }

    pub fn erased_notification(
        &self,
        message: TypeId,
        build: fn() -> Arc<dyn ErasedNotificationPath>,
    ) -> Arc<dyn ErasedNotificationPath> {
        Self::cached(
            &self.notifications,
            message,
            build,
            |path| path.message_type(),
            "notification",
        )
    }

    /// Number of cached paths across all message kinds
    pub fn len(&self) -> usize {
        self.queries.len() + self.commands.len() + self.streams.len() + self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached<P: ?Sized>(
        paths: &DashMap<TypeId, Arc<P>>,
        message: TypeId,
        build: fn() -> Arc<P>,
        message_type: fn(&P) -> TypeKey,
        kind: &'static str,
    ) -> Arc<P> {
        let entry = paths.entry(message).or_insert_with(|| {
            let path = build();
            debug!(
                message_type = %message_type(&*path).short_name(),
                kind = kind,
                "Cached dispatch path"
            );
            path
        });
        Arc::clone(entry.value())
    }

    fn typed<P: Send + Sync + 'static>(
        path: Arc<dyn Any + Send + Sync>,
        message_type: TypeKey,
    ) -> Result<Arc<P>> {
        path.downcast::<P>().map_err(|_| {
            MediatorError::invalid_operation(format!(
                "Cached dispatch path for {} has an unexpected type",
                message_type.short_name()
            ))
        })
    }
}

impl std::fmt::Debug for DispatchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchCache")
            .field("queries", &self.queries.len())
            .field("commands", &self.commands.len())
            .field("streams", &self.streams.len())
            .field("notifications", &self.notifications.len())
            .finish()
    }
}
