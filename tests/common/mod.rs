//! Shared messages, handlers and helpers for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use mediator_core::failure::{Failure, Fault};
use mediator_core::handlers::{CommandHandler, QueryHandler};
use mediator_core::messages::{Command, Notification, Query, StreamQuery, TypeKey};
use mediator_core::pipeline::{Next, PipelineBehavior};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct Ping {
    pub message: String,
}

impl Ping {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pong {
    pub message: String,
}

impl Query for Ping {
    type Response = Pong;
}

pub struct Jing {
    pub message: String,
}

impl Command for Jing {}

pub struct Sing {
    pub count: usize,
}

impl StreamQuery for Sing {
    type Item = Song;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub number: usize,
}

pub struct Pinged {
    pub message: String,
}

impl Notification for Pinged {}

/// Ordered log shared between handlers and the test body
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

pub struct PingHandler {
    pub journal: Journal,
}

#[async_trait]
impl QueryHandler<Ping> for PingHandler {
    async fn handle(&self, query: &Ping, _c: &CancellationToken) -> Result<Pong, Failure> {
        self.journal.record("Handler");
        Ok(Pong {
            message: format!("{} Pong", query.message),
        })
    }
}

pub struct JingHandler {
    pub journal: Journal,
}

#[async_trait]
impl CommandHandler<Jing> for JingHandler {
    async fn handle(&self, command: &Jing, _c: &CancellationToken) -> Result<(), Failure> {
        self.journal.record(format!("{} Jing", command.message));
        Ok(())
    }
}

/// Behavior recording `"<name> before"` / `"<name> after"` around the rest of the chain.
///
/// Generic over a marker so several can be registered as distinct types.
pub struct Outer<K> {
    pub name: &'static str,
    pub journal: Journal,
    pub _marker: std::marker::PhantomData<fn() -> K>,
}

impl<K: 'static> Outer<K> {
    pub fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            journal: journal.clone(),
            _marker: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<M, R, K> PipelineBehavior<M, R> for Outer<K>
where
    M: Send + Sync + 'static,
    R: Send + 'static,
    K: 'static,
{
    async fn handle(
        &self,
        _request: &M,
        next: Next<'_, R>,
        _cancellation: &CancellationToken,
    ) -> Result<R, Failure> {
        self.journal.record(format!("{} before", self.name));
        let response = next.run().await;
        self.journal.record(format!("{} after", self.name));
        response
    }
}

pub struct First;
pub struct Second;

/// Base kind of the connection failure hierarchy
#[derive(Debug, thiserror::Error)]
#[error("connection failed")]
pub struct ConnectionException;

impl Fault for ConnectionException {}

/// `PingException : ConnectionException`
#[derive(Debug, thiserror::Error)]
#[error("ping failed: {0}")]
pub struct PingException(pub String);

impl Fault for PingException {
    fn supertypes(&self) -> Vec<TypeKey> {
        vec![TypeKey::of::<ConnectionException>()]
    }
}

/// `PingResourceException : PingException : ConnectionException`
#[derive(Debug, thiserror::Error)]
#[error("ping resource missing: {0}")]
pub struct PingResourceException(pub String);

impl Fault for PingResourceException {
    fn supertypes(&self) -> Vec<TypeKey> {
        vec![
            TypeKey::of::<PingException>(),
            TypeKey::of::<ConnectionException>(),
        ]
    }
}

/// Unrelated sibling kind
#[derive(Debug, thiserror::Error)]
#[error("disk full")]
pub struct DiskFullException;

impl Fault for DiskFullException {}
