use super::publishers::{
    ContinueOnErrorPublisher, FireAndForgetPublisher, NotificationPublisher,
    SequentialContinuePublisher, SequentialPublisher, WaitAllPublisher, WaitAnyPublisher,
};
use crate::config::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Fan-out strategy used to deliver a notification to its handlers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStrategy {
    /// Await handlers one at a time, stop at the first failure
    #[default]
    Sequential,
    /// Await handlers one at a time, aggregate every failure
    SequentialContinueOnError,
    /// Spawn all handlers, wait for all
    ConcurrentWaitAll,
    /// Spawn all handlers, wait for the first
    ConcurrentWaitAny,
    /// Spawn all handlers, do not wait
    ConcurrentFireAndForget,
    /// Poll all handlers concurrently, aggregate every failure
    ConcurrentContinueOnError,
}

impl PublishStrategy {
    pub const ALL: [PublishStrategy; 6] = [
        PublishStrategy::Sequential,
        PublishStrategy::SequentialContinueOnError,
        PublishStrategy::ConcurrentWaitAll,
        PublishStrategy::ConcurrentWaitAny,
        PublishStrategy::ConcurrentFireAndForget,
        PublishStrategy::ConcurrentContinueOnError,
    ];

    /// Publisher implementing this strategy
    pub fn publisher(self) -> Arc<dyn NotificationPublisher> {
        match self {
            PublishStrategy::Sequential => Arc::new(SequentialPublisher),
            PublishStrategy::SequentialContinueOnError => Arc::new(SequentialContinuePublisher),
            PublishStrategy::ConcurrentWaitAll => Arc::new(WaitAllPublisher),
            PublishStrategy::ConcurrentWaitAny => Arc::new(WaitAnyPublisher),
            PublishStrategy::ConcurrentFireAndForget => Arc::new(FireAndForgetPublisher),
            PublishStrategy::ConcurrentContinueOnError => Arc::new(ContinueOnErrorPublisher),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PublishStrategy::Sequential => "sequential",
            PublishStrategy::SequentialContinueOnError => "sequential_continue_on_error",
            PublishStrategy::ConcurrentWaitAll => "concurrent_wait_all",
            PublishStrategy::ConcurrentWaitAny => "concurrent_wait_any",
            PublishStrategy::ConcurrentFireAndForget => "concurrent_fire_and_forget",
            PublishStrategy::ConcurrentContinueOnError => "concurrent_continue_on_error",
        }
    }
}

impl fmt::Display for PublishStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishStrategy {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        PublishStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == normalized)
            .ok_or_else(|| {
                ConfigurationError::invalid_value(
                    "publish_strategy",
                    value,
                    "expected one of sequential, sequential_continue_on_error, \
                     concurrent_wait_all, concurrent_wait_any, concurrent_fire_and_forget, \
                     concurrent_continue_on_error",
                )
            })
    }
}
