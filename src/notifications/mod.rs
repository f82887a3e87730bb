//! # Notification Fan-out
//!
//! Delivery of one notification to every registered handler.
//!
//! | Strategy | Execution | Failures |
//! |----------|-----------|----------|
//! | [`PublishStrategy::Sequential`] | one at a time | first failure aborts |
//! | [`PublishStrategy::SequentialContinueOnError`] | one at a time | always aggregated |
//! | [`PublishStrategy::ConcurrentWaitAll`] | spawned, all awaited | one direct, several aggregated |
//! | [`PublishStrategy::ConcurrentWaitAny`] | spawned, first awaited | first completion's outcome |
//! | [`PublishStrategy::ConcurrentFireAndForget`] | spawned, not awaited | logged only |
//! | [`PublishStrategy::ConcurrentContinueOnError`] | polled together in-task | always aggregated, panics included |

pub mod executor;
pub mod publishers;
pub mod strategy;

pub use executor::{NotificationCallback, NotificationHandlerExecutor, SharedNotification};
pub use publishers::{
    ContinueOnErrorPublisher, FireAndForgetPublisher, NotificationPublisher,
    SequentialContinuePublisher, SequentialPublisher, WaitAllPublisher, WaitAnyPublisher,
};
pub use strategy::PublishStrategy;
