#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Mediator Core Rust
//!
//! In-process mediator for async Rust: typed request dispatch, behavior pipelines,
//! lazily pulled streaming queries and notification fan-out.
//!
//! ## Overview
//!
//! Callers submit messages to a [`Mediator`] without knowing who handles them.
//! Handlers and behaviors are registered in a [`HandlerRegistry`] (or any other
//! [`ServiceLocator`](registry::ServiceLocator)); the mediator resolves them per
//! message type, composes the behaviors around the terminal handler and caches the
//! resulting invocation path.
//!
//! ## Key Features
//!
//! - **Requests**: queries with a typed response, commands without one
//! - **Pipelines**: ordered behaviors wrapping every request, with short-circuiting
//! - **Exception recovery**: handlers selected by failure kind, most specific first
//! - **Streams**: behaviors that transform a lazy item sequence, stopped by one token
//! - **Notifications**: six fan-out strategies, from sequential to fire-and-forget
//! - **Object-typed dispatch**: `send_dyn`, `create_stream_dyn`, `publish_dyn`
//!
//! ## Module Organization
//!
//! - [`messages`] - message contracts and runtime type identity
//! - [`handlers`] - handler, exception handler and processor traits
//! - [`failure`] - handler failures and their kind lineage
//! - [`registry`] - service locator seam and the in-memory registry
//! - [`dispatch`] - invocation paths and the dispatch cache
//! - [`pipeline`] - request and stream composers and the built-in behaviors
//! - [`notifications`] - fan-out publishers and strategies
//! - [`mediator`] - the caller-facing facade
//! - [`config`] - strategy configuration from files and environment
//! - [`logging`] - structured logging setup
//! - [`error`] - structured error handling
//!
//! ## Quick Start
//!
//! ```rust
//! use async_trait::async_trait;
//! use mediator_core::failure::Failure;
//! use mediator_core::handlers::NotificationHandler;
//! use mediator_core::messages::Notification;
//! use mediator_core::{HandlerRegistry, Mediator, PublishStrategy};
//! use tokio_util::sync::CancellationToken;
//!
//! struct Pinged;
//! impl Notification for Pinged {}
//!
//! struct Audit;
//!
//! #[async_trait]
//! impl NotificationHandler<Pinged> for Audit {
//!     async fn handle(&self, _n: &Pinged, _c: &CancellationToken) -> Result<(), Failure> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = HandlerRegistry::new();
//! registry.add_notification_handler::<Pinged, _>(Audit);
//!
//! let mediator = Mediator::new(registry.into_provider());
//! mediator
//!     .publish_with(Pinged, PublishStrategy::ConcurrentWaitAll, &CancellationToken::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod failure;
pub mod handlers;
pub mod logging;
pub mod mediator;
pub mod messages;
pub mod notifications;
pub mod pipeline;
pub mod registry;

pub use config::{ConfigLoader, ExceptionActionStrategy, MediatorConfig};
pub use dispatch::DispatchCache;
pub use error::{MediatorError, Result};
pub use failure::{AggregateFailure, Failure, Fault};
pub use mediator::Mediator;
pub use messages::{Command, Notification, Query, StreamQuery, TypeKey};
pub use notifications::{NotificationPublisher, PublishStrategy};
pub use registry::{HandlerRegistry, ServiceProvider};
