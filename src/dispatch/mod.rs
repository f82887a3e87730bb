//! # Dispatch Cache & Resolver
//!
//! Per-message-type invocation paths and the cache that holds them.
//!
//! ## Overview
//!
//! An invocation path knows, for one message type, which contracts to resolve: the
//! terminal handler and the behavior list. Paths are built once per type inside a
//! [`DispatchCache`] and reused for every later dispatch. Each path resolves its
//! handler before its behaviors, so a missing or ambiguous handler is reported
//! before any behavior runs.
//!
//! ```text
//! Mediator ──► DispatchCache ──► QueryPath<Q> / CommandPath<C> / StreamPath<S> / NotificationPath<N>
//!                                    │
//!                                    └──► ServiceProvider (handler, behaviors) ──► composer
//! ```
//!
//! The `Erased*Path` traits let object-typed dispatch run a path whose message type
//! is only known at runtime.

pub mod cache;
pub mod notification_path;
pub mod request_path;
pub mod stream_path;

pub use cache::DispatchCache;
pub use notification_path::{ErasedNotificationPath, NotificationPath};
pub use request_path::{AnyResponse, CommandPath, ErasedRequestPath, QueryPath};
pub use stream_path::{AnyItemStream, ErasedStreamPath, StreamPath};
