//! # Message Contracts
//!
//! Marker traits that classify what a caller can submit to the mediator, plus the
//! runtime type identity used to key handlers, behaviors and cached invocation paths.
//!
//! ## Contracts
//!
//! - [`Command`] - a request with exactly one handler and no response
//! - [`Query`] - a request with exactly one handler and a typed response
//! - [`StreamQuery`] - a request whose handler yields a lazy sequence of items
//! - [`Notification`] - a broadcast with zero or more independent handlers
//!
//! ## Usage
//!
//! ```rust
//! use mediator_core::messages::{Command, Notification, Query, StreamQuery};
//!
//! struct Ping { message: String }
//! struct Pong { message: String }
//!
//! impl Query for Ping {
//!     type Response = Pong;
//! }
//!
//! struct Jing;
//! impl Command for Jing {}
//!
//! struct Sing { count: usize }
//! impl StreamQuery for Sing {
//!     type Item = String;
//! }
//!
//! struct Pinged;
//! impl Notification for Pinged {}
//! ```

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A request handled by exactly one handler that produces no response.
pub trait Command: Send + Sync + 'static {}

/// A request handled by exactly one handler that produces a typed response.
pub trait Query: Send + Sync + 'static {
    type Response: Send + 'static;
}

/// A request whose single handler produces a lazily pulled sequence of items.
pub trait StreamQuery: Send + Sync + 'static {
    type Item: Send + 'static;
}

/// A broadcast message delivered to every registered handler.
pub trait Notification: Send + Sync + 'static {}

/// Runtime identity of a Rust type, carrying its name for diagnostics.
///
/// Equality and hashing only consider the [`TypeId`]; the name is informational.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Identity of `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path, e.g. `Ping` for `my_app::requests::Ping`
    pub fn short_name(&self) -> &'static str {
        let name = self.name.split('<').next().unwrap_or(self.name);
        match name.rfind("::") {
            Some(index) => &self.name[index + 2..],
            None => self.name,
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
