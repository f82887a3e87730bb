//! # Registry Infrastructure
//!
//! The service locator boundary and the explicit handler registry behind it.
//!
//! ## Architecture
//!
//! ```text
//! Registry Infrastructure
//! ├── ServiceLocator     (resolution seam used by the dispatch engine)
//! ├── ServiceProvider    (typed, cloneable handle over a locator)
//! └── HandlerRegistry    (typed registration, factory storage, contracts)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use mediator_core::registry::{ContractKey, HandlerRegistry};
//! use mediator_core::messages::Query;
//!
//! struct Ping;
//! impl Query for Ping {
//!     type Response = String;
//! }
//!
//! let registry = HandlerRegistry::new();
//! assert_eq!(registry.registrations(&ContractKey::query_handler::<Ping>()), 0);
//! let provider = registry.into_provider();
//! # let _ = provider;
//! ```

pub mod handler_registry;
pub mod service_locator;

// Re-export main types for easy access
pub use handler_registry::{HandlerRegistry, RegistryStats};
pub use service_locator::{
    ContractKey, ContractRole, MessageContract, Registered, Service, ServiceLocator,
    ServiceProvider,
};
