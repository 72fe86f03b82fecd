//! Interface registry: declared contracts and the types registered against them.
//!
//! # Responsibility
//! - Declare named interfaces with required members and service semantics.
//! - Validate conforming types at declaration time and append them to every
//!   target interface.
//! - Expose snapshot-based, enabled-filtered enumeration (extension points).
//!
//! # Invariants
//! - An interface holds at most one entry per declaring type.
//! - A rejected `register` call leaves every target interface unchanged.
//! - Service interfaces hold instances; non-service interfaces hold classes.
//! - Registration is append-only; only `Registry::reset` clears collections.

mod error;
mod extension;
mod plugin_type;
mod registry;
mod spec;

pub use error::ConformanceError;
pub use extension::{Extension, ExtensionPoint, Extensions, PluginClass, ServiceInstance};
pub use plugin_type::PluginType;
pub use registry::{global, Binding, Interface, InterfaceId, Registry};
pub use spec::{InterfaceSpec, MemberKind};
