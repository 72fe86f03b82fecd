//! Plugin metadata, discovery and the built-in apps.
//!
//! # Responsibility
//! - Describe plugins through validated `PluginMeta`.
//! - Collect plugin apps from installed apps and entry point groups.
//! - Run each app's declarations against a registry.
//!
//! # Invariants
//! - Apps are identified by `PluginMeta::name`; duplicates are dropped.
//! - `load` validates metadata before an app's `ready` runs.

mod builtin;
mod manager;
mod meta;

pub use builtin::{builtin_apps, CoreApp, FrontendApp, CORE_APP_NAME, FRONTEND_APP_NAME};
pub use manager::{PluginApp, PluginError, PluginManager};
pub use meta::{MetaValidationError, PluginMeta, DEFAULT_AUTHOR, DEFAULT_CATEGORY};
