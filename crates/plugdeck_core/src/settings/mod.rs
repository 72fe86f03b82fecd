//! Namespaced plugin settings.
//!
//! # Responsibility
//! - Resolve a setting from user overrides first, then declared defaults.
//! - Reject removed and undeclared keys explicitly.
//! - Resolve import-string settings to live registry interfaces.
//!
//! # Invariants
//! - Namespaces are upper-case.
//! - Only keys declared with a default (possibly unset) are readable.

mod plugin_settings;

pub use plugin_settings::{PluginSettings, SettingsError};
