//! Core of the plugdeck plugin system.
//! Interfaces and extension points, plugin discovery, and the persisted
//! plugin table all live here; hosts only wire them together.

pub mod db;
pub mod frontend;
pub mod interface;
pub mod logging;
pub mod plugin;
pub mod repo;
pub mod schema;
pub mod settings;
pub mod sync;

pub use interface::{
    global, Binding, ConformanceError, Extension, ExtensionPoint, Extensions, Interface,
    InterfaceSpec, MemberKind, PluginClass, PluginType, Registry, ServiceInstance,
};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status};
pub use plugin::{
    builtin_apps, MetaValidationError, PluginApp, PluginError, PluginManager, PluginMeta,
};
pub use repo::{
    PluginListQuery, PluginRecord, PluginRepository, RepoError, SqlitePluginRepository,
};
pub use settings::{PluginSettings, SettingsError};
pub use sync::{sync_hooks, sync_plugins, PluginSyncHook, SyncError, SyncReport};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version, also used as the host version for
/// plugin compatibility checks.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_semver() {
        assert!(semver::Version::parse(core_version()).is_ok());
    }
}
