//! Frontend engine and package manager selection.
//!
//! # Responsibility
//! - Declare `IPackageManager` (service) and `IFrontendEngine` (non-service).
//! - Register the built-in npm, yarn and vue implementations.
//! - Select the active implementation by the name configured in settings.
//!
//! # Invariants
//! - Commands are described as argv vectors and never executed here.
//! - Selection re-reads settings and the registry on every call unless the
//!   caller opts into `CachedSelection`.

mod engine;
mod package_manager;
mod selection;

pub use engine::{
    frontend_engines, register_builtin_engines, FrontendEngine, VueEngine,
    FRONTEND_ENGINE_INTERFACE,
};
pub use package_manager::{
    package_managers, register_builtin_package_managers, NpmPackageManager, PackageManager,
    YarnPackageManager, PACKAGE_MANAGER_INTERFACE,
};
pub use selection::{
    current_engine, current_package_manager, frontend_settings, CachedSelection, SelectionError,
    FRONTEND_DIR, FRONTEND_ENGINE, FRONTEND_PKG_MANAGER, SETTINGS_NAMESPACE,
};
