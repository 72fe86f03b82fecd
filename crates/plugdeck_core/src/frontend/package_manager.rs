//! Package manager descriptions.

use crate::interface::{ConformanceError, Interface, InterfaceSpec, PluginType, Registry};

pub const PACKAGE_MANAGER_INTERFACE: &str = "IPackageManager";

/// A JS package manager, described by the commands it would run.
pub trait PackageManager: Send + Sync {
    fn name(&self) -> &str;
    fn init_command(&self) -> Vec<String>;
    fn install_command(&self, package: &str) -> Vec<String>;
    fn install_global_command(&self, package: &str) -> Vec<String>;
    fn uninstall_command(&self, package: &str) -> Vec<String>;
}

#[derive(Debug, Default)]
pub struct NpmPackageManager;

impl PackageManager for NpmPackageManager {
    fn name(&self) -> &str {
        "npm"
    }

    fn init_command(&self) -> Vec<String> {
        argv(&["npm", "init"], None)
    }

    fn install_command(&self, package: &str) -> Vec<String> {
        argv(&["npm", "install"], Some(package))
    }

    fn install_global_command(&self, package: &str) -> Vec<String> {
        argv(&["npm", "install", "--global"], Some(package))
    }

    fn uninstall_command(&self, package: &str) -> Vec<String> {
        argv(&["npm", "uninstall"], Some(package))
    }
}

#[derive(Debug, Default)]
pub struct YarnPackageManager;

impl PackageManager for YarnPackageManager {
    fn name(&self) -> &str {
        "yarn"
    }

    fn init_command(&self) -> Vec<String> {
        argv(&["yarn", "init"], None)
    }

    fn install_command(&self, package: &str) -> Vec<String> {
        argv(&["yarn", "add"], Some(package))
    }

    fn install_global_command(&self, package: &str) -> Vec<String> {
        argv(&["yarn", "global", "add"], Some(package))
    }

    fn uninstall_command(&self, package: &str) -> Vec<String> {
        argv(&["yarn", "remove"], Some(package))
    }
}

/// Returns the registry's `IPackageManager` interface, declaring it on first use.
pub fn package_managers(registry: &Registry) -> Interface<dyn PackageManager> {
    registry.interface_or_declare(
        InterfaceSpec::new(PACKAGE_MANAGER_INTERFACE)
            .method("name")
            .method("init_command")
            .method("install_command")
            .method("install_global_command")
            .method("uninstall_command"),
    )
}

/// Registers npm and yarn unless they are already present.
pub fn register_builtin_package_managers(registry: &Registry) -> Result<(), ConformanceError> {
    let managers = package_managers(registry);
    if !managers.contains::<NpmPackageManager>() {
        registry.register(
            &describe(PluginType::new("NpmPackageManager", NpmPackageManager::default)),
            &[managers.bind::<NpmPackageManager>(|manager| manager)],
        )?;
    }
    if !managers.contains::<YarnPackageManager>() {
        registry.register(
            &describe(PluginType::new("YarnPackageManager", YarnPackageManager::default)),
            &[managers.bind::<YarnPackageManager>(|manager| manager)],
        )?;
    }
    Ok(())
}

fn describe<T: Send + Sync + 'static>(plugin_type: PluginType<T>) -> PluginType<T> {
    plugin_type
        .method("name")
        .method("init_command")
        .method("install_command")
        .method("install_global_command")
        .method("uninstall_command")
}

// Package specs may hold several space-separated packages.
fn argv(command: &[&str], packages: Option<&str>) -> Vec<String> {
    command
        .iter()
        .copied()
        .chain(packages.into_iter().flat_map(str::split_whitespace))
        .map(str::to_string)
        .collect()
}
