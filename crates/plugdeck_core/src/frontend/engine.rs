//! Frontend engine classes.

use crate::frontend::package_manager::PackageManager;
use crate::interface::{ConformanceError, Interface, InterfaceSpec, PluginType, Registry};

pub const FRONTEND_ENGINE_INTERFACE: &str = "IFrontendEngine";

/// A frontend toolkit. Registered as a class under its engine name.
pub trait FrontendEngine: Send + Sync {
    fn name(&self) -> &str;

    /// File extensions of frontend sources, without the dot.
    fn extensions(&self) -> &[&str];

    /// Relative paths of the files copied into a new frontend directory.
    fn files(&self) -> Vec<String>;

    /// Commands that would initialise `frontend_dir` with `package_manager`.
    fn init_commands(
        &self,
        frontend_dir: &str,
        package_manager: &dyn PackageManager,
    ) -> Vec<Vec<String>>;
}

#[derive(Debug, Default)]
pub struct VueEngine;

impl FrontendEngine for VueEngine {
    fn name(&self) -> &str {
        "vue"
    }

    fn extensions(&self) -> &[&str] {
        &["js"]
    }

    fn files(&self) -> Vec<String> {
        vec!["vue.config.js".to_string()]
    }

    fn init_commands(
        &self,
        frontend_dir: &str,
        package_manager: &dyn PackageManager,
    ) -> Vec<Vec<String>> {
        let create: Vec<String> = [
            "vue",
            "create",
            "--packageManager",
            package_manager.name(),
            "--no-git",
            "--force",
            frontend_dir,
        ]
        .iter()
        .map(|part| part.to_string())
        .collect();

        vec![
            package_manager.install_global_command("@vue/cli @vue/cli-service-global"),
            create,
            package_manager.install_command("webpack-bundle-tracker"),
        ]
    }
}

/// Returns the registry's `IFrontendEngine` interface, declaring it on first use.
pub fn frontend_engines(registry: &Registry) -> Interface<dyn FrontendEngine> {
    registry.interface_or_declare(
        InterfaceSpec::new(FRONTEND_ENGINE_INTERFACE)
            .service(false)
            .method("name")
            .method("extensions")
            .method("files")
            .method("init_commands"),
    )
}

pub fn register_builtin_engines(registry: &Registry) -> Result<(), ConformanceError> {
    let engines = frontend_engines(registry);
    if engines.contains::<VueEngine>() {
        return Ok(());
    }
    registry.register(
        &PluginType::new("vue", VueEngine::default)
            .method("name")
            .method("extensions")
            .method("files")
            .method("init_commands"),
        &[engines.bind::<VueEngine>(|engine| engine)],
    )?;
    Ok(())
}
