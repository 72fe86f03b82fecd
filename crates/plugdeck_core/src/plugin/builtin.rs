//! Apps shipped with the core.

use crate::frontend::{register_builtin_engines, register_builtin_package_managers};
use crate::interface::Registry;
use crate::plugin::manager::{PluginApp, PluginError};
use crate::plugin::meta::PluginMeta;
use crate::schema::{mutation_contributions, query_contributions};
use crate::sync::sync_hooks;
use std::sync::Arc;

pub const CORE_APP_NAME: &str = "plugdeck";
pub const FRONTEND_APP_NAME: &str = "plugdeck.frontend";
const BUILTIN_CATEGORY: &str = "Plugdeck";

fn builtin_meta(name: &str, verbose_name: &str) -> PluginMeta {
    PluginMeta::new(name, crate::core_version())
        .with_verbose_name(verbose_name)
        .with_category(BUILTIN_CATEGORY)
        .hidden()
}

/// Declares the core extension points: sync hooks and schema contributions.
#[derive(Debug)]
pub struct CoreApp {
    meta: PluginMeta,
}

impl CoreApp {
    pub fn new() -> Self {
        Self {
            meta: builtin_meta(CORE_APP_NAME, "Plugdeck core"),
        }
    }
}

impl Default for CoreApp {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginApp for CoreApp {
    fn meta(&self) -> &PluginMeta {
        &self.meta
    }

    fn ready(&self, registry: &Registry) -> Result<(), PluginError> {
        sync_hooks(registry);
        query_contributions(registry);
        mutation_contributions(registry);
        Ok(())
    }
}

/// Registers the npm/yarn package managers and the vue engine.
#[derive(Debug)]
pub struct FrontendApp {
    meta: PluginMeta,
}

impl FrontendApp {
    pub fn new() -> Self {
        Self {
            meta: builtin_meta(FRONTEND_APP_NAME, "Plugdeck frontend"),
        }
    }
}

impl Default for FrontendApp {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginApp for FrontendApp {
    fn meta(&self) -> &PluginMeta {
        &self.meta
    }

    fn ready(&self, registry: &Registry) -> Result<(), PluginError> {
        register_builtin_package_managers(registry)?;
        register_builtin_engines(registry)?;
        Ok(())
    }
}

/// Core and frontend apps, in load order.
pub fn builtin_apps() -> Vec<Arc<dyn PluginApp>> {
    vec![
        Arc::new(CoreApp::new()) as Arc<dyn PluginApp>,
        Arc::new(FrontendApp::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::builtin_apps;
    use crate::frontend::{frontend_engines, package_managers, VueEngine};
    use crate::interface::Registry;
    use crate::plugin::PluginManager;

    #[test]
    fn loading_builtins_twice_is_idempotent() {
        let registry = Registry::new();
        let mut manager = PluginManager::new();
        for app in builtin_apps() {
            app.meta().validate().expect("builtin meta is valid");
            manager.install(app);
        }

        manager.load(&registry).expect("first load");
        manager.load(&registry).expect("second load");

        assert_eq!(package_managers(&registry).len(), 2);
        assert!(frontend_engines(&registry).contains::<VueEngine>());
        assert!(registry
            .interface_names()
            .contains(&"IPluginSyncHook".to_string()));
    }
}
