//! Plugin app discovery and loading.

use crate::interface::{ConformanceError, Registry};
use crate::plugin::meta::{MetaValidationError, PluginMeta};
use log::{error, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// A compiled-in application unit.
///
/// `ready` is where an app declares interfaces and registers its
/// implementations; it runs once per `PluginManager::load`.
pub trait PluginApp: Send + Sync {
    fn meta(&self) -> &PluginMeta;

    fn ready(&self, _registry: &Registry) -> Result<(), PluginError> {
        Ok(())
    }

    /// First-install hook, called by sync when the plugin's row is created.
    fn initialize(&self) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Discovery and loading failures.
#[derive(Debug)]
pub enum PluginError {
    MissingGroup,
    InvalidMeta {
        plugin: String,
        source: MetaValidationError,
    },
    Conformance(ConformanceError),
    Failed {
        plugin: String,
        message: String,
    },
}

impl Display for PluginError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingGroup => write!(
                f,
                "an entry point group is required to look for plugins"
            ),
            Self::InvalidMeta { plugin, source } => {
                write!(f, "plugin `{plugin}` has invalid metadata: {source}")
            }
            Self::Conformance(err) => write!(f, "{err}"),
            Self::Failed { plugin, message } => write!(f, "plugin `{plugin}` failed: {message}"),
        }
    }
}

impl Error for PluginError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidMeta { source, .. } => Some(source),
            Self::Conformance(err) => Some(err),
            Self::MissingGroup | Self::Failed { .. } => None,
        }
    }
}

impl From<ConformanceError> for PluginError {
    fn from(value: ConformanceError) -> Self {
        Self::Conformance(value)
    }
}

/// Collects plugin apps from installed apps and group-keyed entry points.
///
/// Installed apps are always loaded. Entry points only become visible once
/// their group is selected with `find_plugins`.
#[derive(Default)]
pub struct PluginManager {
    group: Option<String>,
    installed: Vec<Arc<dyn PluginApp>>,
    entry_points: BTreeMap<String, Vec<Arc<dyn PluginApp>>>,
    found: Vec<Arc<dyn PluginApp>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an app to the installed set. Re-installing a name is ignored.
    pub fn install(&mut self, app: Arc<dyn PluginApp>) {
        let name = &app.meta().name;
        if self.installed.iter().any(|known| &known.meta().name == name) {
            warn!("event=plugin_install module=plugin status=duplicate plugin={name}");
            return;
        }
        self.installed.push(app);
    }

    /// Publishes an app under an entry point group.
    pub fn add_entry_point(&mut self, group: impl Into<String>, app: Arc<dyn PluginApp>) {
        self.entry_points.entry(group.into()).or_default().push(app);
    }

    /// Selects `group` and returns the names of the apps published there.
    ///
    /// # Errors
    /// - `MissingGroup` when `group` is blank.
    pub fn find_plugins(&mut self, group: &str) -> Result<Vec<String>, PluginError> {
        let group = group.trim();
        if group.is_empty() {
            error!("event=plugin_discover module=plugin status=error error_code=missing_group");
            return Err(PluginError::MissingGroup);
        }

        self.group = Some(group.to_string());
        self.found = self.entry_points.get(group).cloned().unwrap_or_default();
        let names: Vec<String> = self
            .found
            .iter()
            .map(|app| app.meta().name.clone())
            .collect();
        for name in &names {
            info!("event=plugin_discover module=plugin status=found group={group} plugin={name}");
        }
        Ok(names)
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Plugins of the selected group: entry point apps, then installed apps
    /// whose name lives under the group prefix. Deduplicated by name.
    ///
    /// Without a selected group every installed app counts as a plugin.
    pub fn plugins(&self) -> Vec<Arc<dyn PluginApp>> {
        let installed = self
            .installed
            .iter()
            .filter(|app| match self.group.as_deref() {
                Some(group) => is_in_group(&app.meta().name, group),
                None => true,
            });
        dedup_by_name(self.found.iter().chain(installed))
    }

    /// Every app `load` will make ready: installed apps, then found apps.
    pub fn apps(&self) -> Vec<Arc<dyn PluginApp>> {
        dedup_by_name(self.installed.iter().chain(self.found.iter()))
    }

    /// Validates metadata and runs `ready` for every app, in order.
    ///
    /// Stops at the first failing app.
    pub fn load(&self, registry: &Registry) -> Result<usize, PluginError> {
        let apps = self.apps();
        for app in &apps {
            let meta = app.meta();
            meta.validate().map_err(|source| {
                error!(
                    "event=plugin_load module=plugin status=error plugin={} error={}",
                    meta.name, source
                );
                PluginError::InvalidMeta {
                    plugin: meta.name.clone(),
                    source,
                }
            })?;
            if let Err(err) = app.ready(registry) {
                error!(
                    "event=plugin_load module=plugin status=error plugin={} error={}",
                    meta.name, err
                );
                return Err(err);
            }
            info!(
                "event=plugin_load module=plugin status=ok plugin={} version={}",
                meta.name, meta.version
            );
        }
        Ok(apps.len())
    }
}

impl Debug for PluginManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names = |apps: &[Arc<dyn PluginApp>]| {
            apps.iter()
                .map(|app| app.meta().name.clone())
                .collect::<Vec<_>>()
        };
        f.debug_struct("PluginManager")
            .field("group", &self.group)
            .field("installed", &names(&self.installed))
            .field("found", &names(&self.found))
            .finish()
    }
}

fn is_in_group(name: &str, group: &str) -> bool {
    name == group
        || name
            .strip_prefix(group)
            .is_some_and(|rest| rest.starts_with('.'))
}

fn dedup_by_name<'a>(
    apps: impl Iterator<Item = &'a Arc<dyn PluginApp>>,
) -> Vec<Arc<dyn PluginApp>> {
    let mut seen = BTreeSet::new();
    apps.filter(|app| seen.insert(app.meta().name.clone()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{is_in_group, PluginApp, PluginError, PluginManager};
    use crate::interface::Registry;
    use crate::plugin::PluginMeta;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct TestApp {
        meta: PluginMeta,
        readied: AtomicUsize,
    }

    impl TestApp {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                meta: PluginMeta::new(name, "1.0.0"),
                readied: AtomicUsize::new(0),
            })
        }
    }

    impl PluginApp for TestApp {
        fn meta(&self) -> &PluginMeta {
            &self.meta
        }

        fn ready(&self, _registry: &Registry) -> Result<(), PluginError> {
            self.readied.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn group_prefix_requires_segment_boundary() {
        assert!(is_in_group("myapp.plugins.billing", "myapp.plugins"));
        assert!(!is_in_group("myapp.pluginsextra", "myapp.plugins"));
        assert!(is_in_group("myapp.plugins", "myapp.plugins"));
    }

    #[test]
    fn find_plugins_rejects_blank_group() {
        let mut manager = PluginManager::new();
        assert!(matches!(
            manager.find_plugins("  "),
            Err(PluginError::MissingGroup)
        ));
        assert_eq!(manager.group(), None);
    }

    #[test]
    fn load_readies_each_app_once() {
        let installed = TestApp::new("myapp.plugins.billing");
        let mut manager = PluginManager::new();
        manager.install(installed.clone());
        manager.add_entry_point("myapp.plugins", installed.clone());
        manager
            .find_plugins("myapp.plugins")
            .expect("group should be accepted");

        let loaded = manager.load(&Registry::new()).expect("load should succeed");

        assert_eq!(loaded, 1);
        assert_eq!(installed.readied.load(Ordering::SeqCst), 1);
    }
}
