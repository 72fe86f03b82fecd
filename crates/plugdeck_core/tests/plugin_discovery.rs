use plugdeck_core::{PluginApp, PluginError, PluginManager, PluginMeta, Registry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct App {
    meta: PluginMeta,
    readied: AtomicUsize,
}

impl App {
    fn new(name: &str, version: &str) -> Arc<Self> {
        Arc::new(Self {
            meta: PluginMeta::new(name, version),
            readied: AtomicUsize::new(0),
        })
    }

    fn readied(&self) -> usize {
        self.readied.load(Ordering::SeqCst)
    }
}

impl PluginApp for App {
    fn meta(&self) -> &PluginMeta {
        &self.meta
    }

    fn ready(&self, _registry: &Registry) -> Result<(), PluginError> {
        self.readied.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn names(apps: &[Arc<dyn PluginApp>]) -> Vec<String> {
    apps.iter().map(|app| app.meta().name.clone()).collect()
}

#[test]
fn missing_group_is_an_error() {
    let mut manager = PluginManager::new();
    let err = manager.find_plugins("").unwrap_err();
    assert!(matches!(err, PluginError::MissingGroup));
    assert!(err.to_string().contains("group"));
}

#[test]
fn unknown_group_finds_nothing() {
    let mut manager = PluginManager::new();
    manager.add_entry_point("myapp.plugins", App::new("myapp.plugins.billing", "1.0.0"));

    assert!(manager.find_plugins("otherapp.plugins").unwrap().is_empty());
    assert_eq!(manager.group(), Some("otherapp.plugins"));
    assert!(manager.plugins().is_empty());
}

#[test]
fn plugins_combine_entry_points_and_installed_group_members() {
    let billing = App::new("myapp.plugins.billing", "1.0.0");
    let mut manager = PluginManager::new();
    manager.install(App::new("myapp.core", "1.0.0"));
    manager.install(App::new("myapp.plugins.notes", "1.0.0"));
    manager.install(billing.clone());
    manager.add_entry_point("myapp.plugins", billing.clone());
    manager.add_entry_point("myapp.plugins", App::new("myapp.plugins.reports", "0.1.0"));

    assert_eq!(names(&manager.plugins()).len(), 3);

    let found = manager.find_plugins("myapp.plugins").unwrap();
    assert_eq!(found, ["myapp.plugins.billing", "myapp.plugins.reports"]);
    assert_eq!(
        names(&manager.plugins()),
        [
            "myapp.plugins.billing",
            "myapp.plugins.reports",
            "myapp.plugins.notes"
        ]
    );
    assert_eq!(
        names(&manager.apps()),
        [
            "myapp.core",
            "myapp.plugins.notes",
            "myapp.plugins.billing",
            "myapp.plugins.reports"
        ]
    );

    assert_eq!(manager.load(&Registry::new()).unwrap(), 4);
    assert_eq!(billing.readied(), 1);
}

#[test]
fn reinstalling_a_name_is_ignored() {
    let first = App::new("myapp.core", "1.0.0");
    let mut manager = PluginManager::new();
    manager.install(first.clone());
    manager.install(App::new("myapp.core", "2.0.0"));

    let apps = manager.apps();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].meta().version, "1.0.0");
}

#[test]
fn load_stops_at_invalid_metadata() {
    let good = App::new("myapp.core", "1.0.0");
    let bad = App::new("myapp.broken", "not-a-version");
    let after = App::new("myapp.later", "1.0.0");
    let mut manager = PluginManager::new();
    manager.install(good.clone());
    manager.install(bad.clone());
    manager.install(after.clone());

    let err = manager.load(&Registry::new()).unwrap_err();

    assert!(matches!(err, PluginError::InvalidMeta { ref plugin, .. } if plugin == "myapp.broken"));
    assert_eq!(good.readied(), 1);
    assert_eq!(bad.readied(), 0);
    assert_eq!(after.readied(), 0);
}
