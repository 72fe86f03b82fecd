//! Name-based selection of the active package manager and engine.

use crate::frontend::engine::{frontend_engines, FrontendEngine, FRONTEND_ENGINE_INTERFACE};
use crate::frontend::package_manager::{
    package_managers, PackageManager, PACKAGE_MANAGER_INTERFACE,
};
use crate::interface::Registry;
use crate::settings::{PluginSettings, SettingsError};
use log::{debug, warn};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

pub const SETTINGS_NAMESPACE: &str = "PLUGDECK";
pub const FRONTEND_DIR: &str = "FRONTEND_DIR";
pub const FRONTEND_ENGINE: &str = "FRONTEND_ENGINE";
pub const FRONTEND_PKG_MANAGER: &str = "FRONTEND_PKG_MANAGER";

/// `PLUGDECK` settings with frontend defaults.
pub fn frontend_settings() -> PluginSettings {
    PluginSettings::builtin(SETTINGS_NAMESPACE)
        .with_default(FRONTEND_DIR, "frontend")
        .with_unset_default(FRONTEND_ENGINE)
        .with_default(FRONTEND_PKG_MANAGER, "npm")
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionError {
    NoImplementations { interface: &'static str },
    NotConfigured { key: &'static str },
    NotFound { key: &'static str, value: String },
    Settings(SettingsError),
}

impl Display for SelectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoImplementations { interface } => {
                write!(f, "no implementations of `{interface}` are registered")
            }
            Self::NotConfigured { key } => write!(f, "setting `{key}` is not configured"),
            Self::NotFound { key, value } => {
                write!(f, "setting `{key}` has invalid value: `{value}` not found")
            }
            Self::Settings(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SelectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Settings(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SettingsError> for SelectionError {
    fn from(value: SettingsError) -> Self {
        Self::Settings(value)
    }
}

/// Enabled package manager whose `name()` equals `FRONTEND_PKG_MANAGER`.
pub fn current_package_manager(
    settings: &PluginSettings,
    registry: &Registry,
) -> Result<Arc<dyn PackageManager>, SelectionError> {
    let wanted = configured(settings, FRONTEND_PKG_MANAGER)?;
    let candidates: Vec<_> = package_managers(registry)
        .enumerate(false)
        .instances()
        .collect();
    if candidates.is_empty() {
        return Err(SelectionError::NoImplementations {
            interface: PACKAGE_MANAGER_INTERFACE,
        });
    }

    let selected = candidates
        .into_iter()
        .find(|manager| manager.name() == wanted);
    finish_selection(FRONTEND_PKG_MANAGER, &wanted, selected)
}

/// Fresh instance of the enabled engine registered as `FRONTEND_ENGINE`.
pub fn current_engine(
    settings: &PluginSettings,
    registry: &Registry,
) -> Result<Arc<dyn FrontendEngine>, SelectionError> {
    let wanted = configured(settings, FRONTEND_ENGINE)?;
    let classes: Vec<_> = frontend_engines(registry).enumerate(false).classes().collect();
    if classes.is_empty() {
        return Err(SelectionError::NoImplementations {
            interface: FRONTEND_ENGINE_INTERFACE,
        });
    }

    let selected = classes
        .into_iter()
        .find(|class| class.type_name() == wanted)
        .map(|class| class.instantiate());
    finish_selection(FRONTEND_ENGINE, &wanted, selected)
}

fn configured(settings: &PluginSettings, key: &'static str) -> Result<String, SelectionError> {
    settings
        .get_str(key)?
        .map(str::to_string)
        .ok_or(SelectionError::NotConfigured { key })
}

fn finish_selection<T: ?Sized>(
    key: &'static str,
    wanted: &str,
    selected: Option<Arc<T>>,
) -> Result<Arc<T>, SelectionError> {
    match selected {
        Some(selected) => {
            debug!("event=frontend_select module=frontend status=ok key={key} value={wanted}");
            Ok(selected)
        }
        None => {
            warn!("event=frontend_select module=frontend status=not_found key={key} value={wanted}");
            Err(SelectionError::NotFound {
                key,
                value: wanted.to_string(),
            })
        }
    }
}

/// Opt-in process cache for a selection.
///
/// The first successful selection is kept for the cache's lifetime; later
/// changes to settings or the registry are not observed.
pub struct CachedSelection<T: ?Sized> {
    cell: OnceCell<Arc<T>>,
}

impl<T: ?Sized> CachedSelection<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Returns the cached value, running `select` only until it first succeeds.
    pub fn get_or_select(
        &self,
        select: impl FnOnce() -> Result<Arc<T>, SelectionError>,
    ) -> Result<Arc<T>, SelectionError> {
        self.cell.get_or_try_init(select).map(Arc::clone)
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }
}

impl<T: ?Sized> Default for CachedSelection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Debug for CachedSelection<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedSelection")
            .field("selected", &self.cell.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{frontend_settings, CachedSelection, SelectionError, FRONTEND_PKG_MANAGER};
    use crate::frontend::{NpmPackageManager, PackageManager, YarnPackageManager};
    use std::sync::Arc;

    #[test]
    fn defaults_select_npm_and_leave_engine_unset() {
        let settings = frontend_settings();
        assert_eq!(settings.namespace(), "PLUGDECK");
        assert_eq!(
            settings.get_str(FRONTEND_PKG_MANAGER).expect("pkg manager"),
            Some("npm")
        );
        assert_eq!(
            settings.get_str("FRONTEND_DIR").expect("frontend dir"),
            Some("frontend")
        );
        assert_eq!(settings.get("FRONTEND_ENGINE").expect("engine"), None);
    }

    #[test]
    fn cached_selection_keeps_first_success() {
        let cache: CachedSelection<dyn PackageManager> = CachedSelection::new();
        let failed = cache.get_or_select(|| {
            Err(SelectionError::NotConfigured {
                key: FRONTEND_PKG_MANAGER,
            })
        });
        assert!(failed.is_err());
        assert!(cache.get().is_none());

        let first = cache
            .get_or_select(|| Ok(Arc::new(NpmPackageManager) as Arc<dyn PackageManager>))
            .expect("npm selected");
        let second = cache
            .get_or_select(|| Ok(Arc::new(YarnPackageManager) as Arc<dyn PackageManager>))
            .expect("cached value");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.name(), "npm");
    }
}
