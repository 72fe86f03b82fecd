//! Settings object with defaults, overrides and removed keys.

use crate::interface::{Interface, Registry};
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use toml::{Table, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsError {
    InvalidNamespace(String),
    Removed {
        namespace: String,
        key: String,
    },
    Missing {
        namespace: String,
        key: String,
    },
    TypeMismatch {
        key: String,
        expected: &'static str,
    },
    NotImportString(String),
    UnresolvedInterface {
        key: String,
        value: String,
    },
    Parse(String),
    Io {
        path: PathBuf,
        message: String,
    },
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNamespace(value) => {
                write!(f, "settings namespace `{value}` must be non-empty UPPERCASE")
            }
            Self::Removed { namespace, key } => write!(
                f,
                "invalid access: settings `{namespace}` key `{key}` was removed"
            ),
            Self::Missing { namespace, key } => {
                write!(f, "invalid access: settings `{namespace}` has no key `{key}`")
            }
            Self::TypeMismatch { key, expected } => {
                write!(f, "setting `{key}` must be a {expected}")
            }
            Self::NotImportString(key) => {
                write!(f, "setting `{key}` is not declared as an import string")
            }
            Self::UnresolvedInterface { key, value } => write!(
                f,
                "could not resolve interface `{value}` for setting `{key}`"
            ),
            Self::Parse(message) => write!(f, "failed to parse settings: {message}"),
            Self::Io { path, message } => write!(
                f,
                "failed to read settings file `{}`: {message}",
                path.display()
            ),
        }
    }
}

impl Error for SettingsError {}

/// Settings of one namespace, e.g. `PLUGDECK`.
///
/// User overrides come from the `[NAMESPACE]` table of a TOML document.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginSettings {
    namespace: String,
    defaults: BTreeMap<String, Option<Value>>,
    user_settings: Table,
    import_strings: BTreeSet<String>,
    removed: BTreeSet<String>,
}

impl PluginSettings {
    /// Creates an empty settings object.
    ///
    /// # Errors
    /// - `InvalidNamespace` when `namespace` is empty or not upper-case.
    pub fn new(namespace: &str) -> Result<Self, SettingsError> {
        let namespace = namespace.trim();
        if namespace.is_empty() || namespace != namespace.to_uppercase() {
            return Err(SettingsError::InvalidNamespace(namespace.to_string()));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            ..Self::builtin("")
        })
    }

    /// Constructor for compile-time namespaces owned by this crate.
    pub(crate) fn builtin(namespace: &'static str) -> Self {
        debug_assert_eq!(namespace, namespace.to_uppercase());
        Self {
            namespace: namespace.to_string(),
            defaults: BTreeMap::new(),
            user_settings: Table::new(),
            import_strings: BTreeSet::new(),
            removed: BTreeSet::new(),
        }
    }

    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(key.into(), Some(value.into()));
        self
    }

    /// Declares `key` as readable without a default value.
    pub fn with_unset_default(mut self, key: impl Into<String>) -> Self {
        self.defaults.insert(key.into(), None);
        self
    }

    /// Marks `key` as naming a registry interface.
    pub fn with_import_string(mut self, key: impl Into<String>) -> Self {
        self.import_strings.insert(key.into());
        self
    }

    pub fn with_removed(mut self, key: impl Into<String>) -> Self {
        self.removed.insert(key.into());
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Replaces user overrides with the namespace table of `text`.
    ///
    /// A document without the namespace table clears all overrides.
    pub fn load_toml_str(&mut self, text: &str) -> Result<(), SettingsError> {
        let document: Table =
            toml::from_str(text).map_err(|err| SettingsError::Parse(err.to_string()))?;
        let overrides = match document.get(&self.namespace) {
            Some(Value::Table(table)) => table.clone(),
            Some(_) => {
                return Err(SettingsError::Parse(format!(
                    "`{}` must be a table",
                    self.namespace
                )))
            }
            None => Table::new(),
        };
        self.reload(overrides);
        Ok(())
    }

    pub fn load_toml_file(&mut self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| SettingsError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        self.load_toml_str(&text)
    }

    /// Replaces user overrides wholesale.
    pub fn reload(&mut self, user_settings: Table) {
        info!(
            "event=settings_reload module=settings status=ok namespace={} keys={}",
            self.namespace,
            user_settings.len()
        );
        self.user_settings = user_settings;
    }

    /// User value if present, otherwise the default. `None` means unset.
    ///
    /// # Errors
    /// - `Removed` for keys declared as removed.
    /// - `Missing` for keys without a declared default.
    pub fn get(&self, key: &str) -> Result<Option<&Value>, SettingsError> {
        if self.removed.contains(key) {
            return Err(SettingsError::Removed {
                namespace: self.namespace.clone(),
                key: key.to_string(),
            });
        }
        let default = self
            .defaults
            .get(key)
            .ok_or_else(|| SettingsError::Missing {
                namespace: self.namespace.clone(),
                key: key.to_string(),
            })?;
        Ok(self.user_settings.get(key).or(default.as_ref()))
    }

    pub fn get_str(&self, key: &str) -> Result<Option<&str>, SettingsError> {
        match self.get(key)? {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.as_str())),
            Some(_) => Err(SettingsError::TypeMismatch {
                key: key.to_string(),
                expected: "string",
            }),
        }
    }

    pub fn get_i64(&self, key: &str) -> Result<Option<i64>, SettingsError> {
        match self.get(key)? {
            None => Ok(None),
            Some(Value::Integer(value)) => Ok(Some(*value)),
            Some(_) => Err(SettingsError::TypeMismatch {
                key: key.to_string(),
                expected: "integer",
            }),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, SettingsError> {
        match self.get(key)? {
            None => Ok(None),
            Some(Value::Boolean(value)) => Ok(Some(*value)),
            Some(_) => Err(SettingsError::TypeMismatch {
                key: key.to_string(),
                expected: "boolean",
            }),
        }
    }

    /// Resolves an import-string setting to the interface it names.
    ///
    /// Looked up again on every call; an unset value yields `None`.
    ///
    /// # Errors
    /// - `NotImportString` when `key` was not declared as an import string.
    /// - `UnresolvedInterface` when no interface of type `I` has that name.
    pub fn resolve_interface<I: ?Sized + Send + Sync + 'static>(
        &self,
        key: &str,
        registry: &Registry,
    ) -> Result<Option<Interface<I>>, SettingsError> {
        if !self.import_strings.contains(key) {
            return Err(SettingsError::NotImportString(key.to_string()));
        }
        let Some(name) = self.get_str(key)? else {
            return Ok(None);
        };
        debug!(
            "event=settings_resolve module=settings status=start namespace={} key={} value={}",
            self.namespace, key, name
        );
        registry
            .interface::<I>(name)
            .map(Some)
            .ok_or_else(|| SettingsError::UnresolvedInterface {
                key: key.to_string(),
                value: name.to_string(),
            })
    }
}
