//! Plugin metadata declaration and validation.
//!
//! # Invariants
//! - `name` is a dotted lower-case identifier, e.g. `myapp.plugins.billing`.
//! - `version` parses as semver.
//! - `compatibility`, when set, parses as a semver requirement evaluated
//!   against the host version.

use once_cell::sync::Lazy;
use regex::Regex;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_AUTHOR: &str = "unknown";
pub const DEFAULT_CATEGORY: &str = "Miscellaneous";

static PLUGIN_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)*$").expect("valid plugin name regex")
});
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Metadata every plugin app carries.
///
/// Optional display fields fall back to `display_*` defaults instead of being
/// stored as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose_name: Option<String>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Hidden plugins are synchronised but not meant for end-user listings.
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Initial enabled state for newly synchronised rows.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Semver requirement on the host version, e.g. `>=0.1, <0.3`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<String>,
}

fn default_true() -> bool {
    true
}

impl PluginMeta {
    /// Creates metadata with every optional field unset.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            verbose_name: None,
            version: version.into(),
            author: None,
            author_email: None,
            vendor: None,
            category: None,
            description: String::new(),
            visible: true,
            enabled: true,
            compatibility: None,
        }
    }

    pub fn with_verbose_name(mut self, verbose_name: impl Into<String>) -> Self {
        self.verbose_name = Some(verbose_name.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>, email: Option<&str>) -> Self {
        self.author = Some(author.into());
        self.author_email = email.map(str::to_string);
        self
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_compatibility(mut self, requirement: impl Into<String>) -> Self {
        self.compatibility = Some(requirement.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Verbose name, or the last name segment with `_` replaced by spaces
    /// and the first letter upper-cased.
    pub fn display_name(&self) -> String {
        if let Some(verbose_name) = self.verbose_name.as_deref() {
            return verbose_name.to_string();
        }
        let label = self.name.rsplit('.').next().unwrap_or(&self.name);
        let spaced = label.replace('_', " ");
        let mut chars = spaced.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn display_author(&self) -> &str {
        self.author.as_deref().unwrap_or(DEFAULT_AUTHOR)
    }

    pub fn display_category(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_CATEGORY)
    }

    /// Parsed `version`.
    pub fn parsed_version(&self) -> Result<Version, MetaValidationError> {
        Version::parse(self.version.trim())
            .map_err(|_| MetaValidationError::InvalidVersion(self.version.clone()))
    }

    /// Parsed `compatibility`; `None` means compatible with every host.
    pub fn compatibility_req(&self) -> Result<Option<VersionReq>, MetaValidationError> {
        match self.compatibility.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => VersionReq::parse(raw)
                .map(Some)
                .map_err(|_| MetaValidationError::InvalidCompatibility(raw.to_string())),
        }
    }

    /// Whether `host` satisfies the compatibility requirement.
    pub fn is_compatible_with(&self, host: &Version) -> Result<bool, MetaValidationError> {
        Ok(self
            .compatibility_req()?
            .map_or(true, |requirement| requirement.matches(host)))
    }

    /// Validates declaration-level metadata invariants.
    pub fn validate(&self) -> Result<(), MetaValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(MetaValidationError::EmptyName);
        }
        if !PLUGIN_NAME_RE.is_match(name) {
            return Err(MetaValidationError::InvalidName(self.name.clone()));
        }

        if self.version.trim().is_empty() {
            return Err(MetaValidationError::EmptyVersion);
        }
        self.parsed_version()?;
        self.compatibility_req()?;

        if let Some(email) = self.author_email.as_deref() {
            if !email.is_empty() && !EMAIL_RE.is_match(email) {
                return Err(MetaValidationError::InvalidEmail(email.to_string()));
            }
        }
        Ok(())
    }
}

/// Metadata validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValidationError {
    EmptyName,
    InvalidName(String),
    EmptyVersion,
    InvalidVersion(String),
    InvalidCompatibility(String),
    InvalidEmail(String),
}

impl Display for MetaValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "plugin name cannot be empty"),
            Self::InvalidName(value) => write!(
                f,
                "invalid plugin name `{value}`; expected dotted lower-case identifier"
            ),
            Self::EmptyVersion => write!(f, "plugin version cannot be empty"),
            Self::InvalidVersion(value) => {
                write!(f, "plugin version number is incorrect: `{value}`")
            }
            Self::InvalidCompatibility(value) => {
                write!(f, "invalid compatibility requirement `{value}`")
            }
            Self::InvalidEmail(value) => write!(f, "invalid author email `{value}`"),
        }
    }
}

impl Error for MetaValidationError {}

#[cfg(test)]
mod tests {
    use super::{MetaValidationError, PluginMeta};
    use semver::Version;

    #[test]
    fn display_defaults_are_derived() {
        let meta = PluginMeta::new("myapp.plugins.time_tracking", "1.0.0");
        assert_eq!(meta.display_name(), "Time tracking");
        assert_eq!(meta.display_author(), "unknown");
        assert_eq!(meta.display_category(), "Miscellaneous");

        let named = meta.with_verbose_name("Timesheets").with_category("Office");
        assert_eq!(named.display_name(), "Timesheets");
        assert_eq!(named.display_category(), "Office");
    }

    #[test]
    fn validate_accepts_well_formed_meta() {
        let meta = PluginMeta::new("myapp.plugins.billing", "0.3.1")
            .with_author("Ada", Some("ada@example.org"))
            .with_compatibility(">=0.1, <0.3");
        meta.validate().expect("meta should be valid");
    }

    #[test]
    fn validate_rejects_bad_fields() {
        assert_eq!(
            PluginMeta::new("", "1.0.0").validate(),
            Err(MetaValidationError::EmptyName)
        );
        assert_eq!(
            PluginMeta::new("MyApp.Billing", "1.0.0").validate(),
            Err(MetaValidationError::InvalidName("MyApp.Billing".to_string()))
        );
        assert_eq!(
            PluginMeta::new("billing", "1.0").validate(),
            Err(MetaValidationError::InvalidVersion("1.0".to_string()))
        );
        assert!(matches!(
            PluginMeta::new("billing", "1.0.0")
                .with_compatibility("not a range")
                .validate(),
            Err(MetaValidationError::InvalidCompatibility(_))
        ));
        assert!(matches!(
            PluginMeta::new("billing", "1.0.0")
                .with_author("Ada", Some("nobody"))
                .validate(),
            Err(MetaValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn compatibility_is_checked_against_host() {
        let meta = PluginMeta::new("billing", "1.0.0").with_compatibility(">=0.2");
        let old_host = Version::new(0, 1, 9);
        let new_host = Version::new(0, 2, 0);
        assert!(!meta.is_compatible_with(&old_host).expect("valid requirement"));
        assert!(meta.is_compatible_with(&new_host).expect("valid requirement"));

        let unrestricted = PluginMeta::new("billing", "1.0.0");
        assert!(unrestricted
            .is_compatible_with(&old_host)
            .expect("no requirement"));
    }

    #[test]
    fn deserialize_applies_defaults() {
        let meta: PluginMeta =
            serde_json::from_str(r#"{"name":"billing","version":"1.2.0"}"#).expect("parse meta");
        assert!(meta.visible);
        assert!(meta.enabled);
        assert!(meta.description.is_empty());
        assert_eq!(meta.author, None);

        let json = serde_json::to_value(&meta).expect("serialize meta");
        assert!(json.get("author").is_none());
    }
}
