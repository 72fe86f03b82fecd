//! Plugin table synchronisation.

use crate::interface::Interface;
use crate::plugin::{MetaValidationError, PluginApp, PluginError, PluginMeta};
use crate::repo::{PluginRepository, RepoError, SqlitePluginRepository};
use crate::sync::hooks::PluginSyncHook;
use log::{error, info, warn};
use rusqlite::Connection;
use semver::Version;
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Names touched by one sync run, each list in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    /// Subset of `updated` whose discovered version is newer than the stored one.
    pub upgraded: Vec<String>,
    pub removed: Vec<String>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug)]
pub enum SyncError {
    InvalidVersion {
        plugin: String,
        version: String,
    },
    InvalidMeta {
        plugin: String,
        source: MetaValidationError,
    },
    IncompatibleVersions {
        plugin: String,
        requirement: String,
        host_version: Version,
    },
    InitializeFailed {
        plugin: String,
        source: PluginError,
    },
    Repo(RepoError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidVersion { plugin, version } => write!(
                f,
                "plugin `{plugin}` version number is incorrect: `{version}`"
            ),
            Self::InvalidMeta { plugin, source } => {
                write!(f, "plugin `{plugin}` has invalid metadata: {source}")
            }
            Self::IncompatibleVersions {
                plugin,
                requirement,
                host_version,
            } => write!(
                f,
                "plugin `{plugin}` requires host `{requirement}`, found {host_version}"
            ),
            Self::InitializeFailed { plugin, source } => {
                write!(f, "error calling initialize() of plugin `{plugin}`: {source}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidMeta { source, .. } => Some(source),
            Self::InitializeFailed { source, .. } => Some(source),
            Self::Repo(err) => Some(err),
            Self::InvalidVersion { .. } | Self::IncompatibleVersions { .. } => None,
        }
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Mirrors `plugins` into the `plugins` table.
///
/// Existing rows get their metadata refreshed; new rows are inserted and the
/// app's `initialize` hook runs; rows without a discovered plugin are
/// deleted. Enabled `hooks` are notified per plugin after commit.
///
/// # Errors
/// - `InvalidVersion` / `InvalidMeta` for malformed plugin metadata.
/// - `IncompatibleVersions` when `host_version` misses a plugin's requirement.
/// - `InitializeFailed` when a new plugin's first-install hook fails.
pub fn sync_plugins(
    conn: &mut Connection,
    plugins: &[Arc<dyn PluginApp>],
    hooks: &Interface<dyn PluginSyncHook>,
    host_version: &Version,
) -> Result<SyncReport, SyncError> {
    info!(
        "event=plugin_sync module=sync status=start plugins={} host_version={}",
        plugins.len(),
        host_version
    );
    let synced_at_ms = now_epoch_ms();
    let mut report = SyncReport::default();

    let tx = conn.transaction()?;
    {
        let repo = SqlitePluginRepository::new(&tx);
        for app in plugins {
            if let Err(err) =
                sync_one(&repo, app.as_ref(), host_version, synced_at_ms, &mut report)
            {
                error!(
                    "event=plugin_sync module=sync status=error plugin={} error={}",
                    app.meta().name,
                    err
                );
                return Err(err);
            }
        }

        let discovered: BTreeSet<&str> = plugins
            .iter()
            .map(|app| app.meta().name.as_str())
            .collect();
        for name in repo.plugin_names()? {
            if !discovered.contains(name.as_str()) {
                repo.delete_plugin(&name)?;
                info!("event=plugin_sync module=sync status=orphan_removed plugin={name}");
                report.removed.push(name);
            }
        }
    }
    tx.commit()?;

    for app in plugins {
        for hook in hooks.enumerate(false).instances() {
            hook.plugin_synchronized(app.meta());
        }
    }

    info!(
        "event=plugin_sync module=sync status=ok created={} updated={} upgraded={} removed={}",
        report.created.len(),
        report.updated.len(),
        report.upgraded.len(),
        report.removed.len()
    );
    Ok(report)
}

fn sync_one(
    repo: &SqlitePluginRepository<'_>,
    app: &dyn PluginApp,
    host_version: &Version,
    synced_at_ms: i64,
    report: &mut SyncReport,
) -> Result<(), SyncError> {
    let meta = app.meta();
    let version = Version::parse(meta.version.trim()).map_err(|_| SyncError::InvalidVersion {
        plugin: meta.name.clone(),
        version: meta.version.clone(),
    })?;
    meta.validate().map_err(|source| SyncError::InvalidMeta {
        plugin: meta.name.clone(),
        source,
    })?;
    check_compatibility(meta, host_version)?;

    match repo.stored_version(&meta.name)? {
        Some(stored) => {
            if is_upgrade(&stored, &version) {
                warn!(
                    "event=plugin_sync module=sync status=upgrade plugin={} from={} to={}",
                    meta.name, stored, version
                );
                report.upgraded.push(meta.name.clone());
            }
            repo.update_metadata(meta, synced_at_ms)?;
            report.updated.push(meta.name.clone());
        }
        None => {
            repo.insert_plugin(meta, synced_at_ms)?;
            info!(
                "event=plugin_sync module=sync status=created plugin={} version={}",
                meta.name, version
            );
            app.initialize()
                .map_err(|source| SyncError::InitializeFailed {
                    plugin: meta.name.clone(),
                    source,
                })?;
            report.created.push(meta.name.clone());
        }
    }
    Ok(())
}

fn check_compatibility(meta: &PluginMeta, host_version: &Version) -> Result<(), SyncError> {
    let compatible = meta
        .is_compatible_with(host_version)
        .map_err(|source| SyncError::InvalidMeta {
            plugin: meta.name.clone(),
            source,
        })?;
    if compatible {
        return Ok(());
    }
    Err(SyncError::IncompatibleVersions {
        plugin: meta.name.clone(),
        requirement: meta.compatibility.clone().unwrap_or_default(),
        host_version: host_version.clone(),
    })
}

// An unparsable stored version is treated as outdated so the row gets repaired.
fn is_upgrade(stored: &str, discovered: &Version) -> bool {
    match Version::parse(stored.trim()) {
        Ok(stored) => discovered > &stored,
        Err(_) => true,
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
