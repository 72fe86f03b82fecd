//! Plugin repository contract and SQLite implementation.

use crate::db::DbError;
use crate::plugin::{MetaValidationError, PluginMeta};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

const PLUGIN_SELECT_SQL: &str = "SELECT
    id,
    name,
    verbose_name,
    version,
    author,
    author_email,
    vendor,
    category,
    description,
    compatibility,
    visible,
    enabled,
    synced_at_ms
FROM plugins";

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Validation(MetaValidationError),
    Db(DbError),
    NotFound(String),
    AlreadyExists(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(name) => write!(f, "plugin not found: {name}"),
            Self::AlreadyExists(name) => write!(f, "plugin already stored: {name}"),
            Self::InvalidData(message) => write!(f, "invalid persisted plugin data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::AlreadyExists(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<MetaValidationError> for RepoError {
    fn from(value: MetaValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One stored plugin row.
///
/// Display defaults are materialised at write time, so `author` and
/// `category` are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginRecord {
    pub id: i64,
    pub name: String,
    pub verbose_name: String,
    pub version: String,
    pub author: String,
    pub author_email: Option<String>,
    pub vendor: Option<String>,
    pub category: String,
    pub description: String,
    pub compatibility: Option<String>,
    pub visible: bool,
    pub enabled: bool,
    /// Unix epoch milliseconds of the last sync that touched this row.
    pub synced_at_ms: i64,
}

/// Filters for listing plugins. Results are ordered by name.
#[derive(Debug, Clone, Default)]
pub struct PluginListQuery {
    pub visible_only: bool,
    pub enabled_only: bool,
    pub category: Option<String>,
}

pub trait PluginRepository {
    fn get_plugin(&self, name: &str) -> RepoResult<Option<PluginRecord>>;
    fn list_plugins(&self, query: &PluginListQuery) -> RepoResult<Vec<PluginRecord>>;
    /// Inserts a row whose `enabled` starts at `meta.enabled`.
    fn insert_plugin(&self, meta: &PluginMeta, synced_at_ms: i64) -> RepoResult<PluginRecord>;
    /// Copies metadata onto an existing row, leaving `enabled` untouched.
    fn update_metadata(&self, meta: &PluginMeta, synced_at_ms: i64) -> RepoResult<()>;
    fn set_enabled(&self, name: &str, enabled: bool) -> RepoResult<()>;
    fn delete_plugin(&self, name: &str) -> RepoResult<()>;
}

pub struct SqlitePluginRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePluginRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PluginRepository for SqlitePluginRepository<'_> {
    fn get_plugin(&self, name: &str) -> RepoResult<Option<PluginRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PLUGIN_SELECT_SQL} WHERE name = ?1;"))?;
        let mut rows = stmt.query([name])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_plugin_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_plugins(&self, query: &PluginListQuery) -> RepoResult<Vec<PluginRecord>> {
        let mut sql = format!("{PLUGIN_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if query.visible_only {
            sql.push_str(" AND visible = 1");
        }
        if query.enabled_only {
            sql.push_str(" AND enabled = 1");
        }
        if let Some(category) = query.category.as_deref() {
            sql.push_str(" AND category = ?");
            bind_values.push(Value::Text(category.to_string()));
        }
        sql.push_str(" ORDER BY name ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut plugins = Vec::new();
        while let Some(row) = rows.next()? {
            plugins.push(parse_plugin_row(row)?);
        }
        Ok(plugins)
    }

    fn insert_plugin(&self, meta: &PluginMeta, synced_at_ms: i64) -> RepoResult<PluginRecord> {
        meta.validate()?;
        if self.get_plugin(&meta.name)?.is_some() {
            return Err(RepoError::AlreadyExists(meta.name.clone()));
        }

        self.conn.execute(
            "INSERT INTO plugins (
                name,
                verbose_name,
                version,
                author,
                author_email,
                vendor,
                category,
                description,
                compatibility,
                visible,
                enabled,
                synced_at_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                meta.name.as_str(),
                meta.display_name(),
                meta.version.trim(),
                meta.display_author(),
                meta.author_email.as_deref(),
                meta.vendor.as_deref(),
                meta.display_category(),
                meta.description.as_str(),
                meta.compatibility.as_deref(),
                bool_to_int(meta.visible),
                bool_to_int(meta.enabled),
                synced_at_ms,
            ],
        )?;

        self.get_plugin(&meta.name)?
            .ok_or_else(|| RepoError::NotFound(meta.name.clone()))
    }

    fn update_metadata(&self, meta: &PluginMeta, synced_at_ms: i64) -> RepoResult<()> {
        meta.validate()?;

        let changed = self.conn.execute(
            "UPDATE plugins
             SET
                verbose_name = ?1,
                version = ?2,
                author = ?3,
                author_email = ?4,
                vendor = ?5,
                category = ?6,
                description = ?7,
                compatibility = ?8,
                visible = ?9,
                synced_at_ms = ?10
             WHERE name = ?11;",
            params![
                meta.display_name(),
                meta.version.trim(),
                meta.display_author(),
                meta.author_email.as_deref(),
                meta.vendor.as_deref(),
                meta.display_category(),
                meta.description.as_str(),
                meta.compatibility.as_deref(),
                bool_to_int(meta.visible),
                synced_at_ms,
                meta.name.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(meta.name.clone()));
        }
        Ok(())
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE plugins SET enabled = ?1 WHERE name = ?2;",
            params![bool_to_int(enabled), name],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(name.to_string()));
        }
        Ok(())
    }

    fn delete_plugin(&self, name: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM plugins WHERE name = ?1;", [name])?;
        if changed == 0 {
            return Err(RepoError::NotFound(name.to_string()));
        }
        Ok(())
    }
}

impl SqlitePluginRepository<'_> {
    /// Names of every stored plugin, ordered by name.
    pub fn plugin_names(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM plugins ORDER BY name ASC;")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Stored version string for `name`, if the row exists.
    pub fn stored_version(&self, name: &str) -> RepoResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT version FROM plugins WHERE name = ?1;",
                [name],
                |row| row.get::<_, String>(0),
            )
            .optional()?)
    }
}

fn parse_plugin_row(row: &Row<'_>) -> RepoResult<PluginRecord> {
    let name: String = row.get("name")?;
    let visible = parse_flag(row.get("visible")?, "visible", &name)?;
    let enabled = parse_flag(row.get("enabled")?, "enabled", &name)?;

    Ok(PluginRecord {
        id: row.get("id")?,
        verbose_name: row.get("verbose_name")?,
        version: row.get("version")?,
        author: row.get("author")?,
        author_email: row.get("author_email")?,
        vendor: row.get("vendor")?,
        category: row.get("category")?,
        description: row.get("description")?,
        compatibility: row.get("compatibility")?,
        visible,
        enabled,
        synced_at_ms: row.get("synced_at_ms")?,
        name,
    })
}

fn parse_flag(value: i64, column: &str, name: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid {column} value `{other}` for plugin `{name}`"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}
