//! Persistence for synchronised plugin rows.
//!
//! # Responsibility
//! - Provide data access over the `plugins` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Writes validate `PluginMeta` before touching SQL.
//! - `enabled` is admin-controlled: metadata updates never change it.

pub mod plugin_repo;

pub use plugin_repo::{
    PluginListQuery, PluginRecord, PluginRepository, RepoError, RepoResult,
    SqlitePluginRepository,
};
