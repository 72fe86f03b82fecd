//! Synchronisation of discovered plugins into the `plugins` table.
//!
//! # Responsibility
//! - Create, update and remove plugin rows so the table mirrors discovery.
//! - Run first-install hooks for new plugins.
//! - Notify `IPluginSyncHook` implementations about synchronised plugins.
//!
//! # Invariants
//! - A sync run is one transaction: any failure leaves the table unchanged.
//! - Hooks are notified only after the transaction committed.
//! - Admin-controlled `enabled` flags of existing rows survive a sync.

mod hooks;
mod plugin_sync;

pub use hooks::{sync_hooks, PluginSyncHook, SYNC_HOOK_INTERFACE};
pub use plugin_sync::{sync_plugins, SyncError, SyncReport};
