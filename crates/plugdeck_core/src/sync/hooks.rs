//! Post-sync notification interface.

use crate::interface::{Interface, InterfaceSpec, Registry};
use crate::plugin::PluginMeta;

pub const SYNC_HOOK_INTERFACE: &str = "IPluginSyncHook";

/// Called once per synchronised plugin after a sync run committed.
pub trait PluginSyncHook: Send + Sync {
    fn plugin_synchronized(&self, plugin: &PluginMeta);
}

/// Returns the registry's `IPluginSyncHook` interface, declaring it on first use.
pub fn sync_hooks(registry: &Registry) -> Interface<dyn PluginSyncHook> {
    registry.interface_or_declare(
        InterfaceSpec::new(SYNC_HOOK_INTERFACE).method("plugin_synchronized"),
    )
}
