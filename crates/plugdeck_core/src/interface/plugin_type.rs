//! Runtime description of a conforming type.

use crate::interface::spec::MemberKind;
use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};

/// Describes one concrete type offered to `Registry::register`.
///
/// The member table is what required-member checks run against, so it must
/// list every public method/attribute the type actually provides.
pub struct PluginType<T> {
    name: String,
    members: BTreeMap<String, MemberKind>,
    enabled: Option<bool>,
    ctor: fn() -> T,
}

impl<T: Send + Sync + 'static> PluginType<T> {
    /// Creates a description with a zero-argument constructor.
    ///
    /// `ctor` runs inside `Registry::register` for service interfaces and
    /// must not register anything on that same registry.
    pub fn new(name: impl Into<String>, ctor: fn() -> T) -> Self {
        Self {
            name: name.into(),
            members: BTreeMap::new(),
            enabled: None,
            ctor,
        }
    }

    pub fn method(mut self, name: impl Into<String>) -> Self {
        self.members.insert(name.into(), MemberKind::Method);
        self
    }

    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.members.insert(name.into(), MemberKind::Attribute);
        self
    }

    /// Sets the `enabled` attribute. Types without it count as enabled.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    /// Returns the declared `enabled` attribute, if any.
    pub fn enabled_flag(&self) -> Option<bool> {
        self.enabled
    }

    /// Returns how `name` is provided, or `None` when it is absent.
    pub fn member(&self, name: &str) -> Option<MemberKind> {
        self.members.get(name).copied()
    }

    pub(crate) fn ctor(&self) -> fn() -> T {
        self.ctor
    }
}

impl<T> Debug for PluginType<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginType")
            .field("name", &self.name)
            .field("members", &self.members)
            .field("enabled", &self.enabled)
            .finish()
    }
}
