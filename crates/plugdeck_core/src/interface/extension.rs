//! Enumeration views over registered implementations.

use crate::interface::plugin_type::PluginType;
use crate::interface::registry::Interface;
use std::any::TypeId;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::sync::Arc;

/// Identity shared by every entry created from one `register` call.
#[derive(Debug)]
pub(crate) struct TypeInfo {
    name: String,
    type_id: TypeId,
    enabled: Option<bool>,
}

impl TypeInfo {
    pub(crate) fn of<T: Send + Sync + 'static>(plugin_type: &PluginType<T>) -> Self {
        Self {
            name: plugin_type.name().to_string(),
            type_id: plugin_type.type_id(),
            enabled: plugin_type.enabled_flag(),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// Instance owned by a service interface.
pub struct ServiceInstance<I: ?Sized> {
    info: Arc<TypeInfo>,
    instance: Arc<I>,
}

impl<I: ?Sized> ServiceInstance<I> {
    pub(crate) fn new(info: Arc<TypeInfo>, instance: Arc<I>) -> Self {
        Self { info, instance }
    }

    pub fn type_name(&self) -> &str {
        &self.info.name
    }

    pub fn instance(&self) -> &Arc<I> {
        &self.instance
    }
}

impl<I: ?Sized> Deref for ServiceInstance<I> {
    type Target = I;

    fn deref(&self) -> &I {
        &self.instance
    }
}

impl<I: ?Sized> Clone for ServiceInstance<I> {
    fn clone(&self) -> Self {
        Self {
            info: Arc::clone(&self.info),
            instance: Arc::clone(&self.instance),
        }
    }
}

/// Class kept by a non-service interface.
///
/// The registry never constructs it; callers opt in with `instantiate`.
pub struct PluginClass<I: ?Sized> {
    info: Arc<TypeInfo>,
    factory: Arc<dyn Fn() -> Arc<I> + Send + Sync>,
}

impl<I: ?Sized> PluginClass<I> {
    pub(crate) fn new(
        info: Arc<TypeInfo>,
        factory: Arc<dyn Fn() -> Arc<I> + Send + Sync>,
    ) -> Self {
        Self { info, factory }
    }

    pub fn type_name(&self) -> &str {
        &self.info.name
    }

    pub fn type_id(&self) -> TypeId {
        self.info.type_id
    }

    pub fn is_enabled(&self) -> bool {
        self.info.is_enabled()
    }

    /// Constructs a fresh instance. Every call returns a new value.
    pub fn instantiate(&self) -> Arc<I> {
        (self.factory)()
    }
}

impl<I: ?Sized> Clone for PluginClass<I> {
    fn clone(&self) -> Self {
        Self {
            info: Arc::clone(&self.info),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<I: ?Sized> Debug for PluginClass<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PluginClass").field(&self.info.name).finish()
    }
}

/// One registered implementation as seen by consumers.
pub enum Extension<I: ?Sized> {
    Service(ServiceInstance<I>),
    Class(PluginClass<I>),
}

impl<I: ?Sized> Extension<I> {
    fn info(&self) -> &TypeInfo {
        match self {
            Self::Service(service) => &service.info,
            Self::Class(class) => &class.info,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.info().name
    }

    pub fn type_id(&self) -> TypeId {
        self.info().type_id
    }

    /// `false` only when the type declared `enabled = false`.
    pub fn is_enabled(&self) -> bool {
        self.info().is_enabled()
    }

    pub fn as_service(&self) -> Option<&ServiceInstance<I>> {
        match self {
            Self::Service(service) => Some(service),
            Self::Class(_) => None,
        }
    }

    pub fn as_class(&self) -> Option<&PluginClass<I>> {
        match self {
            Self::Service(_) => None,
            Self::Class(class) => Some(class),
        }
    }

    /// Returns the held instance. Classes yield `None`: they are never
    /// instantiated implicitly.
    pub fn into_instance(self) -> Option<Arc<I>> {
        match self {
            Self::Service(service) => Some(service.instance),
            Self::Class(_) => None,
        }
    }

    pub fn into_class(self) -> Option<PluginClass<I>> {
        match self {
            Self::Service(_) => None,
            Self::Class(class) => Some(class),
        }
    }
}

impl<I: ?Sized> Clone for Extension<I> {
    fn clone(&self) -> Self {
        match self {
            Self::Service(service) => Self::Service(service.clone()),
            Self::Class(class) => Self::Class(class.clone()),
        }
    }
}

impl<I: ?Sized> Debug for Extension<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Service(service) => f.debug_tuple("Service").field(&service.info.name).finish(),
            Self::Class(class) => f.debug_tuple("Class").field(&class.info.name).finish(),
        }
    }
}

/// Snapshot iterator over one enumeration, in registration order.
///
/// Not indexable: positions carry no meaning for consumers.
pub struct Extensions<I: ?Sized> {
    inner: std::vec::IntoIter<Extension<I>>,
}

impl<I: ?Sized> Extensions<I> {
    pub(crate) fn new(snapshot: Vec<Extension<I>>) -> Self {
        Self {
            inner: snapshot.into_iter(),
        }
    }

    /// Keeps service instances only.
    pub fn instances(self) -> impl Iterator<Item = Arc<I>> {
        self.filter_map(Extension::into_instance)
    }

    /// Keeps non-service classes only.
    pub fn classes(self) -> impl Iterator<Item = PluginClass<I>> {
        self.filter_map(Extension::into_class)
    }
}

impl<I: ?Sized> Iterator for Extensions<I> {
    type Item = Extension<I>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<I: ?Sized> ExactSizeIterator for Extensions<I> {}

/// Enabled-only view over one interface.
///
/// Recomputed from the live collection on every call, so registrations made
/// after the view was created are visible.
pub struct ExtensionPoint<I: ?Sized + Send + Sync + 'static> {
    interface: Interface<I>,
}

impl<I: ?Sized + Send + Sync + 'static> ExtensionPoint<I> {
    pub fn new(interface: &Interface<I>) -> Self {
        Self {
            interface: interface.clone(),
        }
    }

    pub fn interface(&self) -> &Interface<I> {
        &self.interface
    }

    /// Enabled implementations.
    pub fn iter(&self) -> Extensions<I> {
        self.interface.enumerate(false)
    }

    /// All implementations, disabled ones included.
    pub fn all(&self) -> Extensions<I> {
        self.interface.enumerate(true)
    }

    /// Number of enabled implementations.
    pub fn len(&self) -> usize {
        self.iter().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Type membership within the enabled view.
    pub fn contains<T: 'static>(&self) -> bool {
        let type_id = TypeId::of::<T>();
        self.iter().any(|extension| extension.type_id() == type_id)
    }
}

impl<I: ?Sized + Send + Sync + 'static> Clone for ExtensionPoint<I> {
    fn clone(&self) -> Self {
        Self {
            interface: self.interface.clone(),
        }
    }
}

impl<'a, I: ?Sized + Send + Sync + 'static> IntoIterator for &'a ExtensionPoint<I> {
    type Item = Extension<I>;
    type IntoIter = Extensions<I>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<I: ?Sized + Send + Sync + 'static> Display for ExtensionPoint<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<ExtensionPoint '{}'>", self.interface.name())
    }
}

impl<I: ?Sized + Send + Sync + 'static> Debug for ExtensionPoint<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
