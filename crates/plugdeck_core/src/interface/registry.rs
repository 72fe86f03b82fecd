//! Interface registry and conformance registration.

use crate::interface::error::ConformanceError;
use crate::interface::extension::{
    Extension, ExtensionPoint, Extensions, PluginClass, ServiceInstance, TypeInfo,
};
use crate::interface::plugin_type::PluginType;
use crate::interface::spec::{InterfaceSpec, MemberKind};
use log::{info, warn};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::any::{Any, TypeId};
use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

static NEXT_INTERFACE_ID: AtomicU64 = AtomicU64::new(1);
static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Returns the process-wide registry.
///
/// Library code should accept a `&Registry` instead, so tests can run against
/// a fresh instance.
pub fn global() -> &'static Registry {
    &GLOBAL_REGISTRY
}

/// Process-unique interface identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterfaceId(u64);

struct InterfaceInner<I: ?Sized> {
    id: InterfaceId,
    registry_id: Uuid,
    spec: InterfaceSpec,
    implementations: RwLock<Vec<Extension<I>>>,
}

/// Type-erased view the registry keeps for every declaration.
trait DeclaredInterface: Send + Sync {
    fn id(&self) -> InterfaceId;
    fn name(&self) -> &str;
    fn clear(&self);
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<I: ?Sized + Send + Sync + 'static> DeclaredInterface for InterfaceInner<I> {
    fn id(&self) -> InterfaceId {
        self.id
    }

    fn name(&self) -> &str {
        self.spec.name()
    }

    fn clear(&self) {
        self.implementations.write().clear();
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Handle to one declared interface.
///
/// `I` is the trait-object type consumers call through, e.g. `dyn Greeter`.
/// Handles are cheap to clone and all clones share one implementation
/// collection. The only way to obtain one is `Registry::declare_interface`;
/// the bare interface marker has no constructor.
pub struct Interface<I: ?Sized> {
    inner: Arc<InterfaceInner<I>>,
}

impl<I: ?Sized + Send + Sync + 'static> Interface<I> {
    pub fn id(&self) -> InterfaceId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        self.inner.spec.name()
    }

    pub fn is_service(&self) -> bool {
        self.inner.spec.is_service()
    }

    pub fn spec(&self) -> &InterfaceSpec {
        &self.inner.spec
    }

    /// Binds this interface as a registration target for `T`.
    ///
    /// `cast` is the unsizing coercion from `T` to the interface object;
    /// `|plugin| plugin` is enough once `T` is named:
    /// `greeters.bind::<EnglishGreeter>(|plugin| plugin)`.
    pub fn bind<T: Send + Sync + 'static>(
        &self,
        cast: fn(Arc<T>) -> Arc<I>,
    ) -> Binding<'_, T> {
        Binding {
            slot: Box::new(TypedBinding {
                interface: self,
                cast,
            }),
        }
    }

    /// Snapshot of current implementations in registration order.
    ///
    /// Members declaring `enabled = false` are skipped unless
    /// `include_disabled` is set.
    pub fn enumerate(&self, include_disabled: bool) -> Extensions<I> {
        let snapshot = self
            .inner
            .implementations
            .read()
            .iter()
            .filter(|extension| include_disabled || extension.is_enabled())
            .cloned()
            .collect();
        Extensions::new(snapshot)
    }

    /// Number of registrations, disabled ones included.
    pub fn len(&self) -> usize {
        self.inner.implementations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `T` is registered, disabled or not.
    ///
    /// Membership is by type only; instances are never compared.
    pub fn contains<T: 'static>(&self) -> bool {
        self.contains_type(TypeId::of::<T>())
    }

    pub fn contains_type(&self, type_id: TypeId) -> bool {
        self.inner
            .implementations
            .read()
            .iter()
            .any(|extension| extension.type_id() == type_id)
    }

    /// Enabled-only view tracking this interface.
    pub fn extension_point(&self) -> ExtensionPoint<I> {
        ExtensionPoint::new(self)
    }
}

impl<I: ?Sized> Clone for Interface<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I: ?Sized> PartialEq for Interface<I> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<I: ?Sized> Eq for Interface<I> {}

impl<I: ?Sized + Send + Sync + 'static> Debug for Interface<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interface")
            .field("name", &self.name())
            .field("service", &self.is_service())
            .field("implementations", &self.len())
            .finish()
    }
}

impl<'a, I: ?Sized + Send + Sync + 'static> IntoIterator for &'a Interface<I> {
    type Item = Extension<I>;
    type IntoIter = Extensions<I>;

    fn into_iter(self) -> Self::IntoIter {
        self.enumerate(false)
    }
}

/// One registration target for a type `T`, created by `Interface::bind`.
pub struct Binding<'a, T> {
    slot: Box<dyn BindingSlot<T> + 'a>,
}

trait BindingSlot<T> {
    fn interface_id(&self) -> InterfaceId;
    fn registry_id(&self) -> Uuid;
    fn spec(&self) -> &InterfaceSpec;
    fn contains_type(&self, type_id: TypeId) -> bool;
    /// Builds the entry for `plugin_type` and returns the deferred push.
    fn prepare<'s>(
        &'s self,
        plugin_type: &PluginType<T>,
        info: &Arc<TypeInfo>,
    ) -> Box<dyn FnOnce() + 's>;
}

struct TypedBinding<'a, I: ?Sized, T> {
    interface: &'a Interface<I>,
    cast: fn(Arc<T>) -> Arc<I>,
}

impl<I, T> BindingSlot<T> for TypedBinding<'_, I, T>
where
    I: ?Sized + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    fn interface_id(&self) -> InterfaceId {
        self.interface.id()
    }

    fn registry_id(&self) -> Uuid {
        self.interface.inner.registry_id
    }

    fn spec(&self) -> &InterfaceSpec {
        self.interface.spec()
    }

    fn contains_type(&self, type_id: TypeId) -> bool {
        self.interface.contains_type(type_id)
    }

    fn prepare<'s>(
        &'s self,
        plugin_type: &PluginType<T>,
        info: &Arc<TypeInfo>,
    ) -> Box<dyn FnOnce() + 's> {
        let ctor = plugin_type.ctor();
        let cast = self.cast;
        let extension = if self.interface.is_service() {
            Extension::Service(ServiceInstance::new(
                Arc::clone(info),
                cast(Arc::new(ctor())),
            ))
        } else {
            Extension::Class(PluginClass::new(
                Arc::clone(info),
                Arc::new(move || cast(Arc::new(ctor()))),
            ))
        };
        let interface = self.interface;
        Box::new(move || interface.inner.implementations.write().push(extension))
    }
}

/// Registry of declared interfaces.
///
/// Construct one per test to avoid cross-test leakage, or use `global()` in
/// application code that relies on a single process-wide registry.
pub struct Registry {
    id: Uuid,
    interfaces: RwLock<Vec<Arc<dyn DeclaredInterface>>>,
    registration: Mutex<()>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            interfaces: RwLock::new(Vec::new()),
            registration: Mutex::new(()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Declares a new interface with an empty implementation collection.
    ///
    /// Every call yields a distinct identity, even for identical specs.
    pub fn declare_interface<I: ?Sized + Send + Sync + 'static>(
        &self,
        spec: InterfaceSpec,
    ) -> Interface<I> {
        let mut interfaces = self.interfaces.write();
        if interfaces
            .iter()
            .any(|declared| declared.name() == spec.name())
        {
            warn!(
                "event=interface_declare module=interface status=duplicate_name interface={}",
                spec.name()
            );
        }
        self.push_declaration(&mut interfaces, spec)
    }

    /// Returns the earliest declaration matching `spec`'s name and object type,
    /// declaring it when none exists.
    ///
    /// Lookup and declaration happen under one lock, so concurrent callers
    /// share a single interface.
    pub fn interface_or_declare<I: ?Sized + Send + Sync + 'static>(
        &self,
        spec: InterfaceSpec,
    ) -> Interface<I> {
        let mut interfaces = self.interfaces.write();
        if let Some(inner) = find_declared::<I>(&interfaces, spec.name()) {
            return Interface { inner };
        }
        self.push_declaration(&mut interfaces, spec)
    }

    fn push_declaration<I: ?Sized + Send + Sync + 'static>(
        &self,
        interfaces: &mut Vec<Arc<dyn DeclaredInterface>>,
        spec: InterfaceSpec,
    ) -> Interface<I> {
        let inner = Arc::new(InterfaceInner {
            id: InterfaceId(NEXT_INTERFACE_ID.fetch_add(1, Ordering::Relaxed)),
            registry_id: self.id,
            spec,
            implementations: RwLock::new(Vec::new()),
        });
        interfaces.push(inner.clone());
        info!(
            "event=interface_declare module=interface status=ok interface={} service={} required_members={}",
            inner.spec.name(),
            inner.spec.is_service(),
            inner.spec.required_members().count()
        );

        Interface { inner }
    }

    /// Looks up a declared interface by name and object type.
    ///
    /// When several declarations share the name, the earliest one whose
    /// object type matches wins.
    pub fn interface<I: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Option<Interface<I>> {
        find_declared::<I>(&self.interfaces.read(), name).map(|inner| Interface { inner })
    }

    /// Whether `id` was declared here and has not been reset since.
    pub fn is_declared(&self, id: InterfaceId) -> bool {
        self.interfaces
            .read()
            .iter()
            .any(|declared| declared.id() == id)
    }

    /// Declared interface names in declaration order.
    pub fn interface_names(&self) -> Vec<String> {
        self.interfaces
            .read()
            .iter()
            .map(|declared| declared.name().to_string())
            .collect()
    }

    /// Registers `plugin_type` against every bound interface.
    ///
    /// All bindings are validated before anything is appended, so a rejected
    /// call has no side effects. Service interfaces receive a fresh instance
    /// each; non-service interfaces receive the class.
    ///
    /// # Errors
    /// - `NoInterfaces` when `bindings` is empty.
    /// - `UndeclaredInterface` when a binding targets an interface this
    ///   registry does not (or no longer) declare.
    /// - `MissingMember` / `MemberNotCallable` when a required member is
    ///   absent or not callable.
    /// - `DuplicateImplementation` when the type is already registered on a
    ///   target, or a target is bound twice.
    ///
    /// Service constructors run while this registry's registration lock is
    /// held. A constructor must not call `register` on the same registry;
    /// the lock is not reentrant and the call deadlocks.
    pub fn register<T: Send + Sync + 'static>(
        &self,
        plugin_type: &PluginType<T>,
        bindings: &[Binding<'_, T>],
    ) -> Result<(), ConformanceError> {
        let _registration = self.registration.lock();

        if let Err(err) = self.check_conformance(plugin_type, bindings) {
            warn!(
                "event=plugin_register module=interface status=rejected type={} error={}",
                plugin_type.name(),
                err
            );
            return Err(err);
        }

        // Every constructor runs before the first push, so a panicking
        // constructor leaves all targets untouched.
        let info = Arc::new(TypeInfo::of(plugin_type));
        let pending: Vec<_> = bindings
            .iter()
            .map(|binding| binding.slot.prepare(plugin_type, &info))
            .collect();
        for push in pending {
            push();
        }

        info!(
            "event=plugin_register module=interface status=ok type={} interfaces={}",
            plugin_type.name(),
            bindings
                .iter()
                .map(|binding| binding.slot.spec().name())
                .collect::<Vec<_>>()
                .join(",")
        );
        Ok(())
    }

    /// Clears every implementation collection and forgets all declarations.
    ///
    /// Handles obtained before the reset stay readable but can no longer be
    /// registered against.
    pub fn reset(&self) {
        let _registration = self.registration.lock();
        let mut interfaces = self.interfaces.write();
        for declared in interfaces.iter() {
            declared.clear();
        }
        let cleared = interfaces.len();
        interfaces.clear();
        info!("event=registry_reset module=interface status=ok interfaces={cleared}");
    }

    fn check_conformance<T: Send + Sync + 'static>(
        &self,
        plugin_type: &PluginType<T>,
        bindings: &[Binding<'_, T>],
    ) -> Result<(), ConformanceError> {
        let type_name = plugin_type.name();
        if bindings.is_empty() {
            return Err(ConformanceError::NoInterfaces {
                type_name: type_name.to_string(),
            });
        }

        let mut targeted = BTreeSet::new();
        for binding in bindings {
            let slot = binding.slot.as_ref();
            let interface = slot.spec().name();

            if slot.registry_id() != self.id || !self.is_declared(slot.interface_id()) {
                return Err(ConformanceError::UndeclaredInterface {
                    type_name: type_name.to_string(),
                    interface: interface.to_string(),
                });
            }

            for (member, required) in slot.spec().required_members() {
                match plugin_type.member(member) {
                    None => {
                        return Err(ConformanceError::MissingMember {
                            type_name: type_name.to_string(),
                            member: member.to_string(),
                            interface: interface.to_string(),
                        });
                    }
                    Some(MemberKind::Attribute) if required == MemberKind::Method => {
                        return Err(ConformanceError::MemberNotCallable {
                            type_name: type_name.to_string(),
                            member: member.to_string(),
                            interface: interface.to_string(),
                        });
                    }
                    Some(_) => {}
                }
            }

            if !targeted.insert(slot.interface_id())
                || slot.contains_type(plugin_type.type_id())
            {
                return Err(ConformanceError::DuplicateImplementation {
                    type_name: type_name.to_string(),
                    interface: interface.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn find_declared<I: ?Sized + Send + Sync + 'static>(
    interfaces: &[Arc<dyn DeclaredInterface>],
    name: &str,
) -> Option<Arc<InterfaceInner<I>>> {
    interfaces
        .iter()
        .filter(|declared| declared.name() == name)
        .find_map(|declared| {
            Arc::clone(declared)
                .into_any()
                .downcast::<InterfaceInner<I>>()
                .ok()
        })
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("id", &self.id)
            .field("interfaces", &self.interface_names())
            .finish()
    }
}
