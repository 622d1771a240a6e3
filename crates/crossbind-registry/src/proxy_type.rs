//! Managed proxy types mirroring native types.
//!
//! A [`ProxyType`] is created as an empty shell, filled in by its constructing
//! thread, and only then published. Every part is a `OnceLock`, so readers on
//! other threads either see a complete value or nothing.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crossbind_core::{FieldDescriptor, NativeType, RuntimeTypeHandle, TypeHash};
use crossbind_dispatch::OverloadSet;
use rustc_hash::{FxHashMap, FxHashSet};

/// What a proxy type stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyKind {
    Class,
    /// Interfaces become mixin modules.
    Interface,
    Array,
    Primitive,
}

impl ProxyKind {
    pub fn of(native: &NativeType) -> Self {
        if native.is_primitive() {
            ProxyKind::Primitive
        } else if native.is_array() {
            ProxyKind::Array
        } else if native.is_interface() {
            ProxyKind::Interface
        } else {
            ProxyKind::Class
        }
    }
}

/// Shared root types every proxy hierarchy hangs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootKind {
    /// Parent of the root object proxy and of primitive proxies.
    Concrete,
    /// Parent of all array proxies.
    Array,
}

/// The supertype of a proxy type.
#[derive(Debug, Clone)]
pub enum ProxySuper {
    Root(RootKind),
    Proxy(Arc<ProxyType>),
    /// Interface modules have no superclass.
    Module,
}

// ============================================================================
// Member table
// ============================================================================

/// Bound members of a proxy type.
///
/// Instance methods include those inherited through the superclass chain;
/// static methods and fields are the type's own.
#[derive(Debug, Default)]
pub struct MemberTable {
    pub(crate) constructors: Option<Arc<OverloadSet>>,
    pub(crate) instance_methods: FxHashMap<String, Arc<OverloadSet>>,
    pub(crate) static_methods: FxHashMap<String, Arc<OverloadSet>>,
    /// Managed alias to native method name.
    pub(crate) instance_aliases: FxHashMap<String, String>,
    pub(crate) static_aliases: FxHashMap<String, String>,
    pub(crate) instance_fields: FxHashMap<String, FieldDescriptor>,
    pub(crate) static_fields: FxHashMap<String, FieldDescriptor>,
}

impl MemberTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn constructors(&self) -> Option<&Arc<OverloadSet>> {
        self.constructors.as_ref()
    }

    /// Instance method by native name or managed alias.
    pub fn instance_method(&self, name: &str) -> Option<&Arc<OverloadSet>> {
        self.instance_methods.get(name).or_else(|| {
            self.instance_aliases
                .get(name)
                .and_then(|native| self.instance_methods.get(native))
        })
    }

    /// Static method by native name or managed alias.
    pub fn static_method(&self, name: &str) -> Option<&Arc<OverloadSet>> {
        self.static_methods.get(name).or_else(|| {
            self.static_aliases
                .get(name)
                .and_then(|native| self.static_methods.get(native))
        })
    }

    pub fn instance_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.instance_fields.get(name)
    }

    pub fn static_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.static_fields.get(name)
    }

    /// Every managed-visible name, sorted.
    pub fn managed_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .instance_methods
            .keys()
            .chain(self.static_methods.keys())
            .chain(self.instance_aliases.keys())
            .chain(self.static_aliases.keys())
            .chain(self.instance_fields.keys())
            .chain(self.static_fields.keys())
            .cloned()
            .collect();
        if self.constructors.is_some() {
            names.push("new".to_string());
        }
        names.sort_unstable();
        names.dedup();
        names
    }
}

// ============================================================================
// ProxyType
// ============================================================================

/// Managed-runtime type bound one-to-one with a native type.
pub struct ProxyType {
    native: Arc<NativeType>,
    kind: ProxyKind,
    superclass: OnceLock<ProxySuper>,
    interfaces: OnceLock<Vec<Arc<ProxyType>>>,
    members: OnceLock<MemberTable>,
    runtime_type: OnceLock<RuntimeTypeHandle>,
    finished: AtomicBool,
    cache_proxy: AtomicBool,
}

impl ProxyType {
    /// Create an empty shell for `native`.
    pub(crate) fn shell(native: Arc<NativeType>) -> Self {
        Self {
            kind: ProxyKind::of(&native),
            native,
            superclass: OnceLock::new(),
            interfaces: OnceLock::new(),
            members: OnceLock::new(),
            runtime_type: OnceLock::new(),
            finished: AtomicBool::new(false),
            cache_proxy: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_superclass(&self, sup: ProxySuper) {
        let _ = self.superclass.set(sup);
    }

    pub(crate) fn set_interfaces(&self, interfaces: Vec<Arc<ProxyType>>) {
        let _ = self.interfaces.set(interfaces);
    }

    pub(crate) fn set_members(&self, members: MemberTable) {
        let _ = self.members.set(members);
    }

    pub(crate) fn set_runtime_type(&self, handle: RuntimeTypeHandle) {
        let _ = self.runtime_type.set(handle);
    }

    pub(crate) fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    // === Queries ===

    pub fn native(&self) -> &Arc<NativeType> {
        &self.native
    }

    pub fn name(&self) -> &str {
        &self.native.full_name
    }

    pub fn type_hash(&self) -> TypeHash {
        self.native.type_hash
    }

    pub fn kind(&self) -> ProxyKind {
        self.kind
    }

    /// Supertype, once bound.
    pub fn superclass(&self) -> Option<&ProxySuper> {
        self.superclass.get()
    }

    /// Superclass proxy, for class proxies below the root.
    pub fn super_proxy(&self) -> Option<&Arc<ProxyType>> {
        match self.superclass.get()? {
            ProxySuper::Proxy(p) => Some(p),
            _ => None,
        }
    }

    /// Included interface modules, once bound.
    pub fn interfaces(&self) -> &[Arc<ProxyType>] {
        self.interfaces.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn members(&self) -> Option<&MemberTable> {
        self.members.get()
    }

    pub fn runtime_type(&self) -> Option<RuntimeTypeHandle> {
        self.runtime_type.get().copied()
    }

    /// Whether the proxy has been published to all threads.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Whether every part of the proxy has been bound.
    pub fn is_complete(&self) -> bool {
        self.superclass.get().is_some()
            && self.interfaces.get().is_some()
            && self.members.get().is_some()
            && self.runtime_type.get().is_some()
    }

    /// Whether instances of this type always go through the identity cache.
    pub fn caches_instances(&self) -> bool {
        self.cache_proxy.load(Ordering::Acquire)
    }

    pub fn set_cache_proxy(&self, enabled: bool) {
        self.cache_proxy.store(enabled, Ordering::Release);
    }

    /// Whether managed code may subclass this type.
    pub fn is_extensible(&self) -> bool {
        !(self.native.is_final() || matches!(self.kind, ProxyKind::Array | ProxyKind::Primitive))
    }

    /// Whether `hash` is this type or one of its supertypes.
    pub fn is_a(&self, hash: TypeHash) -> bool {
        let mut found = false;
        self.walk(&mut FxHashSet::default(), &mut |p| {
            found = p.type_hash() == hash;
            found
        });
        found
    }

    /// Instance method visible on this type, searching included interfaces for defaults.
    pub fn find_method(&self, name: &str) -> Option<Arc<OverloadSet>> {
        let mut result = None;
        self.walk(&mut FxHashSet::default(), &mut |p| {
            result = p
                .members()
                .and_then(|m| m.instance_method(name))
                .map(Arc::clone);
            result.is_some()
        });
        result
    }

    /// Static method declared on this type or a superclass.
    pub fn find_static_method(&self, name: &str) -> Option<Arc<OverloadSet>> {
        let mut current = Some(self);
        while let Some(p) = current {
            if let Some(set) = p.members().and_then(|m| m.static_method(name)) {
                return Some(Arc::clone(set));
            }
            current = p.super_proxy().map(Arc::as_ref);
        }
        None
    }

    /// Field visible on this type; `is_static` selects the static table.
    pub fn find_field(&self, name: &str, is_static: bool) -> Option<FieldDescriptor> {
        let mut result = None;
        self.walk(&mut FxHashSet::default(), &mut |p| {
            result = p
                .members()
                .and_then(|m| {
                    if is_static {
                        m.static_field(name)
                    } else {
                        m.instance_field(name)
                    }
                })
                .cloned();
            result.is_some()
        });
        result
    }

    /// Depth-first walk over self, superclasses, then interfaces. Stops when
    /// `visit` returns true. Interface graphs may be cyclic, hence `seen`.
    fn walk(&self, seen: &mut FxHashSet<TypeHash>, visit: &mut dyn FnMut(&ProxyType) -> bool) -> bool {
        if !seen.insert(self.type_hash()) {
            return false;
        }
        if visit(self) {
            return true;
        }
        if let Some(sup) = self.super_proxy() {
            if sup.walk(seen, visit) {
                return true;
            }
        }
        self.interfaces().iter().any(|i| i.walk(seen, visit))
    }
}

// Interface graphs may be cyclic, so Debug doesn't recurse into supertypes.
impl fmt::Debug for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyType")
            .field("name", &self.native.full_name)
            .field("kind", &self.kind)
            .field("finished", &self.is_finished())
            .finish()
    }
}
