//! ProxyRegistry - lazily builds and caches one proxy type per native type.
//!
//! # Binding sessions
//!
//! Building a proxy type recursively builds its superclass and interfaces. All
//! proxies created during one outermost [`ProxyRegistry::get_or_create`] call form
//! a *binding session*: they are published together once the outermost build
//! succeeds, or discarded together when any part of it fails.
//!
//! # Concurrency
//!
//! While a type is being built, an `UnfinishedBinding` records the owning
//! thread and the in-progress shell. The owning thread gets the shell back on
//! re-entry, which is what lets self-referential interface graphs bind. Other
//! threads wait on the registry's condition variable until the session is
//! published or abandoned, so they only ever see finished proxies.
//!
//! Two threads can start from opposite ends of a mutually-referencing
//! interface graph, each needing a type the other holds. Waiting threads are
//! recorded, and a thread about to close a wait-for cycle backs off instead:
//! it abandons its session, waits for the contested type to settle, and
//! retries. The provider may see repeated loads and the runtime repeated
//! definitions for the abandoned half.

use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use crossbind_core::{
    BindingError, ManagedRuntime, NativeType, NativeValue, PrimitiveKind, ROOT_OBJECT,
    ReflectionProvider, RuntimeTypeHandle, TypeDefinition, TypeHash, TypeSig,
};
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::binder::bind_members;
use crate::hierarchy::{SuperEdge, TypeGraph};
use crate::proxy_type::{MemberTable, ProxyKind, ProxySuper, ProxyType, RootKind};

/// Notified after a binding session is published.
pub trait BindingObserver: Send + Sync {
    fn published(&self, proxy: &Arc<ProxyType>);
}

/// Names of the shared root types defined in the managed runtime.
pub const PROXY_BASE: &str = "NativeProxy";
pub const CONCRETE_PROXY: &str = "ConcreteNativeProxy";
pub const ARRAY_PROXY: &str = "ArrayNativeProxy";

struct UnfinishedBinding {
    owner: ThreadId,
    proxy: Arc<ProxyType>,
}

/// In-progress bindings and the threads blocked on them.
#[derive(Default)]
struct BuildState {
    unfinished: FxHashMap<TypeHash, UnfinishedBinding>,
    waiting: FxHashMap<ThreadId, TypeHash>,
}

impl BuildState {
    /// Whether `me` waiting on `hash` would close a cycle of waiting threads.
    fn would_deadlock(&self, mut hash: TypeHash, me: ThreadId) -> bool {
        for _ in 0..=self.waiting.len() {
            let Some(owner) = self.unfinished.get(&hash).map(|u| u.owner) else {
                return false;
            };
            if owner == me {
                return true;
            }
            match self.waiting.get(&owner) {
                Some(&next) => hash = next,
                None => return false,
            }
        }
        false
    }
}

enum BindFailure {
    Binding(BindingError),
    /// Waiting on the contested type would close a wait-for cycle.
    Conflict(TypeHash),
}

impl From<BindingError> for BindFailure {
    fn from(err: BindingError) -> Self {
        BindFailure::Binding(err)
    }
}

/// Proxies created by one outermost `get_or_create`, in creation order.
#[derive(Default)]
struct Session {
    built: Vec<Arc<ProxyType>>,
}

#[derive(Debug, Clone, Copy)]
struct RootTypes {
    concrete: RuntimeTypeHandle,
    array: RuntimeTypeHandle,
}

/// Engine-scoped cache of proxy types.
pub struct ProxyRegistry {
    provider: Arc<dyn ReflectionProvider>,
    runtime: Arc<dyn ManagedRuntime>,
    hierarchy: Arc<TypeGraph>,
    initialize_types: bool,
    roots: RootTypes,
    finished: DashMap<TypeHash, Arc<ProxyType>>,
    building: Mutex<BuildState>,
    published: Condvar,
    observer: RwLock<Option<Weak<dyn BindingObserver>>>,
}

impl ProxyRegistry {
    /// Create a registry, defining the shared root proxy types in `runtime`.
    pub fn new(provider: Arc<dyn ReflectionProvider>, runtime: Arc<dyn ManagedRuntime>) -> Self {
        let base = runtime.define_type(&TypeDefinition::class(PROXY_BASE, None));
        let concrete = runtime.define_type(&TypeDefinition::class(CONCRETE_PROXY, Some(base)));
        let mut array = TypeDefinition::class(ARRAY_PROXY, Some(base));
        array.sealed = true;
        let array = runtime.define_type(&array);

        Self {
            provider,
            runtime,
            hierarchy: Arc::new(TypeGraph::new()),
            initialize_types: true,
            roots: RootTypes { concrete, array },
            finished: DashMap::new(),
            building: Mutex::new(BuildState::default()),
            published: Condvar::new(),
            observer: RwLock::new(None),
        }
    }

    /// Whether loading a type also runs its static initialization.
    pub fn with_initialize_types(mut self, initialize: bool) -> Self {
        self.initialize_types = initialize;
        self
    }

    pub fn set_observer(&self, observer: Weak<dyn BindingObserver>) {
        *self.observer.write() = Some(observer);
    }

    pub fn provider(&self) -> &Arc<dyn ReflectionProvider> {
        &self.provider
    }

    pub fn runtime(&self) -> &Arc<dyn ManagedRuntime> {
        &self.runtime
    }

    pub fn hierarchy(&self) -> &Arc<TypeGraph> {
        &self.hierarchy
    }

    /// Runtime handle of a shared root type.
    pub fn root_type(&self, kind: RootKind) -> RuntimeTypeHandle {
        match kind {
            RootKind::Concrete => self.roots.concrete,
            RootKind::Array => self.roots.array,
        }
    }

    /// Finished proxy for `hash`, if one has been published.
    pub fn lookup(&self, hash: TypeHash) -> Option<Arc<ProxyType>> {
        self.finished.get(&hash).map(|p| Arc::clone(p.value()))
    }

    /// Number of published proxy types.
    pub fn len(&self) -> usize {
        self.finished.len()
    }

    pub fn is_empty(&self) -> bool {
        self.finished.is_empty()
    }

    // ==========================================================================
    // Entry points
    // ==========================================================================

    /// Proxy for `native`, building and publishing it on first use.
    pub fn get_or_create(&self, native: &Arc<NativeType>) -> Result<Arc<ProxyType>, BindingError> {
        loop {
            if let Some(proxy) = self.lookup(native.type_hash) {
                return Ok(proxy);
            }

            let mut session = Session::default();
            match self.bind(native, &mut session) {
                Ok(proxy) => {
                    self.publish(session);
                    return Ok(proxy);
                }
                Err(BindFailure::Binding(err)) => {
                    self.abandon(session, &err.to_string());
                    return Err(err);
                }
                Err(BindFailure::Conflict(contested)) => {
                    self.abandon(session, "wait-for cycle");
                    self.wait_until_settled(contested);
                }
            }
        }
    }

    fn wait_until_settled(&self, hash: TypeHash) {
        let mut building = self.building.lock();
        while building.unfinished.contains_key(&hash) {
            self.published.wait(&mut building);
        }
    }

    /// Load `name` through the provider and return its proxy. Primitive names
    /// bind without consulting the provider.
    pub fn get_or_create_by_name(&self, name: &str) -> Result<Arc<ProxyType>, BindingError> {
        if let Some(kind) = PrimitiveKind::from_name(name) {
            return self.primitive(kind);
        }
        if let Some(proxy) = self.lookup(TypeHash::from_name(name)) {
            return Ok(proxy);
        }
        let native = self.load(name, "load")?;
        self.get_or_create(&native)
    }

    pub fn primitive(&self, kind: PrimitiveKind) -> Result<Arc<ProxyType>, BindingError> {
        self.get_or_create(&Arc::new(NativeType::primitive(kind)))
    }

    pub fn array_of(&self, component: TypeSig) -> Result<Arc<ProxyType>, BindingError> {
        self.get_or_create(&Arc::new(NativeType::array(component)))
    }

    // ==========================================================================
    // Binding
    // ==========================================================================

    fn load(&self, name: &str, operation: &'static str) -> Result<Arc<NativeType>, BindingError> {
        self.provider
            .load_type(name, self.initialize_types)
            .map_err(|err| BindingError::from_provider(err, name, operation))
    }

    fn bind_named(
        &self,
        name: &str,
        operation: &'static str,
        session: &mut Session,
    ) -> Result<Arc<ProxyType>, BindFailure> {
        if let Some(proxy) = self.lookup(TypeHash::from_name(name)) {
            return Ok(proxy);
        }
        let native = self.load(name, operation)?;
        self.bind(&native, session)
    }

    /// Claim `native` for this thread and build it, or return the existing proxy.
    fn bind(&self, native: &Arc<NativeType>, session: &mut Session) -> Result<Arc<ProxyType>, BindFailure> {
        let hash = native.type_hash;
        let me = thread::current().id();

        let shell = {
            let mut building = self.building.lock();
            loop {
                if let Some(proxy) = self.lookup(hash) {
                    return Ok(proxy);
                }
                let owned_by_me = building.unfinished.get(&hash).map(|u| u.owner == me);
                match owned_by_me {
                    Some(true) => {
                        trace!(type_name = %native.full_name, "re-entered unfinished binding");
                        return Ok(Arc::clone(&building.unfinished[&hash].proxy));
                    }
                    Some(false) => {
                        if building.would_deadlock(hash, me) {
                            debug!(type_name = %native.full_name, "backing off from wait-for cycle");
                            return Err(BindFailure::Conflict(hash));
                        }
                        building.waiting.insert(me, hash);
                        self.published.wait(&mut building);
                        building.waiting.remove(&me);
                    }
                    None => {
                        let shell = Arc::new(ProxyType::shell(Arc::clone(native)));
                        building.unfinished.insert(
                            hash,
                            UnfinishedBinding {
                                owner: me,
                                proxy: Arc::clone(&shell),
                            },
                        );
                        break shell;
                    }
                }
            }
        };

        session.built.push(Arc::clone(&shell));
        self.build(&shell, session)?;
        Ok(shell)
    }

    fn build(&self, proxy: &Arc<ProxyType>, session: &mut Session) -> Result<(), BindFailure> {
        let native = proxy.native();
        let name = native.full_name.as_str();
        let hash = native.type_hash;
        self.hierarchy.add_type(hash);

        let superclass = match proxy.kind() {
            ProxyKind::Interface => ProxySuper::Module,
            ProxyKind::Primitive => ProxySuper::Root(RootKind::Concrete),
            ProxyKind::Array => {
                self.hierarchy
                    .add_edge(hash, TypeHash::from_name(ROOT_OBJECT), SuperEdge::Superclass);
                ProxySuper::Root(RootKind::Array)
            }
            ProxyKind::Class => match &native.superclass {
                None => ProxySuper::Root(RootKind::Concrete),
                Some(super_name) => {
                    let parent = self.bind_named(super_name, "superclass", session)?;
                    if !parent.is_complete() {
                        return Err(BindingError::LinkError {
                            type_name: name.to_string(),
                            operation: "superclass",
                            detail: format!("circular superclass chain through '{}'", super_name),
                        }
                        .into());
                    }
                    self.hierarchy
                        .add_edge(hash, parent.type_hash(), SuperEdge::Superclass);
                    ProxySuper::Proxy(parent)
                }
            },
        };
        proxy.set_superclass(superclass);

        let mut interfaces = Vec::with_capacity(native.interfaces.len());
        for iface_name in &native.interfaces {
            let iface = self.bind_named(iface_name, "interface", session)?;
            self.hierarchy
                .add_edge(hash, iface.type_hash(), SuperEdge::Interface);
            interfaces.push(iface);
        }
        proxy.set_interfaces(interfaces);

        let members = match proxy.kind() {
            ProxyKind::Array | ProxyKind::Primitive => MemberTable::empty(),
            ProxyKind::Class | ProxyKind::Interface => {
                let reflected = self
                    .provider
                    .members_of(native)
                    .map_err(|err| BindingError::from_provider(err, name, "members"))?;
                // Interfaces still building in this session are skipped here;
                // `find_method` reaches them through the include chain.
                let supers: Vec<&MemberTable> = proxy
                    .super_proxy()
                    .into_iter()
                    .chain(proxy.interfaces())
                    .filter_map(|p| p.members())
                    .collect();
                bind_members(native, reflected, &supers)
            }
        };

        let definition = self.definition_for(proxy, &members);
        let handle = self.runtime.define_type(&definition);
        proxy.set_members(members);
        proxy.set_runtime_type(handle);

        trace!(type_name = name, kind = ?proxy.kind(), "built proxy type");
        Ok(())
    }

    fn definition_for(&self, proxy: &ProxyType, members: &MemberTable) -> TypeDefinition {
        let name = proxy.name();
        let mut definition = match proxy.superclass() {
            Some(ProxySuper::Module) | None => TypeDefinition::module(name),
            Some(ProxySuper::Root(kind)) => TypeDefinition::class(name, Some(self.root_type(*kind))),
            Some(ProxySuper::Proxy(parent)) => TypeDefinition::class(name, parent.runtime_type()),
        };
        // Interfaces still under construction on this thread have no handle yet.
        definition.includes = proxy
            .interfaces()
            .iter()
            .filter_map(|i| i.runtime_type())
            .collect();
        definition.members = members.managed_names();
        definition.sealed = !proxy.is_extensible();
        definition.constants = self.read_constants(name, members);
        definition
    }

    /// Values of constant fields. An unreadable one is left as a plain static reader.
    fn read_constants(&self, type_name: &str, members: &MemberTable) -> Vec<(String, NativeValue)> {
        let mut constants: Vec<(String, NativeValue)> = members
            .static_fields
            .values()
            .filter(|field| field.is_constant())
            .filter_map(|field| match self.provider.get_field(field, None) {
                Ok(value) => Some((field.name.clone(), value)),
                Err(err) => {
                    debug!(type_name, field = %field.name, error = %err, "constant not readable");
                    None
                }
            })
            .collect();
        constants.sort_by(|a, b| a.0.cmp(&b.0));
        constants
    }

    // ==========================================================================
    // Session completion
    // ==========================================================================

    fn publish(&self, session: Session) {
        {
            let mut building = self.building.lock();
            for proxy in &session.built {
                proxy.mark_finished();
                self.finished.insert(proxy.type_hash(), Arc::clone(proxy));
            }
            for proxy in &session.built {
                building.unfinished.remove(&proxy.type_hash());
            }
        }
        self.published.notify_all();

        debug!(
            count = session.built.len(),
            root = session.built.first().map(|p| p.name()).unwrap_or_default(),
            "published binding session"
        );

        let observer = self.observer.read().as_ref().and_then(Weak::upgrade);
        if let Some(observer) = observer {
            for proxy in &session.built {
                observer.published(proxy);
            }
        }
    }

    fn abandon(&self, session: Session, reason: &str) {
        {
            let mut building = self.building.lock();
            for proxy in &session.built {
                building.unfinished.remove(&proxy.type_hash());
            }
        }
        self.published.notify_all();
        debug!(
            count = session.built.len(),
            reason,
            "abandoned binding session"
        );
    }
}

impl std::fmt::Debug for ProxyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyRegistry")
            .field("types", &self.finished.len())
            .field("initialize_types", &self.initialize_types)
            .finish()
    }
}
