//! In-memory native platform and managed runtime shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crossbind::{
    Callable, Engine, EngineConfig, FieldDescriptor, ManagedHandle, ManagedRuntime, NativeMembers,
    NativeObject, NativeType, NativeValue, ProviderError, ReflectionProvider, RuntimeTypeHandle,
    TypeDefinition, TypeHash,
};
use crossbind_core::ROOT_OBJECT;
use parking_lot::{Mutex, RwLock};

pub type Handler =
    Arc<dyn Fn(Option<&NativeObject>, &[NativeValue]) -> Result<NativeValue, ProviderError> + Send + Sync>;

/// Reflection provider backed by maps, with per-callable handlers.
#[derive(Default)]
pub struct FakePlatform {
    types: RwLock<HashMap<String, (Arc<NativeType>, NativeMembers)>>,
    handlers: RwLock<HashMap<TypeHash, Handler>>,
    fields: Mutex<HashMap<(usize, String), NativeValue>>,
    denied: RwLock<HashSet<String>>,
    loads: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        let platform = Self::default();
        platform.define(NativeType::class(ROOT_OBJECT), NativeMembers::new());
        platform
    }

    pub fn define(&self, ty: NativeType, members: NativeMembers) {
        self.types
            .write()
            .insert(ty.full_name.clone(), (Arc::new(ty), members));
    }

    /// Run `handler` whenever `callable` is invoked or constructed.
    pub fn on<F>(&self, callable: &Callable, handler: F)
    where
        F: Fn(Option<&NativeObject>, &[NativeValue]) -> Result<NativeValue, ProviderError> + Send + Sync + 'static,
    {
        self.handlers.write().insert(callable.id, Arc::new(handler));
    }

    /// Seed the value of a static field.
    pub fn set_static(&self, name: &str, value: NativeValue) {
        self.fields.lock().insert((0, name.to_string()), value);
    }

    pub fn deny(&self, name: &str) {
        self.denied.write().insert(name.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn native(&self, name: &str) -> Arc<NativeType> {
        Arc::clone(&self.types.read()[name].0)
    }

    fn handler(&self, callable: &Callable) -> Result<Handler, ProviderError> {
        self.handlers
            .read()
            .get(&callable.id)
            .cloned()
            .ok_or_else(|| ProviderError::Invocation {
                member: callable.signature(),
                detail: "no handler".to_string(),
            })
    }
}

impl ReflectionProvider for FakePlatform {
    fn load_type(&self, name: &str, _initialize: bool) -> Result<Arc<NativeType>, ProviderError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = *self.delay.lock() {
            std::thread::sleep(delay);
        }
        if self.denied.read().contains(name) {
            return Err(ProviderError::Denied {
                name: name.to_string(),
            });
        }
        self.types
            .read()
            .get(name)
            .map(|(ty, _)| Arc::clone(ty))
            .ok_or_else(|| ProviderError::NotFound {
                name: name.to_string(),
            })
    }

    fn members_of(&self, ty: &NativeType) -> Result<NativeMembers, ProviderError> {
        Ok(self
            .types
            .read()
            .get(&ty.full_name)
            .map(|(_, members)| members.clone())
            .unwrap_or_default())
    }

    fn invoke(
        &self,
        callable: &Callable,
        receiver: Option<&NativeObject>,
        args: &[NativeValue],
    ) -> Result<NativeValue, ProviderError> {
        let handler = self.handler(callable)?;
        handler(receiver, args)
    }

    fn construct(&self, callable: &Callable, args: &[NativeValue]) -> Result<NativeObject, ProviderError> {
        if let Ok(handler) = self.handler(callable) {
            return match handler(None, args)? {
                NativeValue::Object(object) => Ok(object),
                other => Err(ProviderError::Invocation {
                    member: callable.signature(),
                    detail: format!("constructor returned {}", other.type_name()),
                }),
            };
        }
        let ty = self.load_type(&callable.declaring_type, true)?;
        Ok(NativeObject::new(ty, args.to_vec()))
    }

    fn get_field(
        &self,
        field: &FieldDescriptor,
        receiver: Option<&NativeObject>,
    ) -> Result<NativeValue, ProviderError> {
        let key = (receiver.map_or(0, NativeObject::identity), field.name.clone());
        Ok(self.fields.lock().get(&key).cloned().unwrap_or(NativeValue::Null))
    }

    fn set_field(
        &self,
        field: &FieldDescriptor,
        receiver: Option<&NativeObject>,
        value: NativeValue,
    ) -> Result<(), ProviderError> {
        let key = (receiver.map_or(0, NativeObject::identity), field.name.clone());
        self.fields.lock().insert(key, value);
        Ok(())
    }

    fn package_exists(&self, name: &str) -> bool {
        let prefix = format!("{}.", name);
        self.types.read().keys().any(|k| k.starts_with(&prefix))
    }
}

/// Managed runtime that records every type definition.
#[derive(Default)]
pub struct FakeRuntime {
    next: AtomicU64,
    definitions: Mutex<Vec<TypeDefinition>>,
    allocations: AtomicUsize,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn definitions_named(&self, name: &str) -> usize {
        self.definitions.lock().iter().filter(|d| d.name == name).count()
    }

    pub fn definition(&self, name: &str) -> Option<TypeDefinition> {
        self.definitions.lock().iter().find(|d| d.name == name).cloned()
    }

    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }
}

impl ManagedRuntime for FakeRuntime {
    fn define_type(&self, definition: &TypeDefinition) -> RuntimeTypeHandle {
        self.definitions.lock().push(definition.clone());
        RuntimeTypeHandle(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn allocate_instance(&self, _ty: RuntimeTypeHandle) -> ManagedHandle {
        self.allocations.fetch_add(1, Ordering::SeqCst);
        ManagedHandle(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

pub struct Fixture {
    pub platform: Arc<FakePlatform>,
    pub runtime: Arc<FakeRuntime>,
    pub engine: Engine,
}

pub fn fixture(platform: FakePlatform) -> Fixture {
    fixture_with(platform, EngineConfig::default())
}

pub fn fixture_with(platform: FakePlatform, config: EngineConfig) -> Fixture {
    let platform = Arc::new(platform);
    let runtime = Arc::new(FakeRuntime::new());
    let engine = Engine::with_config(platform.clone(), runtime.clone(), config);
    Fixture {
        platform,
        runtime,
        engine,
    }
}
