//! In-memory reflection provider and managed runtime for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crossbind_core::{
    Callable, FieldDescriptor, ManagedHandle, ManagedRuntime, NativeMembers, NativeObject,
    NativeType, NativeValue, ProviderError, ReflectionProvider, RuntimeTypeHandle,
    TypeDefinition,
};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

#[derive(Default)]
pub(crate) struct MapProvider {
    types: RwLock<FxHashMap<String, (Arc<NativeType>, NativeMembers)>>,
    loads: AtomicUsize,
    delay: Option<Duration>,
}

impl MapProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_type(self, ty: NativeType) -> Self {
        self.add(ty, NativeMembers::new());
        self
    }

    pub fn with_members(self, ty: NativeType, members: NativeMembers) -> Self {
        self.add(ty, members);
        self
    }

    pub fn add(&self, ty: NativeType, members: NativeMembers) {
        self.types
            .write()
            .insert(ty.full_name.clone(), (Arc::new(ty), members));
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ReflectionProvider for MapProvider {
    fn load_type(&self, name: &str, _initialize: bool) -> Result<Arc<NativeType>, ProviderError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
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
        _receiver: Option<&NativeObject>,
        _args: &[NativeValue],
    ) -> Result<NativeValue, ProviderError> {
        Err(ProviderError::Invocation {
            member: callable.name.clone(),
            detail: "not supported".to_string(),
        })
    }

    fn construct(&self, callable: &Callable, _args: &[NativeValue]) -> Result<NativeObject, ProviderError> {
        Err(ProviderError::Invocation {
            member: callable.name.clone(),
            detail: "not supported".to_string(),
        })
    }

    fn get_field(
        &self,
        _field: &FieldDescriptor,
        _receiver: Option<&NativeObject>,
    ) -> Result<NativeValue, ProviderError> {
        Ok(NativeValue::Null)
    }

    fn set_field(
        &self,
        _field: &FieldDescriptor,
        _receiver: Option<&NativeObject>,
        _value: NativeValue,
    ) -> Result<(), ProviderError> {
        Ok(())
    }

    fn package_exists(&self, name: &str) -> bool {
        let prefix = format!("{}.", name);
        self.types.read().keys().any(|k| k.starts_with(&prefix))
    }
}

#[derive(Default)]
pub(crate) struct RecordingRuntime {
    next: AtomicU64,
    pub definitions: Mutex<Vec<TypeDefinition>>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn definitions_named(&self, name: &str) -> usize {
        self.definitions
            .lock()
            .iter()
            .filter(|d| d.name == name)
            .count()
    }

    pub fn definition(&self, name: &str) -> Option<TypeDefinition> {
        self.definitions.lock().iter().find(|d| d.name == name).cloned()
    }
}

impl ManagedRuntime for RecordingRuntime {
    fn define_type(&self, definition: &TypeDefinition) -> RuntimeTypeHandle {
        self.definitions.lock().push(definition.clone());
        RuntimeTypeHandle(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn allocate_instance(&self, _ty: RuntimeTypeHandle) -> ManagedHandle {
        ManagedHandle(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
