//! The binding engine facade.
//!
//! An [`Engine`] owns every cache for one managed runtime: the proxy registry,
//! the namespace tree, the identity cache, and the value converter. Nothing is
//! process-wide, so several engines can coexist.

use std::sync::Arc;

use crossbind_core::{
    ArgumentError, Callable, FieldDescriptor, InterfaceAdapter, ManagedRuntime, ManagedValue, NativeArray,
    NativeObject, NativeValue, ProviderError, ProxyInstance, ReflectionProvider, TypeHierarchy,
    TypeSig,
};
use crossbind_dispatch::{
    ConvertContext, Converter, ConverterKey, OverloadSet, ResolveContext, ValueConverter,
    marshal::{array_get, array_set},
    marshal_arguments,
};
use crossbind_registry::{
    CacheMode, NamespaceTree, ObjectProxyCache, ProxyRegistry, ProxyType, Resolution, RootKind,
    SubclassGenerator, SubclassPlan,
};
use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// Binding and dispatch engine for one managed runtime.
pub struct Engine {
    config: EngineConfig,
    registry: Arc<ProxyRegistry>,
    namespaces: Arc<NamespaceTree>,
    identity: ObjectProxyCache,
    converter: ValueConverter,
    adapter: Option<Arc<dyn InterfaceAdapter>>,
}

impl Engine {
    pub fn new(provider: Arc<dyn ReflectionProvider>, runtime: Arc<dyn ManagedRuntime>) -> Self {
        Self::with_config(provider, runtime, EngineConfig::default())
    }

    pub fn with_config(
        provider: Arc<dyn ReflectionProvider>,
        runtime: Arc<dyn ManagedRuntime>,
        config: EngineConfig,
    ) -> Self {
        let registry = Arc::new(
            ProxyRegistry::new(provider, runtime).with_initialize_types(config.initialize_types),
        );
        let namespaces = NamespaceTree::new(Arc::clone(&registry), config.allow_uppercase_packages);
        debug!(?config, "created engine");
        Self {
            config,
            registry,
            namespaces,
            identity: ObjectProxyCache::new(),
            converter: ValueConverter::new().with_default_encoding(config.default_encoding),
            adapter: None,
        }
    }

    /// Adapt managed callables and objects to native interfaces with `adapter`.
    pub fn with_adapter(mut self, adapter: Arc<dyn InterfaceAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Replace the converter used for values of one shape.
    pub fn with_converter(mut self, key: ConverterKey, converter: Arc<dyn Converter>) -> Self {
        self.converter.register(key, converter);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ProxyRegistry> {
        &self.registry
    }

    pub fn namespaces(&self) -> &Arc<NamespaceTree> {
        &self.namespaces
    }

    pub fn identity_cache(&self) -> &ObjectProxyCache {
        &self.identity
    }

    fn provider(&self) -> &dyn ReflectionProvider {
        self.registry.provider().as_ref()
    }

    fn hierarchy(&self) -> &dyn TypeHierarchy {
        self.registry.hierarchy().as_ref()
    }

    fn resolve_context(&self) -> ResolveContext<'_> {
        ResolveContext::new(self.hierarchy()).with_duck_typing(self.adapter.is_some())
    }

    fn convert_context(&self) -> ConvertContext<'_> {
        ConvertContext::new(&self.converter, self.hierarchy()).with_adapter(self.adapter.as_deref())
    }

    // ==========================================================================
    // Types and names
    // ==========================================================================

    /// Proxy type for a dotted native type name.
    pub fn proxy_type(&self, name: &str) -> Result<Arc<ProxyType>> {
        Ok(self.registry.get_or_create_by_name(name)?)
    }

    /// Resolve a dotted path through the namespace tree.
    pub fn resolve_path(&self, path: &str) -> Result<Resolution> {
        Ok(self.namespaces.resolve(path)?)
    }

    fn proxy_for(&self, instance: &ProxyInstance) -> Result<Arc<ProxyType>> {
        match self.registry.lookup(instance.type_hash()) {
            Some(proxy) => Ok(proxy),
            None => Ok(self.registry.get_or_create(instance.object().native_type())?),
        }
    }

    // ==========================================================================
    // Values
    // ==========================================================================

    /// Wrap a native object in a proxy instance.
    ///
    /// The identity cache is used when `force_cache` is set, when the type asks
    /// for it, or when the engine-wide policy is on.
    pub fn wrap(&self, object: &NativeObject, force_cache: bool) -> Result<ProxyInstance> {
        let proxy = self.registry.get_or_create(object.native_type())?;
        let mode = if force_cache || proxy.caches_instances() {
            CacheMode::Atomic
        } else if self.config.object_proxy_cache {
            CacheMode::Relaxed
        } else {
            CacheMode::Bypass
        };

        let runtime_type = proxy
            .runtime_type()
            .unwrap_or_else(|| self.registry.root_type(RootKind::Concrete));
        let runtime = self.registry.runtime();
        Ok(self.identity.wrap_with(object, mode, || {
            trace!(type_name = proxy.name(), ?mode, "allocating proxy instance");
            ProxyInstance::new(proxy.type_hash(), runtime.allocate_instance(runtime_type), object.clone())
        }))
    }

    /// Convert a native value for the managed runtime. Objects are wrapped.
    pub fn to_managed(&self, value: &NativeValue) -> Result<ManagedValue> {
        match value {
            NativeValue::Object(object) => Ok(ManagedValue::Proxy(self.wrap(object, false)?)),
            other => Ok(self.converter.to_managed(other, &self.convert_context())),
        }
    }

    /// Convert a managed value to the native `target` type.
    pub fn to_native(&self, value: &ManagedValue, target: &TypeSig) -> Result<NativeValue> {
        Ok(self.converter.to_native(value, target, &self.convert_context())?)
    }

    pub fn array_get(&self, array: &NativeArray, index: i64) -> Result<ManagedValue> {
        match array_get(array, index, &self.convert_context())? {
            ManagedValue::Opaque(NativeValue::Object(object)) => {
                Ok(ManagedValue::Proxy(self.wrap(&object, false)?))
            }
            other => Ok(other),
        }
    }

    pub fn array_set(&self, array: &NativeArray, index: i64, value: &ManagedValue) -> Result<()> {
        Ok(array_set(array, index, value, &self.convert_context())?)
    }

    // ==========================================================================
    // Calls
    // ==========================================================================

    /// Call an instance method by native name or managed alias.
    pub fn call_method(&self, receiver: &ProxyInstance, name: &str, args: &[ManagedValue]) -> Result<ManagedValue> {
        let proxy = self.proxy_for(receiver)?;
        let set = proxy
            .find_method(name)
            .ok_or_else(|| EngineError::unknown_member(proxy.name(), name, "method"))?;
        self.dispatch(&proxy, &set, Some(receiver.object()), args)
    }

    /// Call a static method by native name or managed alias.
    pub fn call_static(&self, ty: &Arc<ProxyType>, name: &str, args: &[ManagedValue]) -> Result<ManagedValue> {
        let set = ty
            .find_static_method(name)
            .ok_or_else(|| EngineError::unknown_member(ty.name(), name, "static method"))?;
        self.dispatch(ty, &set, None, args)
    }

    /// Construct a native instance and wrap it.
    pub fn construct(&self, ty: &Arc<ProxyType>, args: &[ManagedValue]) -> Result<ProxyInstance> {
        let set = ty
            .members()
            .and_then(|m| m.constructors())
            .ok_or_else(|| EngineError::unknown_member(ty.name(), "new", "constructor"))?;
        let callable = set.resolve(args, self.resolve_context())?;
        let native_args = marshal_arguments(&callable, args, &self.convert_context())
            .map_err(|err| EngineError::argument(ty.name(), "new", "construct", err))?;
        let object = self
            .provider()
            .construct(&callable, &native_args)
            .map_err(|err| invocation_error(ty, &callable.signature(), err))?;
        debug!(type_name = ty.name(), arity = args.len(), "constructed instance");
        self.wrap(&object, ty.caches_instances())
    }

    fn dispatch(
        &self,
        ty: &ProxyType,
        set: &OverloadSet,
        receiver: Option<&NativeObject>,
        args: &[ManagedValue],
    ) -> Result<ManagedValue> {
        let callable = set.resolve(args, self.resolve_context())?;
        let native_args = marshal_arguments(&callable, args, &self.convert_context())
            .map_err(|err| EngineError::argument(ty.name(), &callable.name, "call", err))?;
        trace!(
            type_name = ty.name(),
            member = %callable.name,
            arity = args.len(),
            "invoking"
        );
        let result = self
            .provider()
            .invoke(&callable, receiver, &native_args)
            .map_err(|err| invocation_error(ty, &callable.signature(), err))?;
        self.returned(&callable, &result)
    }

    fn returned(&self, callable: &Callable, result: &NativeValue) -> Result<ManagedValue> {
        if callable.return_type == TypeSig::Void {
            return Ok(ManagedValue::Nil);
        }
        self.to_managed(result)
    }

    // ==========================================================================
    // Fields
    // ==========================================================================

    fn field(&self, ty: &ProxyType, name: &str, is_static: bool) -> Result<FieldDescriptor> {
        let kind = if is_static { "static field" } else { "field" };
        ty.find_field(name, is_static)
            .ok_or_else(|| EngineError::unknown_member(ty.name(), name, kind))
    }

    /// Read a field; `receiver` is `None` for static fields.
    pub fn get_field(&self, ty: &Arc<ProxyType>, receiver: Option<&ProxyInstance>, name: &str) -> Result<ManagedValue> {
        let field = self.field(ty, name, receiver.is_none())?;
        let value = self
            .provider()
            .get_field(&field, receiver.map(ProxyInstance::object))
            .map_err(|err| invocation_error(ty, name, err))?;
        self.to_managed(&value)
    }

    /// Write a field; `receiver` is `None` for static fields.
    pub fn set_field(
        &self,
        ty: &Arc<ProxyType>,
        receiver: Option<&ProxyInstance>,
        name: &str,
        value: &ManagedValue,
    ) -> Result<()> {
        let field = self.field(ty, name, receiver.is_none())?;
        if field.is_final {
            return Err(EngineError::FinalField {
                type_name: ty.name().to_string(),
                field: name.to_string(),
            });
        }
        let native = self
            .converter
            .to_native(value, &field.ty, &self.convert_context())
            .map_err(|source| {
                EngineError::argument(ty.name(), name, "assign", ArgumentError { position: 0, source })
            })?;
        self.provider()
            .set_field(&field, receiver.map(ProxyInstance::object), native)
            .map_err(|err| invocation_error(ty, name, err))
    }

    // ==========================================================================
    // Subclassing
    // ==========================================================================

    /// Validate a managed subclass of `parent`.
    pub fn plan_subclass(
        &self,
        parent: &Arc<ProxyType>,
        name: &str,
        overrides: &[&str],
        interfaces: &[Arc<ProxyType>],
    ) -> Result<SubclassPlan> {
        Ok(self.registry.plan_subclass(parent, name, overrides, interfaces)?)
    }

    /// Generate and bind the native type for a validated plan.
    pub fn realize_subclass(&self, plan: &SubclassPlan, generator: &dyn SubclassGenerator) -> Result<Arc<ProxyType>> {
        Ok(self.registry.realize_subclass(plan, generator)?)
    }
}

fn invocation_error(ty: &ProxyType, member: &str, err: ProviderError) -> EngineError {
    match err {
        ProviderError::Invocation { detail, .. } => EngineError::Invocation {
            type_name: ty.name().to_string(),
            member: member.to_string(),
            detail,
        },
        other => EngineError::Invocation {
            type_name: ty.name().to_string(),
            member: member.to_string(),
            detail: other.to_string(),
        },
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("identity", &self.identity)
            .finish()
    }
}
