//! Seams to the collaborators the engine consumes but never implements.
//!
//! - [`ReflectionProvider`]: the native platform's reflection facility.
//! - [`ManagedRuntime`]: the managed runtime's object model.
//! - [`InterfaceAdapter`]: duck-typed adaptation of managed values to native interfaces.
//! - [`TypeHierarchy`]: subtype queries used while ranking overloads.

use std::sync::Arc;

use crate::{
    Callable, FieldDescriptor, ManagedHandle, ManagedValue, NativeMembers, NativeObject,
    NativeType, NativeValue, ProviderError, RuntimeTypeHandle, TypeHash, TypeSig,
};

/// The native platform's reflection facility.
pub trait ReflectionProvider: Send + Sync {
    /// Load a type by dotted name, optionally running its static initialization.
    fn load_type(&self, name: &str, initialize: bool) -> Result<Arc<NativeType>, ProviderError>;

    /// Members declared directly on `ty` (not inherited ones).
    fn members_of(&self, ty: &NativeType) -> Result<NativeMembers, ProviderError>;

    /// Invoke a method. `receiver` is `None` for static methods.
    fn invoke(
        &self,
        callable: &Callable,
        receiver: Option<&NativeObject>,
        args: &[NativeValue],
    ) -> Result<NativeValue, ProviderError>;

    fn construct(&self, callable: &Callable, args: &[NativeValue])
    -> Result<NativeObject, ProviderError>;

    fn get_field(
        &self,
        field: &FieldDescriptor,
        receiver: Option<&NativeObject>,
    ) -> Result<NativeValue, ProviderError>;

    fn set_field(
        &self,
        field: &FieldDescriptor,
        receiver: Option<&NativeObject>,
        value: NativeValue,
    ) -> Result<(), ProviderError>;

    /// Whether a package with the given dotted name exists.
    ///
    /// Platforms that can't enumerate packages keep the default: every
    /// lower-case path is assumed to be a package.
    fn package_exists(&self, _name: &str) -> bool {
        true
    }
}

/// Shape of a runtime type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    /// Instantiable type with a superclass.
    Class,
    /// Mixin-style module (used for interfaces and packages).
    Module,
}

/// Request to define a type in the managed runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    pub name: String,
    pub kind: DefinitionKind,
    pub superclass: Option<RuntimeTypeHandle>,
    /// Modules mixed into the type, in order.
    pub includes: Vec<RuntimeTypeHandle>,
    /// Managed-visible member names, aliases included.
    pub members: Vec<String>,
    /// The runtime should reject managed subclasses.
    pub sealed: bool,
    /// Values of constant fields, sorted by name.
    pub constants: Vec<(String, NativeValue)>,
}

impl TypeDefinition {
    pub fn class(name: impl Into<String>, superclass: Option<RuntimeTypeHandle>) -> Self {
        Self {
            name: name.into(),
            kind: DefinitionKind::Class,
            superclass,
            includes: Vec::new(),
            members: Vec::new(),
            sealed: false,
            constants: Vec::new(),
        }
    }

    pub fn module(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DefinitionKind::Module,
            superclass: None,
            includes: Vec::new(),
            members: Vec::new(),
            sealed: false,
            constants: Vec::new(),
        }
    }
}

/// The managed runtime's object model.
pub trait ManagedRuntime: Send + Sync {
    fn define_type(&self, definition: &TypeDefinition) -> RuntimeTypeHandle;

    fn allocate_instance(&self, ty: RuntimeTypeHandle) -> ManagedHandle;
}

/// Produces native objects implementing an interface by delegating to managed code.
pub trait InterfaceAdapter: Send + Sync {
    fn adapt(&self, value: &ManagedValue, interface: &TypeSig) -> Result<NativeObject, ProviderError>;
}

/// Subtype queries over native types.
pub trait TypeHierarchy: Send + Sync {
    /// Number of supertype edges from `from` to `to`; `Some(0)` when equal.
    fn distance(&self, from: TypeHash, to: TypeHash) -> Option<u32>;

    fn is_assignable(&self, from: TypeHash, to: TypeHash) -> bool {
        self.distance(from, to).is_some()
    }
}

/// Hierarchy that only knows identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityHierarchy;

impl TypeHierarchy for IdentityHierarchy {
    fn distance(&self, from: TypeHash, to: TypeHash) -> Option<u32> {
        (from == to).then_some(0)
    }
}
