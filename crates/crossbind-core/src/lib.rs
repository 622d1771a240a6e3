//! Core data model for crossbind.
//!
//! This crate defines the types shared by the dispatch and registry crates:
//! native type descriptors, callables, values on both sides of the boundary,
//! the collaborator traits, and the error taxonomy.

mod callable;
mod error;
mod native_type;
mod primitive_kind;
mod provider;
mod qualified_name;
mod type_hash;
mod value;

pub use callable::{Callable, CallableGroup, CallableKind, FieldDescriptor, NativeMembers};
pub use error::{ArgumentError, BindingError, ConversionError, NamespaceError, ProviderError, ResolutionError};
pub use native_type::{BASE_PACKAGE, Modifiers, NativeType, ROOT_OBJECT, STRING_TYPE, TypeSig};
pub use primitive_kind::PrimitiveKind;
pub use provider::{
    DefinitionKind, IdentityHierarchy, InterfaceAdapter, ManagedRuntime, ReflectionProvider,
    TypeDefinition, TypeHierarchy,
};
pub use qualified_name::QualifiedName;
pub use type_hash::{TypeHash, hash_constants};
pub use value::{
    ManagedHandle, ManagedObject, ManagedProc, ManagedString, ManagedValue, NativeArray,
    NativeObject, NativeValue, ProxyCell, ProxyInstance, RuntimeTypeHandle, WeakNativeObject,
    WeakProxyInstance,
};
