//! crossbind - binds native types into a dynamically-typed managed runtime.
//!
//! Managed code reaches native types by dotted name through the namespace tree,
//! gets a proxy type built on first use, and calls native members through
//! overload resolution and value conversion.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use crossbind::{Engine, EngineConfig, ManagedValue};
//!
//! let engine = Engine::with_config(provider, runtime, EngineConfig::from_env()?);
//! let list = engine.proxy_type("util.ArrayList")?;
//! let instance = engine.construct(&list, &[])?;
//! engine.call_method(&instance, "add", &[ManagedValue::Int(1)])?;
//! ```
//!
//! # Crates
//!
//! - `crossbind-core`: data model, collaborator traits, error taxonomy
//! - `crossbind-dispatch`: value conversion and overload resolution
//! - `crossbind-registry`: proxy types, namespace tree, identity cache

pub mod config;
mod engine;
mod error;
pub mod logging;

pub use config::{ConfigError, EngineConfig};
pub use engine::Engine;
pub use error::{EngineError, Result};

pub use crossbind_core::{
    ArgumentError, BindingError, Callable, CallableGroup, ConversionError, FieldDescriptor,
    InterfaceAdapter, ManagedHandle, ManagedObject, ManagedProc, ManagedRuntime, ManagedString,
    ManagedValue, NamespaceError, NativeArray, NativeMembers, NativeObject, NativeType,
    NativeValue, PrimitiveKind, ProviderError, ProxyInstance, ReflectionProvider,
    ResolutionError, RuntimeTypeHandle, TypeDefinition, TypeHash, TypeSig,
};
pub use crossbind_dispatch::{Converter, ConverterKey};
pub use crossbind_registry::{
    NamespaceNode, ProxyKind, ProxyType, Resolution, SubclassGenerator, SubclassPlan,
};
