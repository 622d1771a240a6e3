//! Native type descriptors and signature types.
//!
//! [`NativeType`] is what the reflection provider hands back for a loaded type.
//! Supertypes are referenced by name rather than by pointer, so self-referential
//! and mutually-referential type graphs are expressible without cycles in memory.
//!
//! [`TypeSig`] is a type as it appears in a parameter, return, field, or array
//! component position.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::{PrimitiveKind, QualifiedName, TypeHash};

/// Package holding the platform's built-in reference types.
pub const BASE_PACKAGE: &str = "lang";

/// Name of the platform's root object type.
pub const ROOT_OBJECT: &str = "lang.Object";

/// Name of the platform's string type.
pub const STRING_TYPE: &str = "lang.String";

bitflags! {
    /// Modifier flags reported by the reflection provider.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const PUBLIC = 1 << 0;
        const FINAL = 1 << 1;
        const ABSTRACT = 1 << 2;
        const INTERFACE = 1 << 3;
        const ARRAY = 1 << 4;
        const PRIMITIVE = 1 << 5;
        const STATIC = 1 << 6;
    }
}

// ============================================================================
// TypeSig
// ============================================================================

/// A type in signature position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSig {
    Void,
    Primitive(PrimitiveKind),
    /// Boxed counterpart of a primitive; accepts null.
    Boxed(PrimitiveKind),
    String,
    Object {
        name: Arc<str>,
        hash: TypeHash,
        interface: bool,
    },
    Array(Box<TypeSig>),
}

impl TypeSig {
    /// A class-typed reference.
    pub fn object(name: &str) -> Self {
        TypeSig::Object {
            name: Arc::from(name),
            hash: TypeHash::from_name(name),
            interface: false,
        }
    }

    /// An interface-typed reference.
    pub fn interface(name: &str) -> Self {
        TypeSig::Object {
            name: Arc::from(name),
            hash: TypeHash::from_name(name),
            interface: true,
        }
    }

    /// The platform root object type.
    pub fn root_object() -> Self {
        Self::object(ROOT_OBJECT)
    }

    pub fn array_of(component: TypeSig) -> Self {
        TypeSig::Array(Box::new(component))
    }

    /// Whether values of this type may be null.
    pub fn is_reference(&self) -> bool {
        !matches!(self, TypeSig::Primitive(_) | TypeSig::Void)
    }

    pub fn is_root_object(&self) -> bool {
        matches!(self, TypeSig::Object { name, .. } if &**name == ROOT_OBJECT)
    }

    pub fn is_interface(&self) -> bool {
        matches!(self, TypeSig::Object { interface: true, .. })
    }

    /// Element type for arrays.
    pub fn component(&self) -> Option<&TypeSig> {
        match self {
            TypeSig::Array(inner) => Some(inner),
            _ => None,
        }
    }

    /// Dotted name of the type.
    pub fn name(&self) -> String {
        match self {
            TypeSig::Void => "void".to_string(),
            TypeSig::Primitive(kind) => kind.name().to_string(),
            TypeSig::Boxed(kind) => format!("{}.{}", BASE_PACKAGE, kind.boxed_name()),
            TypeSig::String => STRING_TYPE.to_string(),
            TypeSig::Object { name, .. } => name.to_string(),
            TypeSig::Array(inner) => format!("{}[]", inner.name()),
        }
    }

    pub fn type_hash(&self) -> TypeHash {
        match self {
            TypeSig::Object { hash, .. } => *hash,
            other => TypeHash::from_name(&other.name()),
        }
    }
}

impl fmt::Display for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// NativeType
// ============================================================================

/// Descriptor of a native type, as obtained from the reflection provider.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeType {
    /// Package and simple name.
    pub name: QualifiedName,
    /// Dotted full name.
    pub full_name: String,
    /// Identity hash of `full_name`.
    pub type_hash: TypeHash,
    pub modifiers: Modifiers,
    /// Superclass name; `None` for the root object, interfaces, and primitives.
    pub superclass: Option<String>,
    /// Directly implemented (or, for interfaces, extended) interface names.
    pub interfaces: Vec<String>,
    /// Set for primitive types.
    pub primitive: Option<PrimitiveKind>,
    /// Set for array types.
    pub component: Option<TypeSig>,
}

impl NativeType {
    fn new(full_name: impl Into<String>, modifiers: Modifiers) -> Self {
        let full_name = full_name.into();
        Self {
            name: QualifiedName::parse(&full_name),
            type_hash: TypeHash::from_name(&full_name),
            full_name,
            modifiers,
            superclass: None,
            interfaces: Vec::new(),
            primitive: None,
            component: None,
        }
    }

    /// A public class extending the root object.
    pub fn class(full_name: impl Into<String>) -> Self {
        let mut ty = Self::new(full_name, Modifiers::PUBLIC);
        if ty.full_name != ROOT_OBJECT {
            ty.superclass = Some(ROOT_OBJECT.to_string());
        }
        ty
    }

    /// A public interface.
    pub fn interface(full_name: impl Into<String>) -> Self {
        Self::new(
            full_name,
            Modifiers::PUBLIC | Modifiers::INTERFACE | Modifiers::ABSTRACT,
        )
    }

    /// The descriptor for a primitive kind.
    pub fn primitive(kind: PrimitiveKind) -> Self {
        let mut ty = Self::new(
            kind.name(),
            Modifiers::PUBLIC | Modifiers::FINAL | Modifiers::PRIMITIVE,
        );
        ty.primitive = Some(kind);
        ty
    }

    /// The descriptor for an array of `component`.
    pub fn array(component: TypeSig) -> Self {
        let name = TypeSig::array_of(component.clone()).name();
        let mut ty = Self::new(name, Modifiers::PUBLIC | Modifiers::FINAL | Modifiers::ARRAY);
        ty.superclass = Some(ROOT_OBJECT.to_string());
        ty.component = Some(component);
        ty
    }

    // === Builder Methods ===

    pub fn with_superclass(mut self, name: impl Into<String>) -> Self {
        self.superclass = Some(name.into());
        self
    }

    pub fn without_superclass(mut self) -> Self {
        self.superclass = None;
        self
    }

    pub fn with_interface(mut self, name: impl Into<String>) -> Self {
        self.interfaces.push(name.into());
        self
    }

    pub fn as_final(mut self) -> Self {
        self.modifiers |= Modifiers::FINAL;
        self
    }

    pub fn as_abstract(mut self) -> Self {
        self.modifiers |= Modifiers::ABSTRACT;
        self
    }

    pub fn as_non_public(mut self) -> Self {
        self.modifiers.remove(Modifiers::PUBLIC);
        self
    }

    // === Queries ===

    pub fn is_public(&self) -> bool {
        self.modifiers.contains(Modifiers::PUBLIC)
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.contains(Modifiers::FINAL)
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(Modifiers::ABSTRACT)
    }

    pub fn is_interface(&self) -> bool {
        self.modifiers.contains(Modifiers::INTERFACE)
    }

    pub fn is_array(&self) -> bool {
        self.modifiers.contains(Modifiers::ARRAY)
    }

    pub fn is_primitive(&self) -> bool {
        self.modifiers.contains(Modifiers::PRIMITIVE)
    }

    pub fn is_root_object(&self) -> bool {
        self.full_name == ROOT_OBJECT
    }

    pub fn is_nested(&self) -> bool {
        self.name.is_nested()
    }

    /// This type in signature position.
    pub fn as_sig(&self) -> TypeSig {
        if let Some(kind) = self.primitive {
            return TypeSig::Primitive(kind);
        }
        if let Some(component) = &self.component {
            return TypeSig::array_of(component.clone());
        }
        if self.full_name == STRING_TYPE {
            return TypeSig::String;
        }
        TypeSig::Object {
            name: Arc::from(self.full_name.as_str()),
            hash: self.type_hash,
            interface: self.is_interface(),
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name)
    }
}
