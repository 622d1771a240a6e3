//! Runtime shapes of managed arguments.
//!
//! Overload selection depends only on the shape of each argument, never on its
//! value, which is what makes the resolved-signature cache sound.

use crossbind_core::{ManagedValue, NativeValue, TypeHash, TypeSig};

/// Shape of a single managed argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgShape {
    Nil,
    Bool,
    Integer,
    Float,
    String,
    /// A managed array.
    Array,
    /// A native array carried through untouched, keyed by its type hash.
    NativeArray(TypeHash),
    /// A proxy or opaque native object, keyed by its runtime type.
    Native(TypeHash),
    /// A managed callable.
    Callable,
    /// A managed object with no native counterpart.
    Object,
}

impl ArgShape {
    pub fn of(value: &ManagedValue) -> Self {
        match value {
            ManagedValue::Nil => ArgShape::Nil,
            ManagedValue::Bool(_) => ArgShape::Bool,
            ManagedValue::Int(_) => ArgShape::Integer,
            ManagedValue::Float(_) => ArgShape::Float,
            ManagedValue::String(_) => ArgShape::String,
            ManagedValue::Array(_) => ArgShape::Array,
            ManagedValue::Proc(_) => ArgShape::Callable,
            ManagedValue::Object(_) => ArgShape::Object,
            ManagedValue::Proxy(p) => ArgShape::Native(p.object().native_type().type_hash),
            ManagedValue::Opaque(native) => match native {
                NativeValue::Null => ArgShape::Nil,
                NativeValue::Object(o) => ArgShape::Native(o.native_type().type_hash),
                NativeValue::Array(a) => {
                    ArgShape::NativeArray(TypeSig::array_of(a.component().clone()).type_hash())
                }
                NativeValue::Boolean(_) => ArgShape::Bool,
                NativeValue::Float(_) | NativeValue::Double(_) => ArgShape::Float,
                NativeValue::String(_) => ArgShape::String,
                _ => ArgShape::Integer,
            },
        }
    }

    /// Whether an argument of this shape can be handed to an array parameter as-is.
    pub fn is_array_like(self) -> bool {
        matches!(self, ArgShape::Array | ArgShape::NativeArray(_))
    }

    fn code(self) -> u64 {
        match self {
            ArgShape::Nil => 1,
            ArgShape::Bool => 2,
            ArgShape::Integer => 3,
            ArgShape::Float => 4,
            ArgShape::String => 5,
            ArgShape::Array => 6,
            ArgShape::Callable => 7,
            ArgShape::Object => 8,
            ArgShape::NativeArray(hash) => hash.0.rotate_left(17) ^ 9,
            ArgShape::Native(hash) => hash.0,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            ArgShape::Nil => "nil",
            ArgShape::Bool => "bool",
            ArgShape::Integer => "integer",
            ArgShape::Float => "float",
            ArgShape::String => "string",
            ArgShape::Array => "array",
            ArgShape::NativeArray(_) => "native array",
            ArgShape::Native(_) => "native object",
            ArgShape::Callable => "proc",
            ArgShape::Object => "object",
        }
    }
}

/// Shapes of an argument list, in order.
pub fn shapes_of(args: &[ManagedValue]) -> Vec<ArgShape> {
    args.iter().map(ArgShape::of).collect()
}

/// Order-sensitive code for an argument list; the signature cache key.
pub fn shape_code(shapes: &[ArgShape]) -> TypeHash {
    let codes: Vec<u64> = shapes.iter().map(|s| s.code()).collect();
    TypeHash::from_shape_codes(&codes)
}
