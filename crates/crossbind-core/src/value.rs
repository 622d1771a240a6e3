//! Values on both sides of the boundary.
//!
//! [`ManagedValue`] is what the dynamically-typed runtime passes around;
//! [`NativeValue`] is what the reflection provider consumes and produces.
//! Reference identity matters on both sides: [`NativeObject`] and
//! [`ProxyInstance`] compare by pointer, never by content.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use encoding_rs::Encoding;
use parking_lot::RwLock;

use crate::{NativeType, TypeHash, TypeSig};

// ============================================================================
// Runtime handles
// ============================================================================

/// Handle to a type defined in the managed runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuntimeTypeHandle(pub u64);

/// Handle to an instance allocated by the managed runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManagedHandle(pub u64);

// ============================================================================
// Managed side
// ============================================================================

/// A managed string: raw bytes plus an optional encoding tag.
///
/// Untagged strings are decoded with the converter's default encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedString {
    pub bytes: Arc<[u8]>,
    pub encoding: Option<&'static Encoding>,
}

impl ManagedString {
    /// A UTF-8 tagged string.
    pub fn utf8(s: &str) -> Self {
        Self {
            bytes: Arc::from(s.as_bytes()),
            encoding: Some(encoding_rs::UTF_8),
        }
    }

    pub fn with_encoding(bytes: impl Into<Arc<[u8]>>, encoding: &'static Encoding) -> Self {
        Self {
            bytes: bytes.into(),
            encoding: Some(encoding),
        }
    }

    pub fn untagged(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            encoding: None,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A managed callable (block, lambda, method object).
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedProc {
    pub id: u64,
    /// Declared arity; negative means "optional arguments".
    pub arity: i32,
}

/// A plain managed object with no native counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedObject {
    pub id: u64,
    pub class_name: Arc<str>,
}

/// A value in the managed runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagedValue {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(ManagedString),
    Array(Vec<ManagedValue>),
    Proc(ManagedProc),
    Object(ManagedObject),
    /// Wrapper around a native instance.
    Proxy(ProxyInstance),
    /// Native value with no dedicated converter, carried through untouched.
    Opaque(NativeValue),
}

impl ManagedValue {
    /// Convenience constructor for a UTF-8 string.
    pub fn str(s: &str) -> Self {
        ManagedValue::String(ManagedString::utf8(s))
    }

    /// Get a human-readable name for this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            ManagedValue::Nil => "nil",
            ManagedValue::Bool(_) => "bool",
            ManagedValue::Int(_) => "integer",
            ManagedValue::Float(_) => "float",
            ManagedValue::String(_) => "string",
            ManagedValue::Array(_) => "array",
            ManagedValue::Proc(_) => "proc",
            ManagedValue::Object(_) => "object",
            ManagedValue::Proxy(_) => "proxy",
            ManagedValue::Opaque(_) => "opaque",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, ManagedValue::Nil)
    }

    pub fn as_proxy(&self) -> Option<&ProxyInstance> {
        match self {
            ManagedValue::Proxy(p) => Some(p),
            _ => None,
        }
    }
}

// ============================================================================
// Native side
// ============================================================================

/// A native object reference: its runtime type plus an opaque payload.
///
/// Equality is identity of the payload allocation.
#[derive(Clone)]
pub struct NativeObject {
    ty: Arc<NativeType>,
    payload: Arc<dyn Any + Send + Sync>,
}

impl NativeObject {
    pub fn new<T: Any + Send + Sync>(ty: Arc<NativeType>, payload: T) -> Self {
        Self {
            ty,
            payload: Arc::new(payload),
        }
    }

    pub fn from_arc(ty: Arc<NativeType>, payload: Arc<dyn Any + Send + Sync>) -> Self {
        Self { ty, payload }
    }

    /// Runtime type of the object.
    pub fn native_type(&self) -> &Arc<NativeType> {
        &self.ty
    }

    pub fn payload(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.payload
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Address of the payload; stable for the object's lifetime.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.payload) as *const () as usize
    }

    pub fn same(&self, other: &NativeObject) -> bool {
        self.identity() == other.identity()
    }

    pub fn downgrade(&self) -> WeakNativeObject {
        WeakNativeObject {
            ty: Arc::clone(&self.ty),
            payload: Arc::downgrade(&self.payload),
        }
    }
}

impl PartialEq for NativeObject {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for NativeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeObject({}@0x{:x})", self.ty.full_name, self.identity())
    }
}

/// Weak counterpart of [`NativeObject`].
#[derive(Clone)]
pub struct WeakNativeObject {
    ty: Arc<NativeType>,
    payload: Weak<dyn Any + Send + Sync>,
}

impl WeakNativeObject {
    pub fn upgrade(&self) -> Option<NativeObject> {
        self.payload.upgrade().map(|payload| NativeObject {
            ty: Arc::clone(&self.ty),
            payload,
        })
    }

    pub fn is_alive(&self) -> bool {
        self.payload.strong_count() > 0
    }
}

impl fmt::Debug for WeakNativeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakNativeObject({})", self.ty.full_name)
    }
}

/// A native array. Element storage is shared; clones alias the same array.
#[derive(Clone)]
pub struct NativeArray {
    component: TypeSig,
    elements: Arc<RwLock<Vec<NativeValue>>>,
}

impl NativeArray {
    pub fn new(component: TypeSig, elements: Vec<NativeValue>) -> Self {
        Self {
            component,
            elements: Arc::new(RwLock::new(elements)),
        }
    }

    pub fn component(&self) -> &TypeSig {
        &self.component
    }

    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<NativeValue> {
        self.elements.read().get(index).cloned()
    }

    /// Store `value` at `index`. Returns `false` when out of bounds.
    pub fn set(&self, index: usize, value: NativeValue) -> bool {
        match self.elements.write().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Copy of the current elements.
    pub fn to_vec(&self) -> Vec<NativeValue> {
        self.elements.read().clone()
    }

    pub fn same(&self, other: &NativeArray) -> bool {
        Arc::ptr_eq(&self.elements, &other.elements)
    }
}

impl PartialEq for NativeArray {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for NativeArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeArray({}[{}])", self.component, self.len())
    }
}

/// A value on the native side.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(Arc<str>),
    Object(NativeObject),
    Array(NativeArray),
}

impl NativeValue {
    /// Get a human-readable name for this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            NativeValue::Null => "null",
            NativeValue::Boolean(_) => "boolean",
            NativeValue::Byte(_) => "byte",
            NativeValue::Short(_) => "short",
            NativeValue::Char(_) => "char",
            NativeValue::Int(_) => "int",
            NativeValue::Long(_) => "long",
            NativeValue::Float(_) => "float",
            NativeValue::Double(_) => "double",
            NativeValue::String(_) => "string",
            NativeValue::Object(_) => "object",
            NativeValue::Array(_) => "array",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }

    /// Integral payload widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            NativeValue::Byte(v) => Some(v as i64),
            NativeValue::Short(v) => Some(v as i64),
            NativeValue::Char(v) => Some(v as i64),
            NativeValue::Int(v) => Some(v as i64),
            NativeValue::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&NativeObject> {
        match self {
            NativeValue::Object(o) => Some(o),
            _ => None,
        }
    }
}

// ============================================================================
// Proxy instances
// ============================================================================

/// Shared state behind a [`ProxyInstance`].
#[derive(Debug)]
pub struct ProxyCell {
    /// Hash of the proxy type's native type.
    pub type_hash: TypeHash,
    /// The managed-runtime instance backing this proxy.
    pub runtime_object: ManagedHandle,
    /// The wrapped native object.
    pub object: NativeObject,
}

/// A managed wrapper around a native instance.
///
/// Clones share one cell; equality is identity of that cell.
#[derive(Debug, Clone)]
pub struct ProxyInstance(Arc<ProxyCell>);

impl ProxyInstance {
    pub fn new(type_hash: TypeHash, runtime_object: ManagedHandle, object: NativeObject) -> Self {
        Self(Arc::new(ProxyCell {
            type_hash,
            runtime_object,
            object,
        }))
    }

    pub fn object(&self) -> &NativeObject {
        &self.0.object
    }

    pub fn type_hash(&self) -> TypeHash {
        self.0.type_hash
    }

    pub fn runtime_object(&self) -> ManagedHandle {
        self.0.runtime_object
    }

    pub fn same(&self, other: &ProxyInstance) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakProxyInstance {
        WeakProxyInstance(Arc::downgrade(&self.0))
    }
}

impl PartialEq for ProxyInstance {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

/// Weak counterpart of [`ProxyInstance`].
#[derive(Debug, Clone)]
pub struct WeakProxyInstance(Weak<ProxyCell>);

impl WeakProxyInstance {
    pub fn upgrade(&self) -> Option<ProxyInstance> {
        self.0.upgrade().map(ProxyInstance)
    }
}
