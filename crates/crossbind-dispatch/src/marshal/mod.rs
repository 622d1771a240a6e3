//! Bidirectional value conversion between managed and native values.
//!
//! [`ValueConverter`] keeps a table from [`ConverterKey`] to a dedicated
//! [`Converter`]. Native values whose shape has no entry fall through to the
//! [`ObjectConverter`], which wraps them opaquely.
//!
//! ## Rules
//!
//! - Nil becomes native null for reference targets and fails for primitives
//! - Integral narrowing is range-checked per target width
//! - Floating values never convert to integral targets
//! - Strings are decoded with their own encoding tag, or the default encoding
//! - Managed callables and objects reach interface targets through an
//!   [`InterfaceAdapter`], when one is configured

mod array;
mod numeric;
mod object;
mod string;

pub use array::{ArrayConverter, array_get, array_set};
pub use numeric::{BooleanConverter, CharConverter, NumericConverter, float_to_native, integer_to_native};
pub use object::ObjectConverter;
pub use string::{StringConverter, decode_managed};

use std::sync::Arc;

use crossbind_core::{
    ArgumentError, Callable, ConversionError, InterfaceAdapter, ManagedString, ManagedValue,
    NativeArray, NativeValue, PrimitiveKind, TypeHash, TypeHierarchy, TypeSig,
};
use encoding_rs::Encoding;
use rustc_hash::FxHashMap;

use crate::shape::ArgShape;

/// Converts values of one native shape in both directions.
pub trait Converter: Send + Sync {
    fn to_managed(&self, value: &NativeValue, ctx: &ConvertContext<'_>) -> ManagedValue;

    fn to_native(
        &self,
        value: &ManagedValue,
        target: &TypeSig,
        ctx: &ConvertContext<'_>,
    ) -> Result<NativeValue, ConversionError>;
}

/// Key into the converter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConverterKey {
    Primitive(PrimitiveKind),
    Boxed(PrimitiveKind),
    String,
    Array,
    Object(TypeHash),
}

impl ConverterKey {
    /// Key selected by a conversion target.
    pub fn for_target(target: &TypeSig) -> Option<Self> {
        match target {
            TypeSig::Void => None,
            TypeSig::Primitive(kind) => Some(ConverterKey::Primitive(*kind)),
            TypeSig::Boxed(kind) => Some(ConverterKey::Boxed(*kind)),
            TypeSig::String => Some(ConverterKey::String),
            TypeSig::Array(_) => Some(ConverterKey::Array),
            TypeSig::Object { hash, .. } => Some(ConverterKey::Object(*hash)),
        }
    }

    /// Key selected by a native value's own shape.
    pub fn for_value(value: &NativeValue) -> Option<Self> {
        let kind = match value {
            NativeValue::Null => return None,
            NativeValue::Boolean(_) => PrimitiveKind::Boolean,
            NativeValue::Byte(_) => PrimitiveKind::Byte,
            NativeValue::Short(_) => PrimitiveKind::Short,
            NativeValue::Char(_) => PrimitiveKind::Char,
            NativeValue::Int(_) => PrimitiveKind::Int,
            NativeValue::Long(_) => PrimitiveKind::Long,
            NativeValue::Float(_) => PrimitiveKind::Float,
            NativeValue::Double(_) => PrimitiveKind::Double,
            NativeValue::String(_) => return Some(ConverterKey::String),
            NativeValue::Array(_) => return Some(ConverterKey::Array),
            NativeValue::Object(o) => return Some(ConverterKey::Object(o.native_type().type_hash)),
        };
        Some(ConverterKey::Primitive(kind))
    }
}

/// Collaborators available to a conversion.
#[derive(Clone, Copy)]
pub struct ConvertContext<'a> {
    pub values: &'a ValueConverter,
    pub hierarchy: &'a dyn TypeHierarchy,
    pub adapter: Option<&'a dyn InterfaceAdapter>,
}

impl<'a> ConvertContext<'a> {
    pub fn new(values: &'a ValueConverter, hierarchy: &'a dyn TypeHierarchy) -> Self {
        Self {
            values,
            hierarchy,
            adapter: None,
        }
    }

    pub fn with_adapter(mut self, adapter: Option<&'a dyn InterfaceAdapter>) -> Self {
        self.adapter = adapter;
        self
    }

    /// Decode a managed string using the converter's default encoding when untagged.
    pub fn decode(&self, s: &ManagedString, target: &TypeSig) -> Result<String, ConversionError> {
        decode_managed(s, self.values.default_encoding(), target)
    }
}

/// Registered-converter table with an opaque fallback.
pub struct ValueConverter {
    table: FxHashMap<ConverterKey, Arc<dyn Converter>>,
    fallback: Arc<dyn Converter>,
    default_encoding: &'static Encoding,
}

impl ValueConverter {
    /// A converter with every built-in shape registered and UTF-8 as the default encoding.
    pub fn new() -> Self {
        let mut converter = Self {
            table: FxHashMap::default(),
            fallback: Arc::new(ObjectConverter),
            default_encoding: encoding_rs::UTF_8,
        };
        converter.register_builtins();
        converter
    }

    fn register_builtins(&mut self) {
        for kind in PrimitiveKind::ALL {
            let converter: Arc<dyn Converter> = match kind {
                PrimitiveKind::Void => continue,
                PrimitiveKind::Boolean => Arc::new(BooleanConverter),
                PrimitiveKind::Char => Arc::new(CharConverter),
                numeric => Arc::new(NumericConverter::new(numeric)),
            };
            self.table.insert(ConverterKey::Primitive(kind), Arc::clone(&converter));
            self.table.insert(ConverterKey::Boxed(kind), converter);
        }
        self.table.insert(ConverterKey::String, Arc::new(StringConverter));
        self.table.insert(ConverterKey::Array, Arc::new(ArrayConverter));
    }

    // === Builder Methods ===

    pub fn with_default_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.default_encoding = encoding;
        self
    }

    /// Register a converter, replacing any previous one for `key`.
    pub fn with_converter(mut self, key: ConverterKey, converter: Arc<dyn Converter>) -> Self {
        self.register(key, converter);
        self
    }

    pub fn register(&mut self, key: ConverterKey, converter: Arc<dyn Converter>) {
        self.table.insert(key, converter);
    }

    pub fn default_encoding(&self) -> &'static Encoding {
        self.default_encoding
    }

    fn lookup(&self, key: Option<ConverterKey>) -> &Arc<dyn Converter> {
        key.and_then(|k| self.table.get(&k)).unwrap_or(&self.fallback)
    }

    // === Conversions ===

    /// Convert a native value for the managed runtime.
    pub fn to_managed(&self, value: &NativeValue, ctx: &ConvertContext<'_>) -> ManagedValue {
        if value.is_null() {
            return ManagedValue::Nil;
        }
        self.lookup(ConverterKey::for_value(value)).to_managed(value, ctx)
    }

    /// Convert a managed value to the native `target` type.
    pub fn to_native(
        &self,
        value: &ManagedValue,
        target: &TypeSig,
        ctx: &ConvertContext<'_>,
    ) -> Result<NativeValue, ConversionError> {
        let is_null = matches!(value, ManagedValue::Nil | ManagedValue::Opaque(NativeValue::Null));
        if is_null {
            return match target {
                TypeSig::Primitive(kind) => Err(ConversionError::NullToPrimitive {
                    target: kind.name().to_string(),
                }),
                TypeSig::Void => Err(ConversionError::unconvertible("nil", target, "void target")),
                _ => Ok(NativeValue::Null),
            };
        }
        self.lookup(ConverterKey::for_target(target)).to_native(value, target, ctx)
    }
}

impl Default for ValueConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ValueConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueConverter")
            .field("converters", &self.table.len())
            .field("default_encoding", &self.default_encoding.name())
            .finish()
    }
}

/// Convert call arguments for `callable`, packing trailing varargs into an array.
pub fn marshal_arguments(
    callable: &Callable,
    args: &[ManagedValue],
    ctx: &ConvertContext<'_>,
) -> Result<Vec<NativeValue>, ArgumentError> {
    let values = ctx.values;
    let convert = |position: usize, param: &TypeSig| {
        values
            .to_native(&args[position], param, ctx)
            .map_err(|source| ArgumentError { position, source })
    };

    if !callable.is_varargs {
        return callable
            .params
            .iter()
            .take(args.len())
            .enumerate()
            .map(|(position, param)| convert(position, param))
            .collect();
    }

    let fixed = callable.arity().saturating_sub(1);
    let mut native = Vec::with_capacity(callable.arity());
    for (position, param) in callable.params[..fixed].iter().take(args.len()).enumerate() {
        native.push(convert(position, param)?);
    }

    let Some(array_param) = callable.params.get(fixed) else {
        return Ok(native);
    };
    let start = fixed.min(args.len());
    let trailing = &args[start..];
    let pass_through = trailing.len() == 1 && ArgShape::of(&trailing[0]).is_array_like();
    if pass_through {
        native.push(convert(start, array_param)?);
        return Ok(native);
    }

    let component = array_param.component().cloned().unwrap_or_else(TypeSig::root_object);
    let packed = (start..args.len())
        .map(|position| convert(position, &component))
        .collect::<Result<Vec<_>, _>>()?;
    native.push(NativeValue::Array(NativeArray::new(component, packed)));
    Ok(native)
}
