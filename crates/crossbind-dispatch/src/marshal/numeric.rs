//! Converters for boolean, numeric and char values.

use crossbind_core::{ConversionError, ManagedValue, NativeValue, PrimitiveKind, TypeSig};

use super::{ConvertContext, Converter};

// ============================================================================
// Range-checked narrowing
// ============================================================================

fn check_range(value: i64, kind: PrimitiveKind) -> Result<i64, ConversionError> {
    match kind.integral_range() {
        Some((min, max)) if (min..=max).contains(&value) => Ok(value),
        Some(_) => Err(ConversionError::RangeOverflow {
            value: value.to_string(),
            target: kind.name().to_string(),
        }),
        None => Ok(value),
    }
}

/// Convert an integer to the numeric `kind`, checking its range.
pub fn integer_to_native(value: i64, kind: PrimitiveKind) -> Result<NativeValue, ConversionError> {
    // Casts below are lossless once the range check passes.
    Ok(match kind {
        PrimitiveKind::Byte => NativeValue::Byte(check_range(value, kind)? as i8),
        PrimitiveKind::Short => NativeValue::Short(check_range(value, kind)? as i16),
        PrimitiveKind::Char => NativeValue::Char(check_range(value, kind)? as u16),
        PrimitiveKind::Int => NativeValue::Int(check_range(value, kind)? as i32),
        PrimitiveKind::Long => NativeValue::Long(value),
        PrimitiveKind::Float => NativeValue::Float(value as f32),
        PrimitiveKind::Double => NativeValue::Double(value as f64),
        PrimitiveKind::Boolean | PrimitiveKind::Void => {
            return Err(ConversionError::unconvertible(
                "integer",
                kind,
                "not a numeric type",
            ));
        }
    })
}

/// Convert a float to the numeric `kind`. Integral targets never accept floats.
pub fn float_to_native(value: f64, kind: PrimitiveKind) -> Result<NativeValue, ConversionError> {
    match kind {
        PrimitiveKind::Double => Ok(NativeValue::Double(value)),
        PrimitiveKind::Float => {
            if value.is_finite() && value.abs() > f32::MAX as f64 {
                return Err(ConversionError::RangeOverflow {
                    value: value.to_string(),
                    target: "float".to_string(),
                });
            }
            Ok(NativeValue::Float(value as f32))
        }
        _ => Err(ConversionError::unconvertible(
            "float",
            kind,
            "floating value would be truncated",
        )),
    }
}

fn native_to_managed_number(value: &NativeValue) -> Option<ManagedValue> {
    match *value {
        NativeValue::Float(v) => Some(ManagedValue::Float(v as f64)),
        NativeValue::Double(v) => Some(ManagedValue::Float(v)),
        ref other => other.as_i64().map(ManagedValue::Int),
    }
}

// ============================================================================
// Converters
// ============================================================================

/// Converter for one numeric kind (primitive or boxed).
#[derive(Debug, Clone, Copy)]
pub struct NumericConverter {
    kind: PrimitiveKind,
}

impl NumericConverter {
    pub fn new(kind: PrimitiveKind) -> Self {
        Self { kind }
    }
}

impl Converter for NumericConverter {
    fn to_managed(&self, value: &NativeValue, _ctx: &ConvertContext<'_>) -> ManagedValue {
        native_to_managed_number(value).unwrap_or_else(|| ManagedValue::Opaque(value.clone()))
    }

    fn to_native(
        &self,
        value: &ManagedValue,
        target: &TypeSig,
        _ctx: &ConvertContext<'_>,
    ) -> Result<NativeValue, ConversionError> {
        match value {
            ManagedValue::Int(v) => integer_to_native(*v, self.kind),
            ManagedValue::Float(v) => float_to_native(*v, self.kind),
            ManagedValue::Opaque(native) => match native {
                NativeValue::Float(v) => float_to_native(*v as f64, self.kind),
                NativeValue::Double(v) => float_to_native(*v, self.kind),
                other => match other.as_i64() {
                    Some(v) => integer_to_native(v, self.kind),
                    None => Err(ConversionError::unconvertible(other.type_name(), target, "not a number")),
                },
            },
            other => Err(ConversionError::unconvertible(other.type_name(), target, "not a number")),
        }
    }
}

/// Converter for `boolean`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanConverter;

impl Converter for BooleanConverter {
    fn to_managed(&self, value: &NativeValue, _ctx: &ConvertContext<'_>) -> ManagedValue {
        match value {
            NativeValue::Boolean(b) => ManagedValue::Bool(*b),
            other => ManagedValue::Opaque(other.clone()),
        }
    }

    fn to_native(
        &self,
        value: &ManagedValue,
        target: &TypeSig,
        _ctx: &ConvertContext<'_>,
    ) -> Result<NativeValue, ConversionError> {
        match value {
            ManagedValue::Bool(b) => Ok(NativeValue::Boolean(*b)),
            ManagedValue::Opaque(NativeValue::Boolean(b)) => Ok(NativeValue::Boolean(*b)),
            other => Err(ConversionError::unconvertible(other.type_name(), target, "not a boolean")),
        }
    }
}

/// Converter for `char`: accepts code units and single-unit strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharConverter;

impl Converter for CharConverter {
    fn to_managed(&self, value: &NativeValue, _ctx: &ConvertContext<'_>) -> ManagedValue {
        match value {
            NativeValue::Char(c) => ManagedValue::Int(*c as i64),
            other => ManagedValue::Opaque(other.clone()),
        }
    }

    fn to_native(
        &self,
        value: &ManagedValue,
        target: &TypeSig,
        ctx: &ConvertContext<'_>,
    ) -> Result<NativeValue, ConversionError> {
        match value {
            ManagedValue::Int(v) => integer_to_native(*v, PrimitiveKind::Char),
            ManagedValue::String(s) => {
                let text = ctx.decode(s, target)?;
                let mut units = text.encode_utf16();
                match (units.next(), units.next()) {
                    (Some(unit), None) => Ok(NativeValue::Char(unit)),
                    _ => Err(ConversionError::unconvertible(
                        "string",
                        target,
                        "string must hold exactly one character",
                    )),
                }
            }
            ManagedValue::Opaque(NativeValue::Char(c)) => Ok(NativeValue::Char(*c)),
            other => Err(ConversionError::unconvertible(other.type_name(), target, "not a character")),
        }
    }
}
