//! Array conversion and element access.

use crossbind_core::{ConversionError, ManagedValue, NativeArray, NativeValue, TypeSig};

use super::{ConvertContext, Converter};

/// Converter for array-typed targets.
///
/// Managed arrays are copied element by element into a new native array.
/// Native arrays travel as opaque values so their identity survives a round trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayConverter;

impl Converter for ArrayConverter {
    fn to_managed(&self, value: &NativeValue, _ctx: &ConvertContext<'_>) -> ManagedValue {
        ManagedValue::Opaque(value.clone())
    }

    fn to_native(
        &self,
        value: &ManagedValue,
        target: &TypeSig,
        ctx: &ConvertContext<'_>,
    ) -> Result<NativeValue, ConversionError> {
        let Some(component) = target.component() else {
            return Err(ConversionError::unconvertible(value.type_name(), target, "not an array type"));
        };

        match value {
            ManagedValue::Array(items) => {
                let elements = items
                    .iter()
                    .map(|item| ctx.values.to_native(item, component, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(NativeValue::Array(NativeArray::new(component.clone(), elements)))
            }
            ManagedValue::Opaque(NativeValue::Array(array)) if array.component() == component => {
                Ok(NativeValue::Array(array.clone()))
            }
            other => Err(ConversionError::unconvertible(
                other.type_name(),
                target,
                "element types differ",
            )),
        }
    }
}

fn checked_index(array: &NativeArray, index: i64) -> Result<usize, ConversionError> {
    let len = array.len();
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| ConversionError::IndexOutOfBounds {
            index,
            len,
            target: TypeSig::array_of(array.component().clone()).name(),
        })
}

/// Read one element, converted to a managed value.
pub fn array_get(
    array: &NativeArray,
    index: i64,
    ctx: &ConvertContext<'_>,
) -> Result<ManagedValue, ConversionError> {
    let i = checked_index(array, index)?;
    let element = array.get(i).unwrap_or(NativeValue::Null);
    Ok(ctx.values.to_managed(&element, ctx))
}

/// Convert `value` to the element type and store it.
pub fn array_set(
    array: &NativeArray,
    index: i64,
    value: &ManagedValue,
    ctx: &ConvertContext<'_>,
) -> Result<(), ConversionError> {
    let i = checked_index(array, index)?;
    let native = ctx.values.to_native(value, array.component(), ctx)?;
    array.set(i, native);
    Ok(())
}
