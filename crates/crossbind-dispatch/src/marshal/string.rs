//! String conversion and encoding handling.

use std::sync::Arc;

use crossbind_core::{ConversionError, ManagedString, ManagedValue, NativeValue, TypeSig};
use encoding_rs::Encoding;

use super::{ConvertContext, Converter};

/// Decode a managed string with its own tag, or `default` when untagged.
///
/// Malformed input is an error; nothing is replaced silently.
pub fn decode_managed(
    s: &ManagedString,
    default: &'static Encoding,
    target: &TypeSig,
) -> Result<String, ConversionError> {
    let encoding = s.encoding.unwrap_or(default);
    encoding
        .decode_without_bom_handling_and_without_replacement(&s.bytes)
        .map(|text| text.into_owned())
        .ok_or_else(|| {
            ConversionError::unconvertible(
                "string",
                target,
                format!("malformed {} byte sequence", encoding.name()),
            )
        })
}

/// Converter for the platform string type.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl Converter for StringConverter {
    fn to_managed(&self, value: &NativeValue, _ctx: &ConvertContext<'_>) -> ManagedValue {
        match value {
            NativeValue::String(s) => ManagedValue::String(ManagedString::utf8(s)),
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
            ManagedValue::String(s) => Ok(NativeValue::String(Arc::from(ctx.decode(s, target)?))),
            ManagedValue::Opaque(NativeValue::String(s)) => Ok(NativeValue::String(Arc::clone(s))),
            other => Err(ConversionError::unconvertible(other.type_name(), target, "not a string")),
        }
    }
}
