//! Fallback converter for reference types with no dedicated converter.

use std::sync::Arc;

use crossbind_core::{ConversionError, ManagedValue, NativeArray, NativeObject, NativeValue, TypeSig};

use super::{ConvertContext, Converter};

/// Wraps unrecognized native values opaquely and unwraps proxies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectConverter;

impl ObjectConverter {
    fn accepts(&self, object: &NativeObject, target: &TypeSig, ctx: &ConvertContext<'_>) -> bool {
        target.is_root_object()
            || target.type_hash() == object.native_type().type_hash
            || ctx
                .hierarchy
                .is_assignable(object.native_type().type_hash, target.type_hash())
    }

    fn object(
        &self,
        object: &NativeObject,
        target: &TypeSig,
        ctx: &ConvertContext<'_>,
    ) -> Result<NativeValue, ConversionError> {
        if self.accepts(object, target, ctx) {
            Ok(NativeValue::Object(object.clone()))
        } else {
            Err(ConversionError::unconvertible(
                &object.native_type().full_name,
                target,
                "not a subtype",
            ))
        }
    }

    /// Box a managed primitive for a root-object target.
    fn boxed(
        &self,
        value: &ManagedValue,
        target: &TypeSig,
        ctx: &ConvertContext<'_>,
    ) -> Result<NativeValue, ConversionError> {
        match value {
            ManagedValue::Bool(b) => Ok(NativeValue::Boolean(*b)),
            ManagedValue::Int(v) => Ok(NativeValue::Long(*v)),
            ManagedValue::Float(v) => Ok(NativeValue::Double(*v)),
            ManagedValue::String(s) => Ok(NativeValue::String(Arc::from(ctx.decode(s, target)?))),
            ManagedValue::Array(items) => {
                let component = TypeSig::root_object();
                let elements = items
                    .iter()
                    .map(|item| ctx.values.to_native(item, &component, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(NativeValue::Array(NativeArray::new(component, elements)))
            }
            other => Err(ConversionError::unconvertible(other.type_name(), target, "no conversion")),
        }
    }
}

impl Converter for ObjectConverter {
    fn to_managed(&self, value: &NativeValue, _ctx: &ConvertContext<'_>) -> ManagedValue {
        match value {
            NativeValue::Null => ManagedValue::Nil,
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
            ManagedValue::Proxy(proxy) => self.object(proxy.object(), target, ctx),
            ManagedValue::Opaque(NativeValue::Object(object)) => self.object(object, target, ctx),
            ManagedValue::Opaque(native) if target.is_root_object() => Ok(native.clone()),
            ManagedValue::Proc(_) | ManagedValue::Object(_)
                if target.is_interface() || target.is_root_object() =>
            {
                let adapter = ctx.adapter.ok_or_else(|| {
                    ConversionError::unconvertible(value.type_name(), target, "no interface adapter")
                })?;
                adapter
                    .adapt(value, target)
                    .map(NativeValue::Object)
                    .map_err(|err| ConversionError::unconvertible(value.type_name(), target, err.to_string()))
            }
            other if target.is_root_object() => self.boxed(other, target, ctx),
            other => Err(ConversionError::unconvertible(other.type_name(), target, "no conversion")),
        }
    }
}
