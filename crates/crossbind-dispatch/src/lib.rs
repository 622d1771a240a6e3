//! Call dispatch for crossbind.
//!
//! - [`overload`]: picks a callable from an overload group for a set of arguments
//! - [`conversion`]: argument-to-parameter compatibility tiers
//! - [`marshal`]: converts values across the boundary in both directions
//! - [`shape`]: runtime argument shapes and the signature cache key

pub mod conversion;
pub mod marshal;
pub mod overload;
pub mod shape;

pub use conversion::{Compatibility, MatchTier, find_compatibility};
pub use marshal::{ConvertContext, Converter, ConverterKey, ValueConverter, marshal_arguments};
pub use overload::{OverloadMatch, OverloadSet, ResolveContext, SignatureCache, resolve_overload};
pub use shape::{ArgShape, shape_code, shapes_of};
