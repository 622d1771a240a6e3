//! Argument compatibility checking.
//!
//! Determines whether an argument of a given [`ArgShape`] can be passed to a
//! parameter of a given [`TypeSig`], and how good a fit it is. This is what the
//! overload resolver ranks on.
//!
//! ## Match Tiers
//!
//! From best to worst:
//! 1. Exact: the argument already is the parameter type
//! 2. Assignable: reference conversion to a supertype, or nil to a reference
//! 3. Widening: primitive widening, narrowing with a range check, boxing
//! 4. Duck: adaptation of a managed callable or object to a native interface
//!
//! Within a tier, a numeric preference breaks ties (an integer argument prefers
//! `long` over `int` over `short` over `byte` over `float` over `double`).

mod primitive;

pub use primitive::{float_preference, integer_preference};

use crossbind_core::{PrimitiveKind, TypeHash, TypeHierarchy, TypeSig};

use crate::shape::ArgShape;

/// Quality tier of an argument-to-parameter match. Ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    Duck,
    Widening,
    Assignable,
    Exact,
}

/// How well one argument fits one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compatibility {
    pub tier: MatchTier,
    /// Tie-breaking preference within the tier (higher is better).
    pub preference: u32,
}

impl Compatibility {
    pub const fn new(tier: MatchTier, preference: u32) -> Self {
        Self { tier, preference }
    }

    pub const fn exact() -> Self {
        Self::new(MatchTier::Exact, EXACT_PREFERENCE)
    }

    pub fn is_exact(&self) -> bool {
        self.tier == MatchTier::Exact
    }
}

/// Preference of an exact match.
pub const EXACT_PREFERENCE: u32 = 10;

/// Check whether an argument of `shape` can be passed as `param`.
///
/// `allow_duck` enables the duck tier; it is only meaningful when an
/// interface adapter is available to perform the conversion.
pub fn find_compatibility(
    shape: ArgShape,
    param: &TypeSig,
    hierarchy: &dyn TypeHierarchy,
    allow_duck: bool,
) -> Option<Compatibility> {
    use MatchTier::*;

    if matches!(param, TypeSig::Void) {
        return None;
    }

    match shape {
        ArgShape::Nil => param.is_reference().then_some(Compatibility::new(Assignable, 0)),

        ArgShape::Bool => match param {
            TypeSig::Primitive(PrimitiveKind::Boolean) => Some(Compatibility::exact()),
            TypeSig::Boxed(PrimitiveKind::Boolean) => Some(Compatibility::new(Widening, 8)),
            p if p.is_root_object() => Some(Compatibility::new(Widening, 0)),
            _ => None,
        },

        ArgShape::Integer => match param {
            TypeSig::Primitive(PrimitiveKind::Long) => Some(Compatibility::exact()),
            TypeSig::Primitive(kind) if kind.is_numeric() => {
                Some(Compatibility::new(Widening, integer_preference(*kind)))
            }
            TypeSig::Boxed(kind) if kind.is_numeric() => Some(Compatibility::new(
                Widening,
                integer_preference(*kind).saturating_sub(1),
            )),
            p if p.is_root_object() => Some(Compatibility::new(Widening, 0)),
            _ => None,
        },

        ArgShape::Float => match param {
            TypeSig::Primitive(PrimitiveKind::Double) => Some(Compatibility::exact()),
            TypeSig::Primitive(kind) if kind.is_floating() => {
                Some(Compatibility::new(Widening, float_preference(*kind)))
            }
            TypeSig::Boxed(kind) if kind.is_floating() => Some(Compatibility::new(
                Widening,
                float_preference(*kind).saturating_sub(1),
            )),
            p if p.is_root_object() => Some(Compatibility::new(Widening, 0)),
            _ => None,
        },

        ArgShape::String => match param {
            TypeSig::String => Some(Compatibility::exact()),
            TypeSig::Primitive(PrimitiveKind::Char) | TypeSig::Boxed(PrimitiveKind::Char) => {
                Some(Compatibility::new(Widening, 1))
            }
            p if p.is_root_object() => Some(Compatibility::new(Assignable, 0)),
            _ => None,
        },

        ArgShape::Array => match param {
            TypeSig::Array(_) => Some(Compatibility::new(Widening, 5)),
            p if p.is_root_object() => Some(Compatibility::new(Widening, 0)),
            _ => None,
        },

        ArgShape::NativeArray(hash) => match param {
            TypeSig::Array(_) if param.type_hash() == hash => Some(Compatibility::exact()),
            p if p.is_root_object() => Some(Compatibility::new(Assignable, 0)),
            _ => None,
        },

        ArgShape::Native(hash) => native_compatibility(hash, param, hierarchy),

        ArgShape::Callable | ArgShape::Object => match param {
            TypeSig::Object {
                interface: true, ..
            } if allow_duck => Some(Compatibility::new(Duck, 0)),
            p if p.is_root_object() && allow_duck => Some(Compatibility::new(Duck, 0)),
            _ => None,
        },
    }
}

fn native_compatibility(
    hash: TypeHash,
    param: &TypeSig,
    hierarchy: &dyn TypeHierarchy,
) -> Option<Compatibility> {
    match param {
        TypeSig::Object { hash: target, .. } => {
            if *target == hash {
                return Some(Compatibility::exact());
            }
            match hierarchy.distance(hash, *target) {
                Some(0) => Some(Compatibility::exact()),
                Some(distance) => Some(Compatibility::new(
                    MatchTier::Assignable,
                    EXACT_PREFERENCE.saturating_sub(distance).max(1),
                )),
                None if param.is_root_object() => {
                    Some(Compatibility::new(MatchTier::Assignable, 0))
                }
                None => None,
            }
        }
        TypeSig::String | TypeSig::Boxed(_) if param.type_hash() == hash => {
            Some(Compatibility::exact())
        }
        _ => None,
    }
}
