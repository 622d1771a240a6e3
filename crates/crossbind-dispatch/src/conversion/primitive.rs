//! Numeric preference tables.

use crossbind_core::PrimitiveKind;

/// Preference of an integral managed argument for a numeric parameter kind.
pub const fn integer_preference(kind: PrimitiveKind) -> u32 {
    match kind {
        PrimitiveKind::Long => 10,
        PrimitiveKind::Int => 8,
        PrimitiveKind::Short => 6,
        PrimitiveKind::Byte => 4,
        PrimitiveKind::Float => 3,
        PrimitiveKind::Double => 2,
        _ => 0,
    }
}

/// Preference of a floating managed argument for a numeric parameter kind.
pub const fn float_preference(kind: PrimitiveKind) -> u32 {
    match kind {
        PrimitiveKind::Double => 10,
        PrimitiveKind::Float => 8,
        _ => 0,
    }
}
