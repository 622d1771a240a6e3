//! Error types for binding, dispatch and conversion.
//!
//! Every error names the offending native type or member and the operation that
//! was being attempted, so a failure surfacing in managed code can be traced back
//! to the native declaration that caused it.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ProviderError    - failures reported by the reflection provider
//! BindingError     - proxy type construction and subclass registration
//! ResolutionError  - overload selection
//! ConversionError  - value marshalling
//! NamespaceError   - package/type path lookup (wraps BindingError)
//! ```

use thiserror::Error;

// ============================================================================
// Provider Errors
// ============================================================================

/// Failures reported by the reflection provider.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// No type with the given name exists.
    #[error("no native type named '{name}'")]
    NotFound { name: String },

    /// The type exists but could not be linked or initialized.
    #[error("cannot link '{name}': {detail}")]
    Link { name: String, detail: String },

    /// Access to the type or member was refused.
    #[error("access to '{name}' denied")]
    Denied { name: String },

    /// The native callable threw or otherwise failed.
    #[error("invocation of '{member}' failed: {detail}")]
    Invocation { member: String, detail: String },
}

// ============================================================================
// Binding Errors
// ============================================================================

/// Errors raised while building proxy types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindingError {
    #[error("type '{type_name}' not found during {operation}")]
    TypeNotFound {
        type_name: String,
        operation: &'static str,
    },

    #[error("failed to link '{type_name}' during {operation}: {detail}")]
    LinkError {
        type_name: String,
        operation: &'static str,
        detail: String,
    },

    #[error("access to '{type_name}' denied during {operation}")]
    SecurityDenied {
        type_name: String,
        operation: &'static str,
    },

    /// Managed code tried to extend a type that can't be subclassed.
    #[error("cannot extend final type '{type_name}' with '{subclass}'")]
    FinalTypeExtension { type_name: String, subclass: String },
}

impl BindingError {
    /// Translate a provider failure observed while binding `type_name`.
    pub fn from_provider(err: ProviderError, type_name: &str, operation: &'static str) -> Self {
        match err {
            ProviderError::NotFound { name } => BindingError::TypeNotFound {
                type_name: name,
                operation,
            },
            ProviderError::Denied { name } => BindingError::SecurityDenied {
                type_name: name,
                operation,
            },
            ProviderError::Link { name, detail } => BindingError::LinkError {
                type_name: name,
                operation,
                detail,
            },
            ProviderError::Invocation { member, detail } => BindingError::LinkError {
                type_name: type_name.to_string(),
                operation,
                detail: format!("{}: {}", member, detail),
            },
        }
    }

    /// Name of the native type this error concerns.
    pub fn type_name(&self) -> &str {
        match self {
            BindingError::TypeNotFound { type_name, .. }
            | BindingError::LinkError { type_name, .. }
            | BindingError::SecurityDenied { type_name, .. }
            | BindingError::FinalTypeExtension { type_name, .. } => type_name,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BindingError::TypeNotFound { .. })
    }
}

// ============================================================================
// Resolution Errors
// ============================================================================

/// Errors raised while selecting a callable from an overload group.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    /// No callable accepts the supplied number of arguments.
    #[error("wrong number of arguments for {type_name}.{member} ({given} for {expected:?})")]
    ArityMismatch {
        type_name: String,
        member: String,
        given: usize,
        expected: Vec<usize>,
    },

    /// Two or more callables match equally well.
    #[error("ambiguous call to {type_name}.{member}: {candidates}")]
    Ambiguous {
        type_name: String,
        member: String,
        candidates: String,
    },

    /// Arity matched but no callable accepts the argument types.
    #[error("no {type_name}.{member} overload accepts ({arguments})")]
    NoMatch {
        type_name: String,
        member: String,
        arguments: String,
    },
}

impl ResolutionError {
    pub fn member(&self) -> &str {
        match self {
            ResolutionError::ArityMismatch { member, .. }
            | ResolutionError::Ambiguous { member, .. }
            | ResolutionError::NoMatch { member, .. } => member,
        }
    }
}

// ============================================================================
// Conversion Errors
// ============================================================================

/// Errors raised while marshalling values across the boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// A numeric value does not fit the target width.
    #[error("{value} out of range for {target}")]
    RangeOverflow { value: String, target: String },

    /// Nil passed where a primitive is required.
    #[error("cannot convert nil to primitive {target}")]
    NullToPrimitive { target: String },

    /// No conversion exists between the two types.
    #[error("cannot convert {from} to {target}: {detail}")]
    Unconvertible {
        from: String,
        target: String,
        detail: String,
    },

    /// Array element access outside the array.
    #[error("index {index} out of bounds for {target} of length {len}")]
    IndexOutOfBounds {
        index: i64,
        len: usize,
        target: String,
    },
}

impl ConversionError {
    pub fn unconvertible(from: &str, target: impl ToString, detail: impl Into<String>) -> Self {
        ConversionError::Unconvertible {
            from: from.to_string(),
            target: target.to_string(),
            detail: detail.into(),
        }
    }

    pub fn is_range_overflow(&self) -> bool {
        matches!(self, ConversionError::RangeOverflow { .. })
    }
}

/// A call argument that failed to convert, with its zero-based position.
///
/// Trailing varargs report the position of the managed argument, not of the
/// packed array parameter.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("argument {position}: {source}")]
pub struct ArgumentError {
    pub position: usize,
    pub source: ConversionError,
}

// ============================================================================
// Namespace Errors
// ============================================================================

/// Errors raised while resolving dotted paths.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NamespaceError {
    #[error("empty segment in path '{path}'")]
    EmptySegment { path: String },

    /// A primitive type name used as a package segment.
    #[error("'{name}' is a primitive type name and cannot appear under package '{package}'")]
    ReservedNameConflict { name: String, package: String },

    #[error(transparent)]
    Binding(#[from] BindingError),
}
