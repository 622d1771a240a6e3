//! Unified engine error.

use crossbind_core::{ArgumentError, BindingError, ConversionError, NamespaceError, ResolutionError};
use thiserror::Error;

use crate::config::ConfigError;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Any failure surfaced by [`Engine`](crate::Engine) operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Namespace(#[from] NamespaceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The proxy type has no member by that name.
    #[error("{type_name} has no {kind} '{member}'")]
    UnknownMember {
        type_name: String,
        member: String,
        kind: &'static str,
    },

    /// A managed argument could not be converted for a native call.
    #[error("cannot {operation} {type_name}.{member}: argument {position}: {source}")]
    Argument {
        type_name: String,
        member: String,
        operation: &'static str,
        position: usize,
        source: ConversionError,
    },

    #[error("cannot assign final field {type_name}.{field}")]
    FinalField { type_name: String, field: String },

    /// The native side failed while running a callable or accessing a field.
    #[error("{type_name}.{member} failed: {detail}")]
    Invocation {
        type_name: String,
        member: String,
        detail: String,
    },
}

impl EngineError {
    pub fn unknown_member(type_name: &str, member: &str, kind: &'static str) -> Self {
        EngineError::UnknownMember {
            type_name: type_name.to_string(),
            member: member.to_string(),
            kind,
        }
    }

    pub fn argument(type_name: &str, member: &str, operation: &'static str, err: ArgumentError) -> Self {
        EngineError::Argument {
            type_name: type_name.to_string(),
            member: member.to_string(),
            operation,
            position: err.position,
            source: err.source,
        }
    }

    /// The conversion failure behind this error, if there is one.
    pub fn conversion(&self) -> Option<&ConversionError> {
        match self {
            EngineError::Conversion(err) | EngineError::Argument { source: err, .. } => Some(err),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            EngineError::Binding(err) => err.is_not_found(),
            EngineError::Namespace(NamespaceError::Binding(err)) => err.is_not_found(),
            EngineError::UnknownMember { .. } => true,
            _ => false,
        }
    }
}
