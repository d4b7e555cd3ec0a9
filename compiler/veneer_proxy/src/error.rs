//! Generation-time and call-time errors.
//!
//! `ProxyError` covers everything that can go wrong while building or
//! instantiating a proxy type; a generation attempt that fails never leaves a
//! partial proxy behind. `CallError` covers a single intercepted call.
//! Interceptors and targets raise `CallError`s themselves and the dispatch
//! layer hands them back untouched.

use std::sync::Arc;

use veneer_ir::{AccessorKind, RegistryError, ValueType};

/// Failure while building, caching or instantiating a proxy type.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProxyError {
    /// The requested shape is malformed or inconsistent.
    #[error("invalid proxy template: {reason}")]
    InvalidTemplate { reason: String },

    /// A member's accessor shape cannot be represented.
    #[error("cannot intercept {kind} `{member}`: {reason}")]
    UnsupportedMember {
        member: String,
        kind: &'static str,
        reason: String,
    },

    /// An emission primitive failed.
    #[error("type emission failed: {reason}")]
    BackendFailure { reason: String },

    /// Two different shapes produced the same cache key.
    #[error("cache key collision: requested `{requested}`, cached proxy was built for `{cached}`")]
    CacheKeyCollision { requested: String, cached: String },

    /// No constructor of the generated type accepts the given arguments.
    #[error("no constructor of `{type_name}` accepts {arity} argument(s) of the given types")]
    NoMatchingConstructor { type_name: String, arity: usize },
}

impl ProxyError {
    pub(crate) fn invalid_template(reason: impl Into<String>) -> Self {
        ProxyError::InvalidTemplate {
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(
        member: impl Into<String>,
        kind: AccessorKind,
        reason: impl Into<String>,
    ) -> Self {
        ProxyError::UnsupportedMember {
            member: member.into(),
            kind: kind.as_str(),
            reason: reason.into(),
        }
    }
}

impl From<RegistryError> for ProxyError {
    fn from(err: RegistryError) -> Self {
        ProxyError::invalid_template(err.to_string())
    }
}

/// Failure of one proxied call.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CallError {
    #[error("`{member}` expects {expected} argument(s), found {found}")]
    ArgumentCount {
        member: String,
        expected: usize,
        found: usize,
    },

    #[error("argument {index} of `{member}` expects {expected}, found {found}")]
    ArgumentType {
        member: String,
        index: usize,
        expected: ValueType,
        found: ValueType,
    },

    /// The chain fell through to the target but the proxy has none.
    #[error("`{member}` reached the end of the interceptor chain but the proxy has no target")]
    NoTarget { member: String },

    /// A non-unit member finished without producing a value.
    #[error("`{member}` returned no value (expected {expected})")]
    MissingReturnValue { member: String, expected: ValueType },

    #[error("`{member}` returned {found}, expected {expected}")]
    ReturnType {
        member: String,
        expected: ValueType,
        found: ValueType,
    },

    /// The generated type has no such member.
    #[error("proxy type has no {kind} `{member}`")]
    UnknownMember { member: String, kind: &'static str },

    /// Raised by an interceptor or a target.
    #[error("{0}")]
    Raised(Arc<str>),
}

impl CallError {
    /// Error for interceptors and targets to raise.
    pub fn raised(message: impl Into<Arc<str>>) -> Self {
        CallError::Raised(message.into())
    }
}
