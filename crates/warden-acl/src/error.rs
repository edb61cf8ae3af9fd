//! Access definition and evaluation error types.
//!
//! Every failure raised while declaring resources and roles or while building
//! an ACL from an expression is an [`AccessError`]. A denied access check is
//! not an error: grant evaluation returns `bool`. [`AccessError::AccessDenied`]
//! exists for adapters that want to turn a denial into a failure value.

use std::fmt;

/// Result alias used throughout the crate.
pub type AccessResult<T> = Result<T, AccessError>;

/// Errors raised by the registry, the expression builder and the ACL algebra.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// A declaration is invalid: empty, reserved or colliding name, or a
    /// resource declared without actions.
    #[error("Access invalid - {message}")]
    Definition {
        /// Description of the invalid declaration.
        message: String,
    },

    /// A definition was attempted after the registry was locked.
    #[error("Access invalid - definitions are locked")]
    DefinitionLocked,

    /// A name was used as a resource but is not defined as one.
    #[error("Access invalid - '{name}' is not a valid resource")]
    UndefinedResource {
        /// The unknown resource name.
        name: String,
    },

    /// An action is not defined for the resource it was combined with.
    #[error("Access invalid - action '{action}' not defined for resource '{resource}'")]
    UndefinedAction {
        /// The resource the action was looked up on.
        resource: String,
        /// The unknown action name.
        action: String,
    },

    /// A name was used as a role but is not defined as one.
    #[error("Access invalid - '{name}' is not a valid role")]
    UndefinedRole {
        /// The unknown role name.
        name: String,
    },

    /// A textual expression contains a token that names nothing.
    #[error("Access invalid - '{token}' not defined")]
    UnknownToken {
        /// The offending token.
        token: String,
    },

    /// Tokens arrived in an order the expression builder cannot accept.
    #[error("Access invalid - {message}")]
    Sequence {
        /// Description of the illegal transition.
        message: String,
    },

    /// A role references itself directly or through other roles.
    #[error("Access invalid - role '{role}' references itself through {path}")]
    CyclicRole {
        /// The role being compiled.
        role: String,
        /// The chain of role references that closes the cycle.
        path: String,
    },

    /// An ACL was used both as a required and as a granted ACL.
    #[error("Access invalid - {message}")]
    InvariantViolation {
        /// Description of the violated invariant.
        message: String,
    },

    /// Access was denied. Carries the status an adapter should answer with.
    #[error("Access denied")]
    AccessDenied {
        /// Suggested transport status (typically 401, 403 or 404).
        status: u16,
    },
}

impl AccessError {
    /// Creates a new `Definition` error.
    #[must_use]
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition {
            message: message.into(),
        }
    }

    /// Creates a new `UndefinedResource` error.
    #[must_use]
    pub fn undefined_resource(name: impl Into<String>) -> Self {
        Self::UndefinedResource { name: name.into() }
    }

    /// Creates a new `UndefinedAction` error.
    #[must_use]
    pub fn undefined_action(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self::UndefinedAction {
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// Creates a new `UndefinedRole` error.
    #[must_use]
    pub fn undefined_role(name: impl Into<String>) -> Self {
        Self::UndefinedRole { name: name.into() }
    }

    /// Creates a new `UnknownToken` error.
    #[must_use]
    pub fn unknown_token(token: impl Into<String>) -> Self {
        Self::UnknownToken {
            token: token.into(),
        }
    }

    /// Creates a new `Sequence` error.
    #[must_use]
    pub fn sequence(message: impl Into<String>) -> Self {
        Self::Sequence {
            message: message.into(),
        }
    }

    /// Creates a new `CyclicRole` error.
    #[must_use]
    pub fn cyclic_role(role: impl Into<String>, path: impl Into<String>) -> Self {
        Self::CyclicRole {
            role: role.into(),
            path: path.into(),
        }
    }

    /// Creates a new `InvariantViolation` error.
    #[must_use]
    pub fn invariant_violation(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Creates a new `AccessDenied` error.
    #[must_use]
    pub fn denied(status: u16) -> Self {
        Self::AccessDenied { status }
    }

    /// Returns `true` for errors raised while declaring access.
    #[must_use]
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::Definition { .. } | Self::DefinitionLocked | Self::CyclicRole { .. }
        )
    }

    /// Returns `true` for errors raised while building an ACL from tokens.
    #[must_use]
    pub fn is_expression_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownToken { .. }
                | Self::Sequence { .. }
                | Self::UndefinedResource { .. }
                | Self::UndefinedAction { .. }
                | Self::UndefinedRole { .. }
        )
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Definition { .. } => ErrorCategory::Definition,
            Self::DefinitionLocked => ErrorCategory::Definition,
            Self::CyclicRole { .. } => ErrorCategory::Definition,
            Self::UndefinedResource { .. } => ErrorCategory::Reference,
            Self::UndefinedAction { .. } => ErrorCategory::Reference,
            Self::UndefinedRole { .. } => ErrorCategory::Reference,
            Self::UnknownToken { .. } => ErrorCategory::Expression,
            Self::Sequence { .. } => ErrorCategory::Expression,
            Self::InvariantViolation { .. } => ErrorCategory::Internal,
            Self::AccessDenied { .. } => ErrorCategory::Authorization,
        }
    }

    /// Returns the transport status an adapter should report for this error.
    ///
    /// Malformed declarations and expressions are programming errors and map
    /// to 500. Denials carry their own status.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::AccessDenied { status } => *status,
            _ => 500,
        }
    }
}

/// Categories of access errors for logging and adapter mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Invalid or late declarations.
    Definition,
    /// References to undefined resources, actions or roles.
    Reference,
    /// Malformed token sequences.
    Expression,
    /// Broken internal invariants.
    Internal,
    /// Denied access.
    Authorization,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Definition => write!(f, "definition"),
            Self::Reference => write!(f, "reference"),
            Self::Expression => write!(f, "expression"),
            Self::Internal => write!(f, "internal"),
            Self::Authorization => write!(f, "authorization"),
        }
    }
}
