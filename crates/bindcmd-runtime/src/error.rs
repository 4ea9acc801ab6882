use futures::task::SpawnError;
use thiserror::Error;

/// Boxed failure returned by an execution callback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, CommandError>;

/// Why a guard expression could not be analysed into a single dependency.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("guard must be a single property read, found {found} in `{expression}`")]
    InvalidExpressionShape {
        found: &'static str,
        expression: String,
    },

    #[error("property `{property}` is static; guards must read an instance property")]
    NotAnInstanceMember { property: String },

    #[error("property `{property}` is read from {base}, not from a captured instance")]
    UnsupportedExpressionBase {
        property: String,
        base: &'static str,
    },

    #[error("property `{property}` is declared on {expected} but the captured owner is {found}")]
    OwnerTypeMismatch {
        property: String,
        expected: &'static str,
        found: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command `{command}` has no execution callback")]
    MissingExecutionCallback { command: String },

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error("command `{command}` cannot execute in its current state")]
    NotExecutable { command: String },

    #[error("execution callback failed: {0}")]
    Handler(#[source] BoxError),

    #[error("failed to spawn command execution: {0}")]
    Spawn(#[from] SpawnError),
}

impl CommandError {
    /// The expression analysis failure, if this is one.
    #[must_use]
    pub fn as_expression(&self) -> Option<&ExpressionError> {
        match self {
            Self::Expression(err) => Some(err),
            _ => None,
        }
    }
}
