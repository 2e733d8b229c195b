//! Error types reported by the console engine and the discovery scanner.

use thiserror::Error;

/// A text token could not be converted to the requested kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert '{raw}' to {kind}")]
pub struct CoercionError {
    /// Display name of the target kind, e.g. `integer` or `vector3`.
    pub kind: String,
    /// The offending text exactly as it was typed.
    pub raw: String,
}

impl CoercionError {
    pub fn new(kind: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            raw: raw.into(),
        }
    }
}

/// Everything that can go wrong between a raw input line and the host.
///
/// None of these ever escape [`Console::execute`](crate::Console::execute) as a
/// panic or an `Err`: they are logged and returned inside
/// [`Outcome::Failed`](crate::Outcome::Failed).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsoleError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Variable '{0}' is read-only")]
    ReadOnlyVariable(String),

    #[error("Command '{command}' expects {expected} parameters, got {actual}")]
    ArityMismatch {
        command: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error("Error executing command '{command}': {message}")]
    Invocation { command: String, message: String },

    /// The variable exists but its storage could not be reached.
    #[error("Failed to access variable '{name}': {message}")]
    VariableAccess { name: String, message: String },

    /// Some types of a module failed to load; the rest were scanned.
    #[error("Partial failure scanning module {module}: {message}")]
    PartialDiscoveryFailure { module: String, message: String },

    /// A whole module could not be scanned and was skipped.
    #[error("Error scanning module {module}: {message}")]
    ModuleScanFailure { module: String, message: String },

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("console session has ended")]
    SessionEnded,
}

impl From<regex::Error> for ConsoleError {
    fn from(err: regex::Error) -> Self {
        ConsoleError::InvalidPattern(err.to_string())
    }
}
