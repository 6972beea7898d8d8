use serde::{Deserialize, Serialize};
use thiserror::Error;

/// TSX → script transform failure.
///
/// Callers of [`crate::transpile::transpile`] never see this directly:
/// the transpiler converts it into a script that reports the failure at
/// execution time. It is public so the transform stages can use `?`.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct TranspileError {
    pub message: String,
}

impl TranspileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error raised while executing a compiled script: reference errors,
/// type errors, and explicit throws from user-authored logic.
///
/// Carries a synthesized call stack (innermost frame first) so the
/// renderer can show where the failure happened.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ScriptError {
    pub message: String,
    #[serde(default)]
    pub stack: Vec<String>,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: Vec::new(),
        }
    }

    /// Reference-class error: an identifier that is not bound in scope.
    pub fn reference(name: &str) -> Self {
        Self::new(format!("ReferenceError: {name} is not defined"))
    }

    /// Type-class error: an operation applied to an unsuitable value.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(format!("TypeError: {}", message.into()))
    }

    pub fn push_frame(&mut self, frame: impl Into<String>) {
        self.stack.push(frame.into());
    }

    /// Render the stack the way browsers print one, or `None` when the
    /// failure happened before any frame was entered.
    pub fn stack_trace(&self) -> Option<String> {
        if self.stack.is_empty() {
            return None;
        }
        Some(
            self.stack
                .iter()
                .map(|frame| format!("    at {frame}"))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}

/// Version ledger lookup failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("version not found: {0}")]
    NotFound(String),
}
