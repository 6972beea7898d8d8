//! Sandboxed execution of compiled component scripts.
//!
//! Split the way a small language core splits: `parser` (lexer + AST),
//! `value` (runtime values and scopes), `interp` (the evaluator with
//! its injected capabilities).

pub mod interp;
pub mod parser;
pub mod value;

pub use interp::{ConsoleEntry, ConsoleLevel, Interpreter, FRAGMENT_TAG};
pub use value::{NativeFunction, ObjectData, Scope, Value};

use crate::error::ScriptError;

/// Syntax-check a script without executing it. The transpiler uses this
/// to decide whether to fall back to an error-reporting script.
pub fn parse_check(source: &str) -> Result<(), ScriptError> {
    parser::parse_program(source).map(|_| ())
}
