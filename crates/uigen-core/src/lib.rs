//! uigen core crate.
//!
//! This crate separates the compile-and-render pipeline into layers:
//!
//! - `extract`: pulls one component's source out of a larger model response.
//! - `resolve`: finds the renderable entry identifier in raw source text.
//! - `transpile`: TSX → plain script (import/export stripping, type erasure,
//!   JSX lowering) with a fail-soft error policy.
//! - `script`: lexer + parser + tree-walking interpreter for the emitted
//!   script subset, with capability-scoped builtins.
//! - `dom`: framework-neutral serialized element tree and the JSON
//!   round-trip that rebuilds it from executed output.
//! - `ledger`: append-only version history with a movable current pointer.
//!
//! The critical design rule is that nothing in the pipeline aborts the
//! host: extraction always succeeds, transpilation defers its failures to
//! execution time, and execution failures are values, not panics.

pub mod dom;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod resolve;
pub mod script;
pub mod transpile;

pub use dom::{NodeChild, RenderError, RenderResult, SerializedNode};
pub use error::{LedgerError, ScriptError, TranspileError};
pub use extract::{extract, ExtractedComponent};
pub use ledger::{Version, VersionLedger};
pub use resolve::{entry_name_or_default, resolve_entry_name, DEFAULT_ENTRY_NAME};
pub use script::{Interpreter, Value};
pub use transpile::{transpile, CompiledArtifact};
