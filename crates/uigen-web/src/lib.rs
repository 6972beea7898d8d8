//! uigen web crate.
//!
//! Everything between the compile pipeline and a browser tab:
//!
//! - `styles`: utility-class stylesheet synthesis for generated code.
//! - `document`: standalone preview document assembly.
//! - `render`: local interpreter sandbox and the remote sandbox client.
//! - `client`: HTTP client for the generation backend.
//! - `bridge`: fire-and-forget live sync with stale-push filtering.
//! - `session`: the conversation loop tying generation, versioning, and
//!   preview together.

pub mod bridge;
pub mod client;
pub mod document;
pub mod render;
pub mod session;
pub mod styles;

pub use bridge::{SeqGuard, SyncBridge};
pub use client::{GenerationClient, NetworkError, PreviewUpdate};
pub use document::{synthesize_document, synthesize_document_titled, PREVIEW_RUNTIME_JS};
pub use render::{
    LocalSandbox, PreviewConfig, PreviewStrategy, RemoteSandbox, DEFAULT_COMPONENT_NS,
};
pub use session::{CyclePhase, Message, Preview, Sender, Session};
pub use styles::synthesize_styles;
