//! Conversation session driving the generate / preview cycle.
//!
//! A session owns the chat transcript, the version ledger, and the
//! current preview. One generation runs at a time: the `is_generating`
//! gate rejects a second request instead of queueing it, because a
//! later prompt usually supersedes the one in flight.

use crate::bridge::SyncBridge;
use crate::client::{GenerationClient, NetworkError};
use crate::document::synthesize_document;
use crate::render::LocalSandbox;
use crate::styles::synthesize_styles;
use uigen_core::{entry_name_or_default, extract, transpile, RenderResult, VersionLedger};

use crate::render::DEFAULT_COMPONENT_NS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub text: String,
    pub sender: Sender,
}

/// Where the current cycle stands, for progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePhase {
    #[default]
    Idle,
    Extracting,
    Transpiling,
    Rendering,
    Rendered,
    Errored,
}

/// The rendered output of one cycle.
#[derive(Debug, Clone)]
pub struct Preview {
    pub code: String,
    pub css: String,
    pub html: String,
    pub tree: RenderResult,
}

pub struct Session {
    client: GenerationClient,
    bridge: SyncBridge,
    sandbox: LocalSandbox,
    ledger: VersionLedger,
    messages: Vec<Message>,
    next_message_id: u64,
    phase: CyclePhase,
    is_generating: bool,
    preview: Option<Preview>,
    /// Natural-language description of the current component, refreshed
    /// after each generate and sent along with quick-improve requests.
    description: String,
}

impl Session {
    pub fn new(client: GenerationClient) -> Self {
        Self {
            bridge: SyncBridge::new(client.clone()),
            client,
            sandbox: LocalSandbox::new(),
            ledger: VersionLedger::new(),
            messages: Vec::new(),
            next_message_id: 0,
            phase: CyclePhase::Idle,
            is_generating: false,
            preview: None,
            description: String::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn is_generating(&self) -> bool {
        self.is_generating
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn ledger(&self) -> &VersionLedger {
        &self.ledger
    }

    /// Run a full generate cycle for `prompt`. Returns `false` without
    /// side effects when a generation is already in flight.
    pub async fn generate(&mut self, prompt: &str) -> bool {
        if self.is_generating {
            tracing::debug!("generation already in flight, prompt dropped");
            return false;
        }
        self.is_generating = true;
        self.push_message(Sender::User, prompt);

        match self.client.generate(prompt).await {
            Ok(response) => {
                self.apply_response(&response);
                // Best-effort: the description only feeds later
                // quick-improve calls, so a miss keeps the old one.
                match self.client.generate_description(prompt).await {
                    Ok(description) => self.description = description,
                    Err(err) => {
                        tracing::debug!(error = %err, "description request failed")
                    }
                }
            }
            Err(err) => self.fail_network(&err),
        }
        self.is_generating = false;
        true
    }

    /// One-shot refinement of the current component: its source and the
    /// stored description travel with the requested modification. The
    /// improved code lands as a new ledger version, so the pre-improve
    /// state stays restorable.
    pub async fn quick_improve(&mut self, modification: &str) -> bool {
        if self.is_generating {
            tracing::debug!("generation already in flight, improve dropped");
            return false;
        }
        let Some(code) = self.preview.as_ref().map(|p| p.code.clone()) else {
            self.push_message(
                Sender::Assistant,
                "There is no component to improve yet. Generate one first.",
            );
            return true;
        };
        self.is_generating = true;
        self.push_message(Sender::User, modification);

        match self
            .client
            .quick_improve(&code, &self.description, modification)
            .await
        {
            Ok(response) => self.apply_response(&response),
            Err(err) => self.fail_network(&err),
        }
        self.is_generating = false;
        true
    }

    /// Apply a manual edit: re-render locally and push the code to the
    /// live preview channel. Edits never record a ledger version; only
    /// completed generate and improve cycles do. Returns the sequence
    /// number stamped on the push.
    pub fn edit(&mut self, code: &str) -> u64 {
        let seq = self.bridge.push(code);
        let preview = self.compose_preview(code);
        self.phase = if preview.tree.is_ok() {
            CyclePhase::Rendered
        } else {
            CyclePhase::Errored
        };
        self.preview = Some(preview);
        seq
    }

    /// Restore an earlier version by id and re-render it locally.
    pub fn restore(&mut self, version_id: &str) -> Result<(), uigen_core::LedgerError> {
        let code = self.ledger.select(version_id)?.to_string();
        self.preview = Some(self.compose_preview(&code));
        self.phase = match &self.preview {
            Some(p) if p.tree.is_ok() => CyclePhase::Rendered,
            _ => CyclePhase::Errored,
        };
        Ok(())
    }

    fn apply_response(&mut self, response: &str) {
        self.phase = CyclePhase::Extracting;
        let extracted = extract(response);
        if !extracted.commentary.is_empty() {
            let commentary = extracted.commentary.clone();
            self.push_message(Sender::Assistant, &commentary);
        }

        let preview = self.compose_preview(&extracted.code);
        self.ledger.append(&extracted.code);
        self.phase = if preview.tree.is_ok() {
            CyclePhase::Rendered
        } else {
            CyclePhase::Errored
        };
        self.preview = Some(preview);
    }

    fn compose_preview(&mut self, code: &str) -> Preview {
        self.phase = CyclePhase::Transpiling;
        let entry = entry_name_or_default(code);
        let artifact = transpile(code, &entry, DEFAULT_COMPONENT_NS);

        self.phase = CyclePhase::Rendering;
        let css = synthesize_styles(&[code, &artifact.script]);
        let html = synthesize_document(&artifact, &css);
        let tree = self.sandbox.render(&artifact);
        if let Err(err) = &tree {
            tracing::warn!(error = %err, "preview render failed");
        }
        Preview {
            code: code.to_string(),
            css,
            html,
            tree,
        }
    }

    fn fail_network(&mut self, err: &NetworkError) {
        tracing::warn!(error = %err, "generation request failed");
        let text = err.user_message();
        self.push_message(Sender::Assistant, &text);
        self.phase = CyclePhase::Errored;
    }

    fn push_message(&mut self, sender: Sender, text: &str) {
        self.next_message_id += 1;
        self.messages.push(Message {
            id: self.next_message_id,
            text: text.to_string(),
            sender,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session() -> Session {
        // Port 1 is never listening; network paths fail fast if hit.
        let client = GenerationClient::new("http://127.0.0.1:1").unwrap();
        Session::new(client)
    }

    fn rendered_response() -> String {
        "Here is a card.\n\n```tsx\nfunction App() {\n  return <div className=\"p-4\">Card</div>;\n}\n```\n"
            .to_string()
    }

    #[test]
    fn applying_a_response_renders_and_records_a_version() {
        let mut s = session();
        s.apply_response(&rendered_response());

        assert_eq!(s.phase(), CyclePhase::Rendered);
        assert_eq!(s.ledger().len(), 1);
        let preview = s.preview().unwrap();
        assert!(preview.tree.is_ok());
        assert!(preview.html.contains("__entry__ = App;"));
        assert!(preview.css.contains(".p-4{"));
        // Commentary became an assistant message.
        assert_eq!(s.messages().len(), 1);
        assert_eq!(s.messages()[0].sender, Sender::Assistant);
        assert!(s.messages()[0].text.contains("Here is a card."));
    }

    #[test]
    fn a_broken_component_still_records_a_version() {
        let mut s = session();
        s.apply_response("```tsx\nfunction App() { return <div>; }\n```");

        assert_eq!(s.phase(), CyclePhase::Errored);
        assert_eq!(s.ledger().len(), 1);
        assert!(s.preview().unwrap().tree.is_err());
    }

    #[test]
    fn restore_re_renders_an_older_version() {
        let mut s = session();
        s.apply_response(&rendered_response());
        let first_id = s.ledger().current().unwrap().id.clone();
        s.apply_response(
            "```tsx\nfunction App() { return <span>v2</span>; }\n```",
        );
        assert_eq!(s.ledger().len(), 2);

        s.restore(&first_id).unwrap();
        let preview = s.preview().unwrap();
        assert!(preview.code.contains("Card"));
        assert_eq!(s.phase(), CyclePhase::Rendered);
        assert_eq!(s.ledger().current_position(), Some(1));
    }

    #[test]
    fn restoring_an_unknown_version_is_an_error() {
        let mut s = session();
        s.apply_response(&rendered_response());
        assert!(s.restore("missing").is_err());
        // Preview untouched by the failed restore.
        assert!(s.preview().unwrap().tree.is_ok());
    }

    #[tokio::test]
    async fn edits_re_render_without_recording_a_version() {
        let mut s = session();
        s.apply_response(&rendered_response());
        assert_eq!(s.ledger().len(), 1);

        let seq = s.edit("function App() { return <b>edited</b>; }");
        assert_eq!(seq, 1);
        assert_eq!(s.ledger().len(), 1);
        let preview = s.preview().unwrap();
        assert!(preview.tree.is_ok());
        assert!(preview.code.contains("edited"));
    }

    #[tokio::test]
    async fn the_generating_gate_rejects_concurrent_prompts() {
        let mut s = session();
        s.is_generating = true;
        assert!(!s.generate("second prompt").await);
        assert!(s.messages().is_empty());
    }

    #[tokio::test]
    async fn improving_without_a_component_explains_itself() {
        let mut s = session();
        assert!(s.quick_improve("make it blue").await);
        assert_eq!(s.ledger().len(), 0);
        assert!(!s.is_generating());
        assert_eq!(s.messages().len(), 1);
        assert_eq!(s.messages()[0].sender, Sender::Assistant);
        assert!(s.messages()[0].text.contains("no component"));
    }

    #[tokio::test]
    async fn improve_failures_become_assistant_messages() {
        let mut s = session();
        s.apply_response(&rendered_response());
        let before = s.messages().len();

        assert!(s.quick_improve("make it blue").await);
        assert_eq!(s.phase(), CyclePhase::Errored);
        assert!(!s.is_generating());
        // The modification plus the failure explanation.
        assert_eq!(s.messages().len(), before + 2);
        // No version was appended by the failed improve.
        assert_eq!(s.ledger().len(), 1);
    }

    #[test]
    fn timeouts_become_chat_messages_without_a_version() {
        let mut s = session();
        s.fail_network(&NetworkError::Timeout);

        assert_eq!(s.phase(), CyclePhase::Errored);
        assert_eq!(s.ledger().len(), 0);
        let last = s.messages().last().unwrap();
        assert_eq!(last.sender, Sender::Assistant);
        assert!(last.text.contains("took too long"), "{}", last.text);
    }

    #[tokio::test]
    async fn network_failures_become_assistant_messages() {
        let mut s = session();
        let started = s.generate("make a card").await;
        assert!(started);
        assert_eq!(s.phase(), CyclePhase::Errored);
        assert!(!s.is_generating());
        // User prompt plus the failure explanation.
        assert_eq!(s.messages().len(), 2);
        assert_eq!(s.messages()[1].sender, Sender::Assistant);
    }
}
