//! Sandboxed rendering of compiled artifacts.
//!
//! [`LocalSandbox`] runs the script in the in-process interpreter and
//! rebuilds the published element tree; [`RemoteSandbox`] ships the
//! original source to an external sandbox service and hands back a
//! hosted preview URL. [`PreviewConfig`] picks between them.

use crate::client::NetworkError;
use serde_json::json;
use std::time::Duration;
use uigen_core::script::{NativeFunction, ObjectData, Value};
use uigen_core::{dom, CompiledArtifact, Interpreter, RenderError, RenderResult, ScriptError};

/// Stub component names made available to generated code. Each renders
/// as an element carrying its own name as the tag, so a component that
/// leans on a design-system import still produces a visible tree.
pub const DEFAULT_COMPONENT_NS: &[&str] = &["Card", "Button", "Input", "Badge", "Avatar", "Alert"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewStrategy {
    #[default]
    Local,
    Remote,
}

#[derive(Debug, Clone, Default)]
pub struct PreviewConfig {
    pub strategy: PreviewStrategy,
}

/// In-process sandbox. Every render starts from a fresh interpreter so
/// state from a previous version cannot leak into the next one.
#[derive(Debug, Default)]
pub struct LocalSandbox;

impl LocalSandbox {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, artifact: &CompiledArtifact) -> RenderResult {
        let mut interp = Interpreter::new();
        install_component_stubs(&mut interp);

        if let Err(err) = interp.run(&artifact.script) {
            return Err(script_error_to_render(err));
        }

        let entry = interp.global("__entry__");
        if !matches!(entry, Value::Function(_) | Value::Native(_)) {
            let message = interp.last_console_error().unwrap_or_else(|| {
                format!(
                    "ReferenceError: {} is not defined",
                    artifact.entry_name
                )
            });
            return Err(RenderError::new(message));
        }

        let tree = match interp.call(&entry, &[]) {
            Ok(value) => value,
            Err(err) => return Err(script_error_to_render(err)),
        };

        let Some(json) = tree.to_json() else {
            return Err(RenderError::new(
                "component returned a value that cannot be rendered",
            ));
        };
        dom::rebuild(&json)
    }
}

fn script_error_to_render(err: ScriptError) -> RenderError {
    let stack = err.stack_trace();
    RenderError::with_stack(err.message, stack)
}

/// Bind the stub component namespace into `__components__` so compiled
/// scripts can destructure them. Each stub publishes a plain node whose
/// tag is the component name and whose props pass through.
fn install_component_stubs(interp: &mut Interpreter) {
    let components = match interp.global("__components__") {
        Value::Object(existing) => Value::Object(existing),
        _ => Value::object(ObjectData::new()),
    };
    if let Value::Object(data) = &components {
        for name in DEFAULT_COMPONENT_NS {
            let tag = name.to_string();
            let stub = NativeFunction::value(tag.clone(), move |_interp, args| {
                let props = args.first().cloned().unwrap_or(Value::Undefined);
                let children = match &props {
                    Value::Object(obj) => obj.borrow().get("children").unwrap_or(Value::Undefined),
                    _ => Value::Undefined,
                };
                let mut node = ObjectData::new();
                node.set("type", Value::string(tag.clone()));
                node.set("props", props);
                node.set("children", children);
                Ok(Value::object(node))
            });
            data.borrow_mut().set(*name, stub);
        }
    }
    interp.define_global("__components__", components);
}

/// Sandbox service client. Posts the component as a small multi-file
/// project and returns the hosted preview URL.
#[derive(Debug, Clone)]
pub struct RemoteSandbox {
    http: reqwest::Client,
    define_url: String,
    preview_host: String,
}

impl RemoteSandbox {
    pub const DEFAULT_DEFINE_URL: &'static str =
        "https://codesandbox.io/api/v1/sandboxes/define?json=1";
    pub const DEFAULT_PREVIEW_HOST: &'static str = "csb.app";

    pub fn new() -> Result<Self, NetworkError> {
        Self::with_endpoint(Self::DEFAULT_DEFINE_URL, Self::DEFAULT_PREVIEW_HOST)
    }

    pub fn with_endpoint(define_url: &str, preview_host: &str) -> Result<Self, NetworkError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| NetworkError::Client(e.to_string()))?;
        Ok(Self {
            http,
            define_url: define_url.to_string(),
            preview_host: preview_host.to_string(),
        })
    }

    /// Upload `code` as an App.tsx project and return the preview URL.
    pub async fn render(&self, code: &str) -> Result<String, NetworkError> {
        let body = project_payload(code);
        let response = self
            .http
            .post(&self.define_url)
            .json(&body)
            .send()
            .await
            .map_err(NetworkError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NetworkError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| NetworkError::Client(e.to_string()))?;
        let sandbox_id = parsed
            .get("sandbox_id")
            .and_then(|v| v.as_str())
            .ok_or(NetworkError::NoResponse)?;
        Ok(format!("https://{}.{}/", sandbox_id, self.preview_host))
    }
}

fn project_payload(code: &str) -> serde_json::Value {
    json!({
        "files": {
            "package.json": {
                "content": {
                    "dependencies": {
                        "react": "^18.0.0",
                        "react-dom": "^18.0.0"
                    },
                    "main": "index.tsx"
                }
            },
            "App.tsx": { "content": code },
            "index.tsx": {
                "content": "import React from \"react\";\nimport { createRoot } from \"react-dom/client\";\nimport \"./styles.css\";\nimport App from \"./App\";\n\ncreateRoot(document.getElementById(\"root\")!).render(<App />);\n"
            },
            "styles.css": {
                "content": "@tailwind base;\n@tailwind components;\n@tailwind utilities;\n"
            },
            "index.html": {
                "content": "<!DOCTYPE html>\n<html>\n<body>\n<div id=\"root\"></div>\n</body>\n</html>\n"
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use uigen_core::{transpile, NodeChild};

    fn render_source(source: &str, entry: &str) -> RenderResult {
        let artifact = transpile(source, entry, DEFAULT_COMPONENT_NS);
        LocalSandbox::new().render(&artifact)
    }

    #[test]
    fn renders_a_simple_component_tree() {
        let tree = render_source(
            "function App() { return <div className=\"p-4\"><h1>Hello</h1></div>; }",
            "App",
        )
        .unwrap();
        assert_eq!(tree.tag, "div");
        assert_eq!(tree.attr("className"), Some("p-4"));
        assert_eq!(tree.text_content(), "Hello");
    }

    #[test]
    fn hooks_render_with_their_initial_state() {
        let tree = render_source(
            "function Counter() {\n  const [count, setCount] = useState(3);\n  return <span>{count}</span>;\n}",
            "Counter",
        )
        .unwrap();
        assert_eq!(tree.text_content(), "3");
    }

    #[test]
    fn design_system_stubs_render_as_named_tags() {
        let tree = render_source(
            "function App() { return <Card title=\"x\"><Button>Go</Button></Card>; }",
            "App",
        )
        .unwrap();
        assert_eq!(tree.tag, "Card");
        assert_eq!(tree.attr("title"), Some("x"));
        match &tree.children[0] {
            NodeChild::Node(button) => {
                assert_eq!(button.tag, "Button");
                assert_eq!(button.text_content(), "Go");
            }
            other => panic!("expected a Button node, got {other:?}"),
        }
    }

    #[test]
    fn compilation_failures_surface_the_logged_error() {
        // An unclosed tag fails the transform; the fail-soft script logs
        // it and the sandbox reports it instead of a tree.
        let err = render_source("function App() { return <div>; }", "App").unwrap_err();
        assert!(err.message.contains("Compilation error:"), "{}", err.message);
    }

    #[test]
    fn a_missing_entry_is_a_reference_error() {
        let err = render_source("const x = 1;", "App").unwrap_err();
        assert!(err.message.contains("App is not defined"), "{}", err.message);
    }

    #[test]
    fn runtime_throws_carry_a_stack() {
        let err = render_source(
            "function boom() { throw new Error(\"nope\"); }\nfunction App() { return boom(); }",
            "App",
        )
        .unwrap_err();
        assert!(err.message.contains("nope"), "{}", err.message);
        assert!(err.stack.is_some());
    }

    #[test]
    fn renders_are_isolated_between_calls() {
        let artifact = transpile(
            "let hits = 0;\nfunction App() {\n  hits = hits + 1;\n  return <span>{hits}</span>;\n}",
            "App",
            &[],
        );
        let sandbox = LocalSandbox::new();
        let first = sandbox.render(&artifact).unwrap();
        let second = sandbox.render(&artifact).unwrap();
        assert_eq!(first.text_content(), "1");
        assert_eq!(second.text_content(), "1");
    }

    #[test]
    fn project_payload_carries_the_component_source() {
        let payload = project_payload("export default function App() {}");
        let app = payload["files"]["App.tsx"]["content"].as_str().unwrap();
        assert!(app.contains("export default function App"));
        assert!(payload["files"]["package.json"]["content"]["dependencies"]["react"].is_string());
    }
}
