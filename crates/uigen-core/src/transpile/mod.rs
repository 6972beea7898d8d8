//! TSX → script transformation.
//!
//! The pipeline has four stages: strip top-level module statements,
//! wrap the component in an isolating closure that binds the runtime,
//! lower JSX into `h(...)` calls, erase type annotations. The result is
//! parse-checked before it is handed out.
//!
//! Fail-soft contract: [`transpile`] never returns an error. Any stage
//! failure degrades to a script that reports the problem at execution
//! time, so the caller's render path stays uniform.

mod erase;
mod jsx;

pub use erase::erase_types;
pub use jsx::lower_jsx;

use crate::error::TranspileError;
use regex::Regex;
use std::sync::OnceLock;

/// A runnable script produced from component source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    /// Plain script text. Always executable; on transform failure this is
    /// a degenerate script that logs the compilation error.
    pub script: String,
    /// The identifier the sandbox invokes after executing the script.
    pub entry_name: String,
}

fn import_semi_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Lazy up to the first statement-ending semicolon so a multi-line
    // import is removed without swallowing the statement after it.
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*import\b[^;]*?;[ \t]*$").expect("import pattern"))
}

fn import_bare_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*import\b[^;{}\r\n]*$").expect("bare import pattern")
    })
}

fn export_default_ref_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*export[ \t]+default[ \t]+[A-Za-z_$][A-Za-z0-9_$]*[ \t]*;?[ \t]*$")
            .expect("export default pattern")
    })
}

fn export_list_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*export[ \t]*\{[^}]*\}[ \t]*(?:from[^;\r\n]*)?;?[ \t]*$")
            .expect("export list pattern")
    })
}

fn export_decl_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^([ \t]*)export[ \t]+(?:default[ \t]+)?((?:async[ \t]+)?(?:const|let|var|function|class|interface|type)\b)",
        )
        .expect("export decl pattern")
    })
}

/// Remove top-level `import`/`export` statements. Line-anchored, so the
/// words inside string literals or mid-line positions survive. Exported
/// declarations keep their declaration, losing only the `export` prefix.
pub fn strip_module_statements(code: &str) -> String {
    let code = import_semi_pattern().replace_all(code, "");
    let code = import_bare_pattern().replace_all(&code, "");
    let code = export_default_ref_pattern().replace_all(&code, "");
    let code = export_list_pattern().replace_all(&code, "");
    let code = export_decl_pattern().replace_all(&code, "${1}${2}");
    code.into_owned()
}

/// Wrap stripped component source in an isolating closure. The runtime
/// and the stub component namespace are the only outside bindings; the
/// final assignment publishes the entry into the sandbox root scope.
fn wrap_component(code: &str, entry_name: &str, runtime_namespace: &[&str]) -> String {
    let mut script = String::with_capacity(code.len() + 256);
    script.push_str("(function () {\n");
    script.push_str("const React = __runtime__;\n");
    script.push_str("const h = __runtime__.createElement;\n");
    script.push_str("const Fragment = __runtime__.Fragment;\n");
    script.push_str("const useState = __runtime__.useState;\n");
    script.push_str("const useEffect = __runtime__.useEffect;\n");
    for key in runtime_namespace {
        script.push_str("const ");
        script.push_str(key);
        script.push_str(" = __components__.");
        script.push_str(key);
        script.push_str(";\n");
    }
    script.push_str(code);
    script.push_str("\n__entry__ = ");
    script.push_str(entry_name);
    script.push_str(";\n})();\n");
    script
}

fn compile(
    code: &str,
    entry_name: &str,
    runtime_namespace: &[&str],
) -> Result<String, TranspileError> {
    let stripped = strip_module_statements(code);
    let wrapped = wrap_component(&stripped, entry_name, runtime_namespace);
    let lowered = lower_jsx(&wrapped)?;
    let erased = erase_types(&lowered)?;
    crate::script::parse_check(&erased)
        .map_err(|err| TranspileError::new(err.message))?;
    Ok(erased)
}

fn error_script(message: &str) -> String {
    let mut escaped = String::with_capacity(message.len());
    for c in message.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    format!("console.error(\"Compilation error: {escaped}\");")
}

/// Transform component source into a runnable script.
///
/// `runtime_namespace` lists the stub component names the script may
/// reference (each becomes a local binding pulled from `__components__`).
/// Never fails: a transform or parse error yields a script that logs the
/// error, after which the renderer reports the unbound entry.
pub fn transpile(code: &str, entry_name: &str, runtime_namespace: &[&str]) -> CompiledArtifact {
    let script = match compile(code, entry_name, runtime_namespace) {
        Ok(script) => script,
        Err(err) => {
            tracing::warn!(error = %err, entry = entry_name, "transform failed");
            error_script(&err.message)
        }
    };
    CompiledArtifact {
        script,
        entry_name: entry_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_imports_and_export_default() {
        let code = "import React from \"react\";\nimport { useState } from \"react\";\nfunction App() { return null; }\nexport default App;";
        let out = strip_module_statements(code);
        assert!(!out.contains("import"));
        assert!(!out.contains("export"));
        assert!(out.contains("function App()"));
    }

    #[test]
    fn strips_multiline_import_without_eating_next_statement() {
        let code = "import {\n  Card,\n  Button\n} from \"./ui\";\nconst x = 1;";
        let out = strip_module_statements(code);
        assert!(!out.contains("Card,"));
        assert!(out.contains("const x = 1;"));
    }

    #[test]
    fn exported_declaration_keeps_declaration() {
        let code = "export const App = () => null;\nexport default function Main() {}";
        let out = strip_module_statements(code);
        assert!(out.contains("const App = () => null;"));
        assert!(out.contains("function Main() {}"));
        assert!(!out.contains("export"));
    }

    #[test]
    fn import_inside_string_survives() {
        let code = "const s = \"import nothing\";";
        assert_eq!(strip_module_statements(code), code);
    }

    #[test]
    fn wraps_with_runtime_and_namespace_bindings() {
        let out = wrap_component("function App() {}", "App", &["Card", "Button"]);
        assert!(out.starts_with("(function () {\n"));
        assert!(out.contains("const h = __runtime__.createElement;\n"));
        assert!(out.contains("const Card = __components__.Card;\n"));
        assert!(out.contains("const Button = __components__.Button;\n"));
        assert!(out.contains("\n__entry__ = App;\n"));
        assert!(out.trim_end().ends_with("})();"));
    }

    #[test]
    fn transpiles_a_component_end_to_end() {
        let code = "import React from \"react\";\n\ninterface Props { title: string; }\n\nfunction Hello({ title }: Props) {\n  return <div className=\"p-4\">{title}</div>;\n}\n\nexport default Hello;";
        let artifact = transpile(code, "Hello", &[]);
        assert_eq!(artifact.entry_name, "Hello");
        assert!(artifact.script.contains("h(\"div\", { \"className\": \"p-4\" }, title)"));
        assert!(artifact.script.contains("__entry__ = Hello;"));
        assert!(!artifact.script.contains("interface"));
        assert!(!artifact.script.contains(": Props"));
    }

    #[test]
    fn transform_failure_degrades_to_error_script() {
        let artifact = transpile("function Broken() { return <div>; }", "Broken", &[]);
        assert!(artifact.script.starts_with("console.error(\"Compilation error: "));
    }

    #[test]
    fn pathological_nesting_degrades_to_error_script() {
        let parens = format!(
            "function App() {{ return {}1{}; }}",
            "(".repeat(2_000),
            ")".repeat(2_000)
        );
        let artifact = transpile(&parens, "App", &[]);
        assert!(artifact.script.starts_with("console.error(\"Compilation error: "));

        let elements = format!(
            "function App() {{ return {}x{}; }}",
            "<div>".repeat(2_000),
            "</div>".repeat(2_000)
        );
        let artifact = transpile(&elements, "App", &[]);
        assert!(artifact.script.starts_with("console.error(\"Compilation error: "));
    }

    #[test]
    fn error_script_escapes_quotes() {
        let script = error_script("bad \"thing\"\nhappened");
        assert_eq!(
            script,
            "console.error(\"Compilation error: bad \\\"thing\\\"\\nhappened\");"
        );
    }
}
