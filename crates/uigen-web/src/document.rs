//! Preview document synthesis.
//!
//! Assembles a complete standalone HTML document around a compiled
//! artifact: synthesized stylesheet in the head, a `#root` mount point,
//! the browser runtime, and the artifact script last so the runtime
//! globals exist before it runs.

use uigen_core::CompiledArtifact;

pub const PREVIEW_RUNTIME_JS: &str = include_str!("preview-runtime.js");

const DEFAULT_TITLE: &str = "Preview";

/// Build the full preview document for an artifact and its stylesheet.
pub fn synthesize_document(artifact: &CompiledArtifact, css: &str) -> String {
    synthesize_document_titled(artifact, css, DEFAULT_TITLE)
}

pub fn synthesize_document_titled(artifact: &CompiledArtifact, css: &str, title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n\
         <style>{css}</style>\n\
         </head>\n\
         <body>\n\
         <div id=\"root\"></div>\n\
         <script>{runtime}</script>\n\
         <script>{script}\n__uigenMount();</script>\n\
         </body>\n\
         </html>\n",
        title = escape_html(title),
        css = css,
        runtime = PREVIEW_RUNTIME_JS,
        script = sanitize_script(&artifact.script),
    )
}

/// Keep an inline script from terminating its own tag.
fn sanitize_script(script: &str) -> String {
    script.replace("</script", "<\\/script")
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use uigen_core::transpile;

    fn artifact() -> CompiledArtifact {
        transpile(
            "function App() { return <div className=\"p-4\">hi</div>; }",
            "App",
            &[],
        )
    }

    #[test]
    fn document_contains_styles_runtime_and_script() {
        let html = synthesize_document(&artifact(), ".p-4{padding:1rem;}");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<style>.p-4{padding:1rem;}</style>"));
        assert!(html.contains("<div id=\"root\"></div>"));
        assert!(html.contains("window.__runtime__"));
        assert!(html.contains("__entry__ = App;"));
        assert!(html.contains("__uigenMount();"));
    }

    #[test]
    fn runtime_loads_before_the_artifact_script() {
        let html = synthesize_document(&artifact(), "");
        let runtime = html.find("window.__runtime__").unwrap();
        let script = html.find("__entry__ = App;").unwrap();
        assert!(runtime < script);
    }

    #[test]
    fn inline_script_cannot_close_its_own_tag() {
        let a = CompiledArtifact {
            script: "var x = \"</script><script>alert(1)\";".to_string(),
            entry_name: "App".to_string(),
        };
        let html = synthesize_document(&a, "");
        assert!(!html.contains("</script><script>alert(1)"));
        assert!(html.contains("<\\/script>"));
    }

    #[test]
    fn title_is_escaped() {
        let html = synthesize_document_titled(&artifact(), "", "<b>hi</b>");
        assert!(html.contains("<title>&lt;b&gt;hi&lt;/b&gt;</title>"));
    }

    #[test]
    fn escape_html_covers_the_usual_metacharacters() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
