//! Source extraction from model responses.
//!
//! A generation response is free text that may interleave prose with one
//! or more fenced code blocks. Extraction isolates the first block tagged
//! with a recognized dialect (or untagged) as the component source and
//! keeps the remaining prose as assistant commentary. There is no failure
//! mode: a response without a usable fence is treated as all code.

use crate::resolve::entry_name_or_default;
use regex::Regex;
use std::sync::OnceLock;

/// Dialect labels accepted on a fence. Untagged fences are accepted too.
const ACCEPTED_DIALECTS: &[&str] = &["tsx", "typescript", "ts", "jsx", "javascript", "js"];

/// A component isolated from a larger response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedComponent {
    /// Trimmed source text: the fenced block contents, or the whole
    /// response when no recognized fence exists.
    pub code: String,
    /// Resolved entry identifier, falling back to the sentinel default.
    pub entry_name: String,
    /// Prose outside the matched fence, trimmed. Empty when the response
    /// was code only.
    pub commentary: String,
}

fn fence_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?ms)^```([A-Za-z0-9+#-]*)[ \t]*\r?\n(.*?)^```[ \t]*$").expect("fence pattern")
    })
}

/// Isolate component source from a model response.
///
/// Scans for fenced blocks in order and takes the first one whose label
/// is a recognized source dialect (or empty). Blocks labeled as some
/// other language are skipped. When nothing matches, the entire response
/// becomes the code and the commentary is empty.
pub fn extract(response: &str) -> ExtractedComponent {
    for caps in fence_pattern().captures_iter(response) {
        let label = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        if !label.is_empty() && !ACCEPTED_DIALECTS.contains(&label.to_ascii_lowercase().as_str()) {
            continue;
        }

        let code = caps
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        let whole = caps.get(0).expect("capture 0 always present");
        let mut commentary = String::with_capacity(response.len() - whole.as_str().len());
        commentary.push_str(&response[..whole.start()]);
        commentary.push_str(&response[whole.end()..]);
        let commentary = commentary.trim().to_string();

        let entry_name = entry_name_or_default(&code);
        return ExtractedComponent {
            code,
            entry_name,
            commentary,
        };
    }

    let code = response.trim().to_string();
    let entry_name = entry_name_or_default(&code);
    ExtractedComponent {
        code,
        entry_name,
        commentary: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_tsx_fence_and_commentary() {
        let response = "Here is your component:\n```tsx\nfunction Hello() {\n  return <div>Hi</div>;\n}\n```\nLet me know if you want changes.";
        let out = extract(response);
        assert_eq!(out.code, "function Hello() {\n  return <div>Hi</div>;\n}");
        assert_eq!(out.entry_name, "Hello");
        assert_eq!(
            out.commentary,
            "Here is your component:\n\nLet me know if you want changes."
        );
    }

    #[test]
    fn untagged_fence_is_accepted() {
        let response = "```\nconst App = () => <span>ok</span>;\n```";
        let out = extract(response);
        assert_eq!(out.code, "const App = () => <span>ok</span>;");
        assert_eq!(out.entry_name, "App");
    }

    #[test]
    fn foreign_language_fence_is_skipped() {
        let response = "Setup:\n```bash\nnpm install\n```\n```tsx\nfunction App() { return <div/>; }\n```";
        let out = extract(response);
        assert!(out.code.starts_with("function App()"));
        assert!(out.commentary.contains("npm install"));
    }

    #[test]
    fn no_fence_means_whole_response_is_code() {
        let response = "  Sorry, I cannot help.  ";
        let out = extract(response);
        assert_eq!(out.code, "Sorry, I cannot help.");
        assert_eq!(out.commentary, "");
        assert_eq!(out.entry_name, crate::resolve::DEFAULT_ENTRY_NAME);
    }

    #[test]
    fn extraction_is_idempotent_without_fence() {
        let response = "plain text, no code at all";
        let once = extract(response);
        let twice = extract(&once.code);
        assert_eq!(once.code, twice.code);
    }
}
