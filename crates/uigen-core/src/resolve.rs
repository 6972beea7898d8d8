//! Entry identifier resolution.
//!
//! Finds the name of the component the pipeline should invoke after
//! transformation. This is deliberately textual pattern matching rather
//! than a parse: model output is usually well-formed, and the renderer
//! re-checks that the resolved name is actually bound after execution,
//! so a false match on lookalike text degrades to a precise reference
//! error instead of a wrong render.

use regex::Regex;
use std::sync::OnceLock;

/// Sentinel entry name used when no declaration pattern matches.
pub const DEFAULT_ENTRY_NAME: &str = "Interface";

fn function_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"function\s+([A-Za-z_$][A-Za-z0-9_$]*)").expect("function pattern")
    })
}

fn class_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"class\s+([A-Za-z_$][A-Za-z0-9_$]*)").expect("class pattern"))
}

fn const_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // A const bound to an arrow or function expression, tolerating a
        // type annotation between the name and the `=`.
        Regex::new(
            r"(?s)const\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*(?::[^=\n]+)?=\s*(?:async\s+)?(?:function\b|\(.*?\)\s*=>|[A-Za-z_$][A-Za-z0-9_$]*\s*=>)",
        )
        .expect("const pattern")
    })
}

/// Resolve the entry identifier from raw source text, in priority order:
/// named function declaration, named class declaration, const bound to a
/// function-like expression. `None` when nothing matches.
pub fn resolve_entry_name(code: &str) -> Option<String> {
    for pattern in [function_pattern(), class_pattern(), const_pattern()] {
        if let Some(caps) = pattern.captures(code) {
            if let Some(name) = caps.get(1) {
                return Some(name.as_str().to_string());
            }
        }
    }
    None
}

/// Resolve the entry identifier, falling back to [`DEFAULT_ENTRY_NAME`].
pub fn entry_name_or_default(code: &str) -> String {
    resolve_entry_name(code).unwrap_or_else(|| DEFAULT_ENTRY_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_function_declaration() {
        assert_eq!(
            resolve_entry_name("function Foo() { return null; }"),
            Some("Foo".to_string())
        );
    }

    #[test]
    fn resolves_class_declaration() {
        assert_eq!(
            resolve_entry_name("class Panel extends Component {}"),
            Some("Panel".to_string())
        );
    }

    #[test]
    fn resolves_const_arrow() {
        assert_eq!(
            resolve_entry_name("const Bar = () => <div/>;"),
            Some("Bar".to_string())
        );
        assert_eq!(
            resolve_entry_name("const Baz = (props: Props) =>\n  <div/>;"),
            Some("Baz".to_string())
        );
        assert_eq!(
            resolve_entry_name("const Typed: React.FC = () => null;"),
            Some("Typed".to_string())
        );
    }

    #[test]
    fn function_wins_over_const() {
        let code = "const helper = () => 1;\nfunction Main() { return helper(); }";
        assert_eq!(resolve_entry_name(code), Some("Main".to_string()));
    }

    #[test]
    fn falls_back_to_sentinel() {
        assert_eq!(resolve_entry_name("just some prose"), None);
        assert_eq!(entry_name_or_default("just some prose"), DEFAULT_ENTRY_NAME);
    }

    #[test]
    fn const_without_function_value_does_not_match() {
        assert_eq!(resolve_entry_name("const items = [1, 2, 3];"), None);
    }
}
