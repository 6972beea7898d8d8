//! Stylesheet synthesis for generated components.
//!
//! Scans code fragments for class attribute string literals, compiles
//! each utility token through [`tw`], and assembles one deduplicated
//! stylesheet on top of a small base reset. Unknown tokens are skipped,
//! never fatal: a stylesheet missing a rule degrades visually, a failed
//! synthesis would take the whole preview down.

pub mod tw;

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn class_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // className="..." / class='...' in source or compiled output,
        // including the quoted form the transpiler emits for object keys.
        Regex::new(r#"(?:"className"|className|class)\s*[:=]\s*("(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*')"#)
            .expect("class attribute pattern")
    })
}

/// Collect every utility token mentioned in class attribute literals
/// across the given fragments, in first-seen order.
pub fn collect_class_tokens(fragments: &[&str]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();
    for fragment in fragments {
        for capture in class_attr_regex().captures_iter(fragment) {
            let Some(quoted) = capture.get(1) else {
                continue;
            };
            let literal = quoted.as_str();
            let inner = &literal[1..literal.len() - 1];
            for token in inner.split_whitespace() {
                if seen.insert(token.to_string()) {
                    tokens.push(token.to_string());
                }
            }
        }
    }
    tokens
}

/// Build a complete stylesheet for the given code fragments.
///
/// Rules are ordered base-first, then by breakpoint, so responsive
/// variants override their base counterparts regardless of the order
/// tokens appear in the source.
pub fn synthesize_styles(fragments: &[&str]) -> String {
    let tokens = collect_class_tokens(fragments);

    let mut compiled: Vec<(u8, String)> = Vec::new();
    for token in &tokens {
        match tw::token_rule(token) {
            Some(css) => compiled.push((tw::responsive_rank(token), css)),
            None => tracing::debug!(token, "skipping unrecognized class token"),
        }
    }
    compiled.sort_by_key(|(rank, _)| *rank);

    let mut out = String::from(BASE_RESET);
    for (_, css) in compiled {
        out.push_str(&css);
        out.push('\n');
    }
    out
}

/// Minimal reset applied under every preview document.
const BASE_RESET: &str = "\
*,*::before,*::after{box-sizing:border-box;border-width:0;border-style:solid;border-color:#e5e7eb;}
html{line-height:1.5;-webkit-text-size-adjust:100%;}
body{margin:0;font-family:Inter,system-ui,-apple-system,sans-serif;color:#111827;background-color:#ffffff;}
h1,h2,h3,h4,h5,h6,p,figure,blockquote{margin:0;}
button,input,select,textarea{font:inherit;color:inherit;margin:0;}
button{background-color:transparent;background-image:none;cursor:pointer;}
img,svg,video{display:block;max-width:100%;}
a{color:inherit;text-decoration:inherit;}
";

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn collects_tokens_from_jsx_and_compiled_forms() {
        let jsx = r#"<div className="p-4 text-center">"#;
        let compiled = r#"h("span", { "className": "bg-blue-500" })"#;
        let tokens = collect_class_tokens(&[jsx, compiled]);
        assert_eq!(tokens, vec!["p-4", "text-center", "bg-blue-500"]);
    }

    #[test]
    fn duplicate_tokens_appear_once() {
        let tokens = collect_class_tokens(&[
            r#"className="p-4 p-4""#,
            r#"className="p-4 m-2""#,
        ]);
        assert_eq!(tokens, vec!["p-4", "m-2"]);
    }

    #[test]
    fn stylesheet_starts_with_the_reset_and_contains_rules() {
        let css = synthesize_styles(&[r#"className="p-4 bg-blue-500""#]);
        assert!(css.starts_with("*,*::before"));
        assert!(css.contains(".p-4{padding:1rem;}"));
        assert!(css.contains(".bg-blue-500{background-color:#3b82f6;}"));
    }

    #[test]
    fn responsive_rules_come_after_base_rules() {
        let css = synthesize_styles(&[r#"className="md:p-8 p-4""#]);
        let base = css.find(".p-4{").unwrap();
        let responsive = css.find("@media (min-width: 768px)").unwrap();
        assert!(base < responsive);
    }

    #[test]
    fn unknown_tokens_are_skipped_silently() {
        let css = synthesize_styles(&[r#"className="p-4 custom-widget""#]);
        assert!(css.contains(".p-4{"));
        assert!(!css.contains("custom-widget"));
    }

    #[test]
    fn single_quoted_attributes_are_scanned() {
        let tokens = collect_class_tokens(&[r#"class='flex items-center'"#]);
        assert_eq!(tokens, vec!["flex", "items-center"]);
    }
}
