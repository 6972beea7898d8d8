//! JSX lowering.
//!
//! Rewrites JSX syntax in source text into plain `h(type, props, ...children)`
//! calls against the injected element constructor. Intrinsic (lowercase)
//! tags become string literals, capitalized tags stay identifiers, and
//! `<>…</>` becomes `h(Fragment, null, …)`.
//!
//! The rewriter is a character state machine, not a full parser: strings,
//! template literals, and comments are copied verbatim, and a `<` is
//! treated as JSX only where an expression may begin. This mirrors how
//! the comment stripper distinguishes `/` contexts.

use crate::error::TranspileError;

/// Keywords after which an expression (and therefore JSX) may begin.
const EXPR_KEYWORDS: &[&str] = &[
    "return", "default", "do", "else", "typeof", "case", "in", "of", "yield", "await", "new",
    "void", "delete", "instanceof", "throw",
];

/// Element nesting cap. Elements recurse once per level, and braced
/// children re-enter the rewriter, so unbounded nesting in generated
/// input must become a transform error instead of exhausting the stack.
const MAX_NESTING_DEPTH: usize = 200;

/// Lower all JSX in `source` to element-constructor calls.
pub fn lower_jsx(source: &str) -> Result<String, TranspileError> {
    lower_nested(source, 0)
}

fn lower_nested(source: &str, depth: usize) -> Result<String, TranspileError> {
    Rewriter::new(source, depth).run()
}

enum PropOut {
    Pair(String, String),
    Spread(String),
}

struct Rewriter {
    src: Vec<char>,
    pos: usize,
    out: String,
    /// True when a `<` at the current position would start an expression.
    jsx_ok: bool,
    /// Current element nesting level, carried across re-entrant lowering
    /// of braced children.
    depth: usize,
}

impl Rewriter {
    fn new(source: &str, depth: usize) -> Self {
        Self {
            src: source.chars().collect(),
            pos: 0,
            out: String::with_capacity(source.len()),
            jsx_ok: true,
            depth,
        }
    }

    fn run(mut self) -> Result<String, TranspileError> {
        while let Some(c) = self.peek() {
            match c {
                '"' | '\'' => {
                    self.copy_quoted(c)?;
                    self.jsx_ok = false;
                }
                '`' => {
                    self.copy_template()?;
                    self.jsx_ok = false;
                }
                '/' if self.peek_at(1) == Some('/') => self.copy_line_comment(),
                '/' if self.peek_at(1) == Some('*') => self.copy_block_comment()?,
                _ if c.is_whitespace() => {
                    self.bump_copy();
                }
                _ if is_ident_start(c) => {
                    let word = self.read_word();
                    self.jsx_ok = EXPR_KEYWORDS.contains(&word.as_str());
                    self.out.push_str(&word);
                }
                _ if c.is_ascii_digit() => {
                    while let Some(d) = self.peek() {
                        if d.is_ascii_alphanumeric() || d == '.' {
                            self.bump_copy();
                        } else {
                            break;
                        }
                    }
                    self.jsx_ok = false;
                }
                '<' if self.jsx_ok && self.next_starts_element() => {
                    let lowered = self.parse_element()?;
                    self.out.push_str(&lowered);
                    self.jsx_ok = false;
                }
                _ => {
                    self.bump_copy();
                    self.jsx_ok = !matches!(c, ')' | ']');
                }
            }
        }
        Ok(self.out)
    }

    // === element parsing ===

    fn parse_element(&mut self) -> Result<String, TranspileError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(TranspileError::new("element nesting too deep"));
        }
        let lowered = self.parse_element_inner();
        self.depth -= 1;
        lowered
    }

    fn parse_element_inner(&mut self) -> Result<String, TranspileError> {
        self.expect('<')?;
        self.skip_ws();
        let tag = if self.peek() == Some('>') {
            String::new()
        } else {
            self.read_tag_name()?
        };

        let mut props: Vec<PropOut> = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(TranspileError::new(format!("unterminated element <{tag}>"))),
                Some('/') => {
                    self.bump();
                    self.expect('>')?;
                    return Ok(emit_call(&tag, &props, &[]));
                }
                Some('>') => {
                    self.bump();
                    break;
                }
                Some('{') => {
                    let inner = self.read_braced()?;
                    let inner = inner.trim();
                    if let Some(rest) = inner.strip_prefix("...") {
                        props.push(PropOut::Spread(lower_nested(rest, self.depth)?));
                    } else if !inner.is_empty() {
                        return Err(TranspileError::new(format!(
                            "unexpected expression in attribute position of <{tag}>"
                        )));
                    }
                }
                Some(c) if is_ident_start(c) => {
                    let name = self.read_attr_name();
                    self.skip_ws();
                    let value = if self.peek() == Some('=') {
                        self.bump();
                        self.skip_ws();
                        match self.peek() {
                            Some(q @ ('"' | '\'')) => escape_js_string(&self.read_quoted_raw(q)?),
                            Some('{') => {
                                let inner = self.read_braced()?;
                                lower_nested(inner.trim(), self.depth)?
                            }
                            _ => {
                                return Err(TranspileError::new(format!(
                                    "invalid value for attribute '{name}'"
                                )));
                            }
                        }
                    } else {
                        "true".to_string()
                    };
                    props.push(PropOut::Pair(name, value));
                }
                Some(c) => {
                    return Err(TranspileError::new(format!(
                        "unexpected character '{c}' in <{tag}>"
                    )));
                }
            }
        }

        let mut children: Vec<String> = Vec::new();
        loop {
            if self.pos >= self.src.len() {
                return Err(TranspileError::new(format!("missing closing tag for <{tag}>")));
            }
            if self.peek() == Some('<') && self.peek_at(1) == Some('/') {
                self.bump();
                self.bump();
                self.skip_ws();
                let close = if self.peek() == Some('>') {
                    String::new()
                } else {
                    self.read_tag_name()?
                };
                self.skip_ws();
                self.expect('>')?;
                if close != tag {
                    return Err(TranspileError::new(format!(
                        "mismatched closing tag: expected </{tag}>, found </{close}>"
                    )));
                }
                break;
            }
            match self.peek() {
                Some('<') => {
                    let nested = self.parse_element()?;
                    children.push(nested);
                }
                Some('{') => {
                    let inner = self.read_braced()?;
                    let trimmed = inner.trim();
                    if !trimmed.is_empty() && !is_jsx_comment(trimmed) {
                        children.push(lower_nested(trimmed, self.depth)?);
                    }
                }
                _ => {
                    let text = self.read_jsx_text();
                    if let Some(literal) = jsx_text_literal(&text) {
                        children.push(literal);
                    }
                }
            }
        }

        Ok(emit_call(&tag, &props, &children))
    }

    fn next_starts_element(&self) -> bool {
        let mut i = self.pos + 1;
        while i < self.src.len() && self.src[i].is_whitespace() {
            i += 1;
        }
        match self.src.get(i) {
            Some(&c) => is_ident_start(c) || c == '>',
            None => false,
        }
    }

    fn read_tag_name(&mut self) -> Result<String, TranspileError> {
        let mut name = String::new();
        match self.peek() {
            Some(c) if is_ident_start(c) => {}
            _ => return Err(TranspileError::new("expected element name")),
        }
        while let Some(c) = self.peek() {
            if is_ident_part(c) || c == '.' || c == '-' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Ok(name)
    }

    fn read_attr_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_ident_part(c) || c == '-' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        name
    }

    /// Raw text run between tags, ending at `<` or `{`.
    fn read_jsx_text(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '<' || c == '{' {
                break;
            }
            text.push(c);
            self.bump();
        }
        text
    }

    /// Consume a balanced `{ … }` group and return the inner text,
    /// respecting nested braces, strings, templates, and comments.
    fn read_braced(&mut self) -> Result<String, TranspileError> {
        self.expect('{')?;
        let mut depth = 1usize;
        let mut inner = String::new();
        while let Some(c) = self.peek() {
            match c {
                '{' => {
                    depth += 1;
                    inner.push(c);
                    self.bump();
                }
                '}' => {
                    depth -= 1;
                    self.bump();
                    if depth == 0 {
                        return Ok(inner);
                    }
                    inner.push(c);
                }
                '"' | '\'' | '`' => {
                    inner.push_str(&self.take_quoted(c)?);
                }
                '/' if self.peek_at(1) == Some('*') => {
                    inner.push_str(&self.take_block_comment()?);
                }
                _ => {
                    inner.push(c);
                    self.bump();
                }
            }
        }
        Err(TranspileError::new("unterminated expression block"))
    }

    // === verbatim copying ===

    fn copy_quoted(&mut self, quote: char) -> Result<(), TranspileError> {
        let taken = self.take_quoted(quote)?;
        self.out.push_str(&taken);
        Ok(())
    }

    fn take_quoted(&mut self, quote: char) -> Result<String, TranspileError> {
        let mut taken = String::new();
        taken.push(quote);
        self.bump();
        let mut escaped = false;
        while let Some(c) = self.peek() {
            taken.push(c);
            self.bump();
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                return Ok(taken);
            }
        }
        Err(TranspileError::new("unterminated string literal"))
    }

    /// Cooked contents of a quoted string (common escapes resolved).
    fn read_quoted_raw(&mut self, quote: char) -> Result<String, TranspileError> {
        self.expect(quote)?;
        let mut value = String::new();
        while let Some(c) = self.peek() {
            self.bump();
            if c == '\\' {
                match self.peek() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(other) => value.push(other),
                    None => break,
                }
                self.bump();
            } else if c == quote {
                return Ok(value);
            } else {
                value.push(c);
            }
        }
        Err(TranspileError::new("unterminated string literal"))
    }

    fn copy_template(&mut self) -> Result<(), TranspileError> {
        self.bump_copy();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.bump_copy();
                if self.peek().is_some() {
                    self.bump_copy();
                }
                continue;
            }
            if c == '`' {
                self.bump_copy();
                return Ok(());
            }
            self.bump_copy();
        }
        Err(TranspileError::new("unterminated template literal"))
    }

    fn copy_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            self.bump_copy();
            if c == '\n' {
                break;
            }
        }
    }

    fn copy_block_comment(&mut self) -> Result<(), TranspileError> {
        let taken = self.take_block_comment()?;
        self.out.push_str(&taken);
        Ok(())
    }

    fn take_block_comment(&mut self) -> Result<String, TranspileError> {
        let mut taken = String::new();
        taken.push('/');
        taken.push('*');
        self.bump();
        self.bump();
        let mut star = false;
        while let Some(c) = self.peek() {
            taken.push(c);
            self.bump();
            if star && c == '/' {
                return Ok(taken);
            }
            star = c == '*';
        }
        Err(TranspileError::new("unterminated block comment"))
    }

    // === low-level cursor ===

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn bump_copy(&mut self) {
        if let Some(c) = self.peek() {
            self.out.push(c);
            self.pos += 1;
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if is_ident_part(c) {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        word
    }

    fn expect(&mut self, expected: char) -> Result<(), TranspileError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(TranspileError::new(format!(
                "expected '{expected}', found '{c}'"
            ))),
            None => Err(TranspileError::new(format!(
                "expected '{expected}', found end of input"
            ))),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn emit_call(tag: &str, props: &[PropOut], children: &[String]) -> String {
    let tag_expr = if tag.is_empty() {
        "Fragment".to_string()
    } else if tag.chars().next().is_some_and(|c| c.is_ascii_lowercase()) || tag.contains('-') {
        escape_js_string(tag)
    } else {
        tag.to_string()
    };

    let props_expr = if props.is_empty() {
        "null".to_string()
    } else {
        let entries: Vec<String> = props
            .iter()
            .map(|p| match p {
                PropOut::Pair(name, value) => format!("{}: {value}", escape_js_string(name)),
                PropOut::Spread(expr) => format!("...({expr})"),
            })
            .collect();
        format!("{{ {} }}", entries.join(", "))
    };

    let mut call = format!("h({tag_expr}, {props_expr}");
    for child in children {
        call.push_str(", ");
        call.push_str(child);
    }
    call.push(')');
    call
}

fn is_jsx_comment(expr: &str) -> bool {
    expr.starts_with("/*") && expr.ends_with("*/")
}

/// Collapse a JSX text run into a string literal the way JSX semantics
/// do: per-line trimming, blank lines dropped, survivors joined with a
/// single space. `None` when only whitespace remains.
fn jsx_text_literal(text: &str) -> Option<String> {
    let joined = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        return None;
    }
    Some(escape_js_string(&decode_entities(&joined)))
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{a0}")
}

/// Double-quoted JS string literal for `value`.
fn escape_js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lowers_simple_element() {
        let out = lower_jsx("return <div>Hi</div>;").unwrap();
        assert_eq!(out, "return h(\"div\", null, \"Hi\");");
    }

    #[test]
    fn lowers_attributes_and_expressions() {
        let out = lower_jsx(r#"return <button className="btn" onClick={() => go(1)}>Go</button>;"#)
            .unwrap();
        assert_eq!(
            out,
            "return h(\"button\", { \"className\": \"btn\", \"onClick\": () => go(1) }, \"Go\");"
        );
    }

    #[test]
    fn lowers_component_and_member_tags() {
        let out = lower_jsx("return <Grid.Column width=\"50%\"><Card/></Grid.Column>;").unwrap();
        assert_eq!(
            out,
            "return h(Grid.Column, { \"width\": \"50%\" }, h(Card, null));"
        );
    }

    #[test]
    fn lowers_fragment() {
        let out = lower_jsx("return <><span>a</span><span>b</span></>;").unwrap();
        assert_eq!(
            out,
            "return h(Fragment, null, h(\"span\", null, \"a\"), h(\"span\", null, \"b\"));"
        );
    }

    #[test]
    fn nested_jsx_inside_expression_child() {
        let out = lower_jsx("return <ul>{items.map(item => <li>{item}</li>)}</ul>;").unwrap();
        assert_eq!(
            out,
            "return h(\"ul\", null, items.map(item => h(\"li\", null, item)));"
        );
    }

    #[test]
    fn boolean_and_spread_attributes() {
        let out = lower_jsx("return <input disabled {...rest} />;").unwrap();
        assert_eq!(
            out,
            "return h(\"input\", { \"disabled\": true, ...(rest) });"
        );
    }

    #[test]
    fn comparison_operator_is_not_jsx() {
        let out = lower_jsx("const less = a < b;").unwrap();
        assert_eq!(out, "const less = a < b;");
    }

    #[test]
    fn jsx_comment_child_is_dropped() {
        let out = lower_jsx("return <div>{/* note */}text</div>;").unwrap();
        assert_eq!(out, "return h(\"div\", null, \"text\");");
    }

    #[test]
    fn text_whitespace_collapses() {
        let out = lower_jsx("return <p>\n  hello\n  world\n</p>;").unwrap();
        assert_eq!(out, "return h(\"p\", null, \"hello world\");");
    }

    #[test]
    fn mismatched_close_tag_errors() {
        let err = lower_jsx("return <div>x</span>;").unwrap_err();
        assert!(err.message.contains("mismatched closing tag"));
    }

    #[test]
    fn pathological_element_nesting_is_an_error() {
        let src = format!(
            "return {}x{};",
            "<div>".repeat(2_000),
            "</div>".repeat(2_000)
        );
        let err = lower_jsx(&src).unwrap_err();
        assert!(err.message.contains("nesting too deep"), "{}", err.message);
    }

    #[test]
    fn string_contents_are_untouched() {
        let out = lower_jsx("const s = \"<div>not jsx</div>\";").unwrap();
        assert_eq!(out, "const s = \"<div>not jsx</div>\";");
    }
}
