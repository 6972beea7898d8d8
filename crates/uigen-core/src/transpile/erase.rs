//! Type-annotation erasure.
//!
//! Removes TypeScript-only syntax from already-JSX-lowered source so the
//! result is a plain script: `interface`/`type` declarations, parameter
//! and variable annotations, return annotations, `as` casts, generic
//! argument lists on calls, and non-null `!` suffixes.
//!
//! Like the JSX rewriter this is a character state machine, not a type
//! checker. It runs after JSX lowering, so former JSX text lives inside
//! string literals and is copied verbatim.

use crate::error::TranspileError;

pub fn erase_types(source: &str) -> Result<String, TranspileError> {
    Eraser::new(source).run()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DeclState {
    None,
    /// Just saw `const`/`let`/`var`, next identifier is the binding.
    AwaitIdent,
    /// Saw the binding identifier, a `:` here is an annotation.
    AwaitColon,
}

struct Paren {
    params: bool,
    brace_depth: i32,
    bracket_depth: i32,
}

struct Eraser {
    src: Vec<char>,
    pos: usize,
    out: String,
    parens: Vec<Paren>,
    last_sig: Option<char>,
    after_function: bool,
    decl: DeclState,
    /// Bracket nesting inside a declaration's binding pattern. A `:` at
    /// depth zero is an annotation; deeper it is an object-pattern rename.
    decl_depth: i32,
}

impl Eraser {
    fn new(source: &str) -> Self {
        Self {
            src: source.chars().collect(),
            pos: 0,
            out: String::with_capacity(source.len()),
            parens: Vec::new(),
            last_sig: None,
            after_function: false,
            decl: DeclState::None,
            decl_depth: 0,
        }
    }

    fn run(mut self) -> Result<String, TranspileError> {
        while let Some(c) = self.peek() {
            match c {
                '"' | '\'' | '`' => {
                    let taken = self.take_quoted(c)?;
                    self.out.push_str(&taken);
                    self.note_sig('"');
                }
                '/' if self.peek_at(1) == Some('/') => {
                    while let Some(k) = self.peek() {
                        self.bump_copy();
                        if k == '\n' {
                            break;
                        }
                    }
                }
                '/' if self.peek_at(1) == Some('*') => {
                    let taken = self.take_block_comment()?;
                    self.out.push_str(&taken);
                }
                _ if c.is_whitespace() => self.bump_copy(),
                _ if is_ident_start(c) => self.handle_word()?,
                '(' => {
                    let params = self.after_function || self.arrow_params_ahead()?;
                    self.parens.push(Paren {
                        params,
                        brace_depth: 0,
                        bracket_depth: 0,
                    });
                    self.bump_copy();
                    self.note_sig('(');
                    self.after_function = false;
                }
                ')' => {
                    let closed = self.parens.pop();
                    self.bump_copy();
                    self.note_sig(')');
                    if closed.is_some_and(|p| p.params) {
                        self.skip_return_annotation()?;
                    }
                }
                '{' => {
                    if let Some(top) = self.parens.last_mut() {
                        top.brace_depth += 1;
                    }
                    if self.decl != DeclState::None {
                        self.decl_depth += 1;
                    }
                    self.bump_copy();
                    self.note_sig('{');
                }
                '}' => {
                    if let Some(top) = self.parens.last_mut() {
                        top.brace_depth -= 1;
                    }
                    if self.decl != DeclState::None && self.decl_depth > 0 {
                        self.decl_depth -= 1;
                    }
                    self.bump_copy();
                    self.note_sig('}');
                }
                '[' => {
                    if let Some(top) = self.parens.last_mut() {
                        top.bracket_depth += 1;
                    }
                    if self.decl != DeclState::None {
                        self.decl_depth += 1;
                    }
                    self.bump_copy();
                    self.note_sig('[');
                }
                ']' => {
                    if let Some(top) = self.parens.last_mut() {
                        top.bracket_depth -= 1;
                    }
                    if self.decl != DeclState::None && self.decl_depth > 0 {
                        self.decl_depth -= 1;
                    }
                    self.bump_copy();
                    self.note_sig(']');
                }
                ':' => {
                    if self.in_param_position() {
                        self.bump();
                        self.skip_annotation(&[',', ')', '='])?;
                    } else if self.decl == DeclState::AwaitColon && self.decl_depth == 0 {
                        self.bump();
                        self.skip_annotation(&['=', ';'])?;
                        // The annotation swallowed the space before `=`.
                        if self.peek() == Some('=') && !self.out.ends_with(char::is_whitespace) {
                            self.out.push(' ');
                        }
                        self.decl = DeclState::None;
                    } else {
                        self.bump_copy();
                        self.note_sig(':');
                    }
                }
                '?' if self.in_param_position() && self.optional_marker_ahead() => {
                    self.bump();
                }
                '!' if self.non_null_suffix_ahead() => {
                    self.bump();
                }
                '=' => {
                    self.decl = DeclState::None;
                    self.decl_depth = 0;
                    self.bump_copy();
                    self.note_sig('=');
                }
                ';' => {
                    self.decl = DeclState::None;
                    self.decl_depth = 0;
                    self.bump_copy();
                    self.note_sig(';');
                }
                _ => {
                    self.bump_copy();
                    self.note_sig(c);
                    self.after_function = false;
                }
            }
        }
        Ok(self.out)
    }

    fn handle_word(&mut self) -> Result<(), TranspileError> {
        let word = self.read_word();

        match word.as_str() {
            "interface" if self.at_statement_position() && self.interface_decl_ahead() => {
                self.skip_interface_decl()?;
                return Ok(());
            }
            "type" if self.at_statement_position() && self.type_alias_ahead() => {
                self.skip_type_alias()?;
                return Ok(());
            }
            "as" if self.value_precedes() => {
                let save = self.pos;
                if self.try_skip_cast() {
                    // Drop one already-emitted space so `x as T` → `x`.
                    if self.out.ends_with(' ') {
                        self.out.pop();
                    }
                    return Ok(());
                }
                self.pos = save;
            }
            "function" => {
                self.after_function = true;
                self.out.push_str(&word);
                self.note_sig('n');
                return Ok(());
            }
            "const" | "let" | "var" => {
                self.decl = DeclState::AwaitIdent;
                self.out.push_str(&word);
                self.note_sig('t');
                return Ok(());
            }
            _ => {}
        }

        self.out.push_str(&word);
        self.note_sig(self.src[self.pos - 1]);
        if self.decl == DeclState::AwaitIdent {
            self.decl = DeclState::AwaitColon;
        }

        // Generic argument list on a call: `useState<string>(…)`.
        if self.peek() == Some('<') {
            if let Some(end) = self.generic_args_end() {
                if self.src.get(end).copied() == Some('(') {
                    self.pos = end;
                }
            }
        }
        Ok(())
    }

    fn at_statement_position(&self) -> bool {
        matches!(self.last_sig, None | Some('{') | Some('}') | Some(';'))
    }

    fn value_precedes(&self) -> bool {
        matches!(self.last_sig, Some(c) if c == ')' || c == ']' || c == '"' || is_ident_part(c))
    }

    fn in_param_position(&self) -> bool {
        self.parens
            .last()
            .is_some_and(|p| p.params && p.brace_depth == 0 && p.bracket_depth == 0)
    }

    fn optional_marker_ahead(&self) -> bool {
        let mut i = self.pos + 1;
        while i < self.src.len() && self.src[i].is_whitespace() {
            i += 1;
        }
        matches!(self.src.get(i), Some(&c) if c == ':' || c == ',' || c == ')')
    }

    fn non_null_suffix_ahead(&self) -> bool {
        if !self.value_precedes() {
            return false;
        }
        matches!(self.peek_at(1), Some(c) if c == '.' || c == ')' || c == ',' || c == ';')
    }

    fn interface_decl_ahead(&self) -> bool {
        let mut i = self.pos;
        while i < self.src.len() && self.src[i].is_whitespace() {
            i += 1;
        }
        matches!(self.src.get(i), Some(&c) if is_ident_start(c))
    }

    fn type_alias_ahead(&self) -> bool {
        let mut i = self.pos;
        while i < self.src.len() && self.src[i].is_whitespace() {
            i += 1;
        }
        match self.src.get(i) {
            Some(&c) if is_ident_start(c) => {}
            _ => return false,
        }
        while i < self.src.len() && is_ident_part(self.src[i]) {
            i += 1;
        }
        // Optional generic parameters, then `=`.
        if self.src.get(i).copied() == Some('<') {
            let mut depth = 0i32;
            while i < self.src.len() {
                match self.src[i] {
                    '<' => depth += 1,
                    '>' => {
                        depth -= 1;
                        if depth == 0 {
                            i += 1;
                            break;
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
        }
        while i < self.src.len() && self.src[i].is_whitespace() {
            i += 1;
        }
        self.src.get(i).copied() == Some('=')
    }

    fn skip_interface_decl(&mut self) -> Result<(), TranspileError> {
        // Name, optional generics, optional extends clause, then the body.
        while let Some(c) = self.peek() {
            if c == '{' {
                break;
            }
            self.bump();
        }
        let mut depth = 0i32;
        while let Some(c) = self.peek() {
            match c {
                '"' | '\'' | '`' => {
                    self.take_quoted(c)?;
                    continue;
                }
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.bump();
                        return Ok(());
                    }
                }
                _ => {}
            }
            self.bump();
        }
        Err(TranspileError::new("unterminated interface declaration"))
    }

    fn skip_type_alias(&mut self) -> Result<(), TranspileError> {
        let mut depth = 0i32;
        while let Some(c) = self.peek() {
            match c {
                '"' | '\'' | '`' => {
                    self.take_quoted(c)?;
                    continue;
                }
                '{' | '(' | '[' => depth += 1,
                '}' | ')' | ']' => depth -= 1,
                ';' if depth == 0 => {
                    self.bump();
                    return Ok(());
                }
                _ => {}
            }
            self.bump();
        }
        // Alias without a trailing semicolon runs to end of input.
        Ok(())
    }

    /// Attempt to consume the type reference of an `as` cast. Returns
    /// false (without a position guarantee) when what follows does not
    /// look like a type in cast position.
    fn try_skip_cast(&mut self) -> bool {
        let save = self.pos;
        self.skip_ws();
        if !self.skip_type_ref() {
            self.pos = save;
            return false;
        }
        let mut i = self.pos;
        while i < self.src.len() && self.src[i].is_whitespace() && self.src[i] != '\n' {
            i += 1;
        }
        match self.src.get(i) {
            None => true,
            Some(&c) => {
                if matches!(c, ';' | ',' | ')' | '}' | ']' | '.' | '\n') {
                    true
                } else {
                    self.pos = save;
                    false
                }
            }
        }
    }

    /// Consume one type reference: identifier path, string/number literal,
    /// or object type, with optional generics, array suffixes, and union
    /// or intersection continuations.
    fn skip_type_ref(&mut self) -> bool {
        loop {
            self.skip_ws();
            match self.peek() {
                Some('{') => {
                    if self.skip_balanced('{', '}').is_err() {
                        return false;
                    }
                }
                Some(c @ ('"' | '\'')) => {
                    if self.take_quoted(c).is_err() {
                        return false;
                    }
                }
                Some(c) if is_ident_start(c) => {
                    while let Some(k) = self.peek() {
                        if is_ident_part(k) || k == '.' {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                }
                _ => return false,
            }

            if self.peek() == Some('<') {
                if let Some(end) = self.generic_args_end() {
                    self.pos = end;
                } else {
                    return false;
                }
            }
            while self.peek() == Some('[') && self.peek_at(1) == Some(']') {
                self.bump();
                self.bump();
            }

            let mut i = self.pos;
            while i < self.src.len() && self.src[i].is_whitespace() {
                i += 1;
            }
            if matches!(self.src.get(i), Some('|') | Some('&')) {
                self.pos = i + 1;
                continue;
            }
            return true;
        }
    }

    /// End position (exclusive) of a `<…>` generic argument list starting
    /// at the current position, if its contents are type-shaped.
    fn generic_args_end(&self) -> Option<usize> {
        let mut i = self.pos;
        if self.src.get(i).copied() != Some('<') {
            return None;
        }
        let mut depth = 0i32;
        while i < self.src.len() {
            let c = self.src[i];
            match c {
                '<' => depth += 1,
                '>' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i + 1);
                    }
                }
                c if is_ident_part(c)
                    || c.is_whitespace()
                    || matches!(c, ',' | '.' | '[' | ']' | '|' | '&' | '"' | '\'') => {}
                _ => return None,
            }
            i += 1;
        }
        None
    }

    /// Skip an annotation until one of `stops` at the current nesting
    /// level, leaving the stop character unconsumed. Arrow tokens inside
    /// function-type annotations do not count as angle brackets.
    fn skip_annotation(&mut self, stops: &[char]) -> Result<(), TranspileError> {
        let mut angle = 0i32;
        let mut round = 0i32;
        let mut square = 0i32;
        let mut curly = 0i32;
        while let Some(c) = self.peek() {
            if angle == 0 && round == 0 && square == 0 && curly == 0 && stops.contains(&c) {
                // `=>` belongs to a function type, not a default value.
                if c == '=' && self.peek_at(1) == Some('>') {
                    self.bump();
                    self.bump();
                    continue;
                }
                return Ok(());
            }
            match c {
                '"' | '\'' | '`' => {
                    self.take_quoted(c)?;
                    continue;
                }
                '=' if self.peek_at(1) == Some('>') => {
                    self.bump();
                    self.bump();
                    continue;
                }
                '<' => angle += 1,
                '>' => angle -= 1,
                '(' => round += 1,
                ')' => {
                    if round == 0 {
                        return Ok(());
                    }
                    round -= 1;
                }
                '[' => square += 1,
                ']' => square -= 1,
                '{' => curly += 1,
                '}' => {
                    if curly == 0 {
                        return Ok(());
                    }
                    curly -= 1;
                }
                _ => {}
            }
            self.bump();
        }
        Ok(())
    }

    /// After a parameter list's `)`, drop a `: ReturnType` before the
    /// body `{` or arrow.
    fn skip_return_annotation(&mut self) -> Result<(), TranspileError> {
        let mut i = self.pos;
        while i < self.src.len() && self.src[i].is_whitespace() {
            i += 1;
        }
        if self.src.get(i).copied() != Some(':') {
            return Ok(());
        }
        // Keep the whitespace shape: emit nothing, jump past the colon.
        self.pos = i + 1;
        self.skip_ws();
        if !self.skip_type_ref() {
            return Err(TranspileError::new("malformed return type annotation"));
        }
        Ok(())
    }

    /// Lookahead: does the parenthesized group starting here end with
    /// `=>` (making it an arrow parameter list)?
    fn arrow_params_ahead(&self) -> Result<bool, TranspileError> {
        let mut i = self.pos;
        let mut depth = 0i32;
        while i < self.src.len() {
            let c = self.src[i];
            match c {
                '"' | '\'' | '`' => {
                    let quote = c;
                    i += 1;
                    let mut escaped = false;
                    while i < self.src.len() {
                        let k = self.src[i];
                        i += 1;
                        if escaped {
                            escaped = false;
                        } else if k == '\\' {
                            escaped = true;
                        } else if k == quote {
                            break;
                        }
                    }
                    continue;
                }
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let mut j = i + 1;
                        while j < self.src.len() && self.src[j].is_whitespace() {
                            j += 1;
                        }
                        // Tolerate a return annotation between `)` and `=>`.
                        if self.src.get(j).copied() == Some(':') {
                            while j < self.src.len()
                                && self.src[j] != '{'
                                && !(self.src[j] == '='
                                    && self.src.get(j + 1).copied() == Some('>'))
                            {
                                j += 1;
                            }
                        }
                        return Ok(self.src.get(j).copied() == Some('=')
                            && self.src.get(j + 1).copied() == Some('>'));
                    }
                }
                _ => {}
            }
            i += 1;
        }
        Ok(false)
    }

    fn skip_balanced(&mut self, open: char, close: char) -> Result<(), TranspileError> {
        let mut depth = 0i32;
        while let Some(c) = self.peek() {
            if c == '"' || c == '\'' || c == '`' {
                self.take_quoted(c)?;
                continue;
            }
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    self.bump();
                    return Ok(());
                }
            }
            self.bump();
        }
        Err(TranspileError::new("unterminated bracket group"))
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

    fn note_sig(&mut self, c: char) {
        self.last_sig = Some(c);
        if !is_ident_part(c) {
            self.after_function = self.after_function && c == '(';
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

    fn take_block_comment(&mut self) -> Result<String, TranspileError> {
        let mut taken = String::from("/*");
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
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn erases_parameter_annotations() {
        let out = erase_types("const f = (name: string, count: number) => name;").unwrap();
        assert_eq!(out, "const f = (name, count) => name;");
    }

    #[test]
    fn erases_destructured_props_annotation() {
        let out = erase_types("const Card = ({ title, body }: CardProps) => title;").unwrap();
        assert_eq!(out, "const Card = ({ title, body }) => title;");
    }

    #[test]
    fn erases_function_return_annotation() {
        let out = erase_types("function go(x: number): string { return x; }").unwrap();
        assert_eq!(out, "function go(x) { return x; }");
    }

    #[test]
    fn erases_variable_annotation() {
        let out = erase_types("const items: Array<string> = [];").unwrap();
        assert_eq!(out, "const items = [];");
    }

    #[test]
    fn erases_interface_and_type_alias() {
        let src = "interface Props { title: string; }\ntype Mode = \"a\" | \"b\";\nconst x = 1;";
        let out = erase_types(src).unwrap();
        assert!(!out.contains("interface"));
        assert!(!out.contains("Mode"));
        assert!(out.contains("const x = 1;"));
    }

    #[test]
    fn erases_as_cast() {
        let out = erase_types("const n = value as number;").unwrap();
        assert_eq!(out, "const n = value;");
    }

    #[test]
    fn keeps_as_inside_strings() {
        let out = erase_types("const s = \"save as draft\";").unwrap();
        assert_eq!(out, "const s = \"save as draft\";");
    }

    #[test]
    fn erases_generic_call_arguments() {
        let out = erase_types("const [v, setV] = useState<string>(\"\");").unwrap();
        assert_eq!(out, "const [v, setV] = useState(\"\");");
    }

    #[test]
    fn keeps_comparisons() {
        let out = erase_types("const less = a < b && c > d;").unwrap();
        assert_eq!(out, "const less = a < b && c > d;");
    }

    #[test]
    fn erases_optional_marker_and_non_null() {
        let out = erase_types("const f = (label?: string) => data!.value;").unwrap();
        assert_eq!(out, "const f = (label) => data.value;");
    }

    #[test]
    fn ternary_colon_survives() {
        let out = erase_types("const y = flag ? 1 : 2;").unwrap();
        assert_eq!(out, "const y = flag ? 1 : 2;");
    }

    #[test]
    fn object_literal_colons_survive_in_call_args() {
        let out = erase_types("render({ title: \"x\", n: 2 });").unwrap();
        assert_eq!(out, "render({ title: \"x\", n: 2 });");
    }

    #[test]
    fn function_type_annotation_in_params() {
        let out =
            erase_types("const f = (onClick: () => void, x: number) => onClick(x);").unwrap();
        assert_eq!(out, "const f = (onClick, x) => onClick(x);");
    }

    #[test]
    fn erases_variable_annotation_inside_function_body() {
        let src = "(function () { function App() { const n: number = 1; return n; } })();";
        let out = erase_types(src).unwrap();
        assert_eq!(
            out,
            "(function () { function App() { const n = 1; return n; } })();"
        );
    }

    #[test]
    fn object_pattern_rename_survives() {
        let out = erase_types("const { title: heading } = props;").unwrap();
        assert_eq!(out, "const { title: heading } = props;");
    }

    #[test]
    fn erases_annotation_after_destructuring_pattern() {
        let out = erase_types("const { title }: CardProps = props;").unwrap();
        assert_eq!(out, "const { title } = props;");
    }
}
