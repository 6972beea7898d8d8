//! Lexer and parser for the emitted script subset.
//!
//! The grammar covers what the transpiler produces from generated
//! components: declarations with destructuring, functions and arrows,
//! object/array literals with spread, member/index/call chains, the
//! usual operators, templates, ternaries, and optional chaining.
//! Anything outside the subset is a syntax error, which the transpiler
//! converts into a fail-soft error script.

use crate::error::ScriptError;

// === AST ===

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl {
        declarators: Vec<(Pattern, Option<Expr>)>,
    },
    FuncDecl {
        name: String,
        params: Vec<Pattern>,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    If {
        cond: Expr,
        then: Vec<Stmt>,
        otherwise: Option<Vec<Stmt>>,
    },
    Throw(Expr),
    Block(Vec<Stmt>),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(String),
    /// `[a, , b]` — holes are `None`.
    Array(Vec<Option<Pattern>>),
    Object(Vec<ObjectPatternProp>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPatternProp {
    pub key: String,
    /// `{ key: binding }`; `None` means shorthand `{ key }`.
    pub binding: Option<Pattern>,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Template(Vec<TemplatePart>),
    Ident(String),
    Array(Vec<ArrayItem>),
    Object(Vec<ObjectProp>),
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<ArrayItem>,
    },
    Function {
        name: Option<String>,
        params: Vec<Pattern>,
        body: Vec<Stmt>,
    },
    Arrow {
        params: Vec<Pattern>,
        body: ArrowBody,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayItem {
    Item(Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectProp {
    Pair { key: String, value: Expr },
    Shorthand(String),
    Spread(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

// === lexer ===

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Number(f64),
    Str(String),
    Template(Vec<RawTplPart>),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
enum RawTplPart {
    Text(String),
    Expr(String),
}

fn syntax(message: impl Into<String>) -> ScriptError {
    ScriptError::new(format!("SyntaxError: {}", message.into()))
}

/// Recursion cap for nested statements, patterns, and expressions. The
/// parser descends once per nesting level, so pathological input must
/// hit a syntax error before the native stack runs out. Each expression
/// level costs many large native frames (assignment → ternary → … →
/// primary), so the cap must stay well below what a 2 MB worker-thread
/// stack can hold.
const MAX_NESTING_DEPTH: usize = 64;

struct Lexer {
    src: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            src: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn tokens(mut self) -> Result<Vec<Tok>, ScriptError> {
        let mut toks = Vec::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }
            if c == '/' && self.peek_at(1) == Some('/') {
                while let Some(k) = self.bump() {
                    if k == '\n' {
                        break;
                    }
                }
                continue;
            }
            if c == '/' && self.peek_at(1) == Some('*') {
                self.pos += 2;
                let mut star = false;
                loop {
                    match self.bump() {
                        Some('/') if star => break,
                        Some(k) => star = k == '*',
                        None => return Err(syntax("unterminated comment")),
                    }
                }
                continue;
            }
            if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|k| k.is_ascii_digit()))
            {
                toks.push(self.number()?);
                continue;
            }
            if is_ident_start(c) {
                let mut word = String::new();
                while let Some(k) = self.peek() {
                    if is_ident_part(k) {
                        word.push(k);
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                toks.push(Tok::Ident(word));
                continue;
            }
            if c == '"' || c == '\'' {
                toks.push(Tok::Str(self.string(c)?));
                continue;
            }
            if c == '`' {
                toks.push(self.template()?);
                continue;
            }
            toks.push(self.punct()?);
        }
        toks.push(Tok::Eof);
        Ok(toks)
    }

    fn number(&mut self) -> Result<Tok, ScriptError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        } else if self.peek() == Some('.') && !self.src[start..self.pos].is_empty() {
            // Trailing dot on a number would be a member access; leave it.
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut j = self.pos + 1;
            if matches!(self.src.get(j), Some('+') | Some('-')) {
                j += 1;
            }
            if self.src.get(j).is_some_and(|c| c.is_ascii_digit()) {
                self.pos = j;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
        let text: String = self.src[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Tok::Number)
            .map_err(|_| syntax(format!("invalid number literal '{text}'")))
    }

    fn string(&mut self, quote: char) -> Result<String, ScriptError> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(syntax("unterminated string literal")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    None => return Err(syntax("unterminated string literal")),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some('u') => out.push(self.unicode_escape()?),
                    Some(other) => out.push(other),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn unicode_escape(&mut self) -> Result<char, ScriptError> {
        let mut hex = String::new();
        if self.peek() == Some('{') {
            self.pos += 1;
            while let Some(c) = self.bump() {
                if c == '}' {
                    break;
                }
                hex.push(c);
            }
        } else {
            for _ in 0..4 {
                match self.bump() {
                    Some(c) => hex.push(c),
                    None => return Err(syntax("truncated unicode escape")),
                }
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| syntax(format!("invalid unicode escape '\\u{hex}'")))
    }

    fn template(&mut self) -> Result<Tok, ScriptError> {
        self.pos += 1;
        let mut parts = Vec::new();
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(syntax("unterminated template literal")),
                Some('`') => {
                    if !text.is_empty() {
                        parts.push(RawTplPart::Text(text));
                    }
                    return Ok(Tok::Template(parts));
                }
                Some('\\') => match self.bump() {
                    None => return Err(syntax("unterminated template literal")),
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some('u') => text.push(self.unicode_escape()?),
                    Some(other) => text.push(other),
                },
                Some('$') if self.peek() == Some('{') => {
                    if !text.is_empty() {
                        parts.push(RawTplPart::Text(std::mem::take(&mut text)));
                    }
                    self.pos += 1;
                    parts.push(RawTplPart::Expr(self.template_expr()?));
                }
                Some(c) => text.push(c),
            }
        }
    }

    /// Raw source of a `${…}` interpolation, brace-balanced and
    /// string-aware. Parsed as an expression later.
    fn template_expr(&mut self) -> Result<String, ScriptError> {
        let mut raw = String::new();
        let mut depth = 1i32;
        loop {
            match self.peek() {
                None => return Err(syntax("unterminated template interpolation")),
                Some('{') => {
                    depth += 1;
                    raw.push('{');
                    self.pos += 1;
                }
                Some('}') => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        return Ok(raw);
                    }
                    raw.push('}');
                }
                Some(q @ ('"' | '\'' | '`')) => {
                    raw.push(q);
                    self.pos += 1;
                    let mut escaped = false;
                    loop {
                        match self.bump() {
                            None => return Err(syntax("unterminated string literal")),
                            Some(c) => {
                                raw.push(c);
                                if escaped {
                                    escaped = false;
                                } else if c == '\\' {
                                    escaped = true;
                                } else if c == q {
                                    break;
                                }
                            }
                        }
                    }
                }
                Some(c) => {
                    raw.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn punct(&mut self) -> Result<Tok, ScriptError> {
        const THREE: &[&str] = &["===", "!==", "..."];
        const TWO: &[&str] = &["=>", "==", "!=", "<=", ">=", "&&", "||", "??", "?."];
        const ONE: &[&str] = &[
            "(", ")", "{", "}", "[", "]", ",", ";", ":", ".", "?", "=", "<", ">", "+", "-", "*",
            "/", "%", "!",
        ];
        let rest: String = self.src[self.pos..self.src.len().min(self.pos + 3)]
            .iter()
            .collect();
        for p in THREE {
            if rest.starts_with(p) {
                self.pos += 3;
                return Ok(Tok::Punct(p));
            }
        }
        for p in TWO {
            if rest.starts_with(p) {
                self.pos += 2;
                return Ok(Tok::Punct(p));
            }
        }
        for p in ONE {
            if rest.starts_with(p) {
                self.pos += 1;
                return Ok(Tok::Punct(p));
            }
        }
        Err(syntax(format!(
            "unexpected character '{}'",
            self.peek().unwrap_or(' ')
        )))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

// === parser ===

pub fn parse_program(source: &str) -> Result<Vec<Stmt>, ScriptError> {
    let toks = Lexer::new(source).tokens()?;
    let mut parser = Parser {
        toks,
        pos: 0,
        depth: 0,
    };
    let mut stmts = Vec::new();
    while !parser.at_eof() {
        if parser.eat_punct(";") {
            continue;
        }
        stmts.push(parser.statement()?);
    }
    Ok(stmts)
}

fn parse_expression(source: &str) -> Result<Expr, ScriptError> {
    let toks = Lexer::new(source).tokens()?;
    let mut parser = Parser {
        toks,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expression()?;
    if !parser.at_eof() {
        return Err(syntax("trailing input after expression"));
    }
    Ok(expr)
}

struct Parser {
    toks: Vec<Tok>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        self.toks.get(self.pos).unwrap_or(&Tok::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        self.toks.get(self.pos + offset).unwrap_or(&Tok::Eof)
    }

    fn bump(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.toks.len() {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), Tok::Eof)
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Tok::Punct(q) if *q == p)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> Result<(), ScriptError> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(syntax(format!("expected '{p}', found {}", describe(self.peek()))))
        }
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Tok::Ident(w) if w == word)
    }

    fn ident(&mut self) -> Result<String, ScriptError> {
        match self.bump() {
            Tok::Ident(name) => Ok(name),
            other => Err(syntax(format!("expected identifier, found {}", describe(&other)))),
        }
    }

    /// Bump the nesting depth for one recursive production. On error the
    /// whole parse is abandoned, so the counter never needs unwinding.
    fn descend(&mut self) -> Result<(), ScriptError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(syntax("nesting too deep"));
        }
        Ok(())
    }

    // --- statements ---

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        self.descend()?;
        let stmt = self.statement_inner();
        self.depth -= 1;
        stmt
    }

    fn statement_inner(&mut self) -> Result<Stmt, ScriptError> {
        if self.is_keyword("const") || self.is_keyword("let") || self.is_keyword("var") {
            self.bump();
            let mut declarators = Vec::new();
            loop {
                let pattern = self.pattern()?;
                let init = if self.eat_punct("=") {
                    Some(self.assignment()?)
                } else {
                    None
                };
                declarators.push((pattern, init));
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.eat_punct(";");
            return Ok(Stmt::VarDecl { declarators });
        }
        if self.is_keyword("function") {
            self.bump();
            let name = self.ident()?;
            let params = self.param_list()?;
            let body = self.block()?;
            return Ok(Stmt::FuncDecl { name, params, body });
        }
        if self.is_keyword("return") {
            self.bump();
            let value = if self.is_punct(";") || self.is_punct("}") || self.at_eof() {
                None
            } else {
                Some(self.expression()?)
            };
            self.eat_punct(";");
            return Ok(Stmt::Return(value));
        }
        if self.is_keyword("if") {
            return self.if_statement();
        }
        if self.is_keyword("throw") {
            self.bump();
            let value = self.expression()?;
            self.eat_punct(";");
            return Ok(Stmt::Throw(value));
        }
        if self.is_punct("{") {
            return Ok(Stmt::Block(self.block()?));
        }
        let expr = self.expression()?;
        self.eat_punct(";");
        Ok(Stmt::Expr(expr))
    }

    fn if_statement(&mut self) -> Result<Stmt, ScriptError> {
        self.bump();
        self.expect_punct("(")?;
        let cond = self.expression()?;
        self.expect_punct(")")?;
        let then = self.branch()?;
        let otherwise = if self.is_keyword("else") {
            self.bump();
            if self.is_keyword("if") {
                Some(vec![self.if_statement()?])
            } else {
                Some(self.branch()?)
            }
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then,
            otherwise,
        })
    }

    fn branch(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        if self.is_punct("{") {
            self.block()
        } else {
            Ok(vec![self.statement()?])
        }
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        self.expect_punct("{")?;
        let mut stmts = Vec::new();
        while !self.is_punct("}") {
            if self.at_eof() {
                return Err(syntax("unterminated block"));
            }
            if self.eat_punct(";") {
                continue;
            }
            stmts.push(self.statement()?);
        }
        self.expect_punct("}")?;
        Ok(stmts)
    }

    // --- patterns ---

    fn pattern(&mut self) -> Result<Pattern, ScriptError> {
        self.descend()?;
        let pattern = self.pattern_inner();
        self.depth -= 1;
        pattern
    }

    fn pattern_inner(&mut self) -> Result<Pattern, ScriptError> {
        if self.is_punct("[") {
            self.bump();
            let mut elements = Vec::new();
            while !self.is_punct("]") {
                if self.eat_punct(",") {
                    elements.push(None);
                    continue;
                }
                elements.push(Some(self.pattern()?));
                if !self.is_punct("]") {
                    self.expect_punct(",")?;
                }
            }
            self.expect_punct("]")?;
            return Ok(Pattern::Array(elements));
        }
        if self.is_punct("{") {
            self.bump();
            let mut props = Vec::new();
            while !self.is_punct("}") {
                let key = self.ident()?;
                let binding = if self.eat_punct(":") {
                    Some(self.pattern()?)
                } else {
                    None
                };
                let default = if self.eat_punct("=") {
                    Some(self.assignment()?)
                } else {
                    None
                };
                props.push(ObjectPatternProp {
                    key,
                    binding,
                    default,
                });
                if !self.is_punct("}") {
                    self.expect_punct(",")?;
                }
            }
            self.expect_punct("}")?;
            return Ok(Pattern::Object(props));
        }
        Ok(Pattern::Ident(self.ident()?))
    }

    fn param_list(&mut self) -> Result<Vec<Pattern>, ScriptError> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.is_punct(")") {
            params.push(self.pattern()?);
            if !self.is_punct(")") {
                self.expect_punct(",")?;
            }
        }
        self.expect_punct(")")?;
        Ok(params)
    }

    // --- expressions (precedence climbing) ---

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, ScriptError> {
        self.descend()?;
        let expr = self.assignment_inner();
        self.depth -= 1;
        expr
    }

    fn assignment_inner(&mut self) -> Result<Expr, ScriptError> {
        let target = self.ternary()?;
        if self.is_punct("=") {
            if !matches!(target, Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. }) {
                return Err(syntax("invalid assignment target"));
            }
            self.bump();
            let value = self.assignment()?;
            return Ok(Expr::Assign {
                target: Box::new(target),
                value: Box::new(value),
            });
        }
        Ok(target)
    }

    fn ternary(&mut self) -> Result<Expr, ScriptError> {
        let cond = self.nullish()?;
        if self.eat_punct("?") {
            let then = self.assignment()?;
            self.expect_punct(":")?;
            let otherwise = self.assignment()?;
            return Ok(Expr::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            });
        }
        Ok(cond)
    }

    fn nullish(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.logical_or()?;
        while self.eat_punct("??") {
            let right = self.logical_or()?;
            left = Expr::Logical {
                op: LogicalOp::Nullish,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn logical_or(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.logical_and()?;
        while self.eat_punct("||") {
            let right = self.logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.equality()?;
        while self.eat_punct("&&") {
            let right = self.equality()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.relational()?;
        loop {
            let op = if self.eat_punct("===") {
                BinaryOp::StrictEq
            } else if self.eat_punct("!==") {
                BinaryOp::StrictNotEq
            } else if self.eat_punct("==") {
                BinaryOp::Eq
            } else if self.eat_punct("!=") {
                BinaryOp::NotEq
            } else {
                return Ok(left);
            };
            let right = self.relational()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn relational(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.additive()?;
        loop {
            let op = if self.eat_punct("<=") {
                BinaryOp::LtEq
            } else if self.eat_punct(">=") {
                BinaryOp::GtEq
            } else if self.eat_punct("<") {
                BinaryOp::Lt
            } else if self.eat_punct(">") {
                BinaryOp::Gt
            } else {
                return Ok(left);
            };
            let right = self.additive()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn additive(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = if self.eat_punct("+") {
                BinaryOp::Add
            } else if self.eat_punct("-") {
                BinaryOp::Sub
            } else {
                return Ok(left);
            };
            let right = self.multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.unary()?;
        loop {
            let op = if self.eat_punct("*") {
                BinaryOp::Mul
            } else if self.eat_punct("/") {
                BinaryOp::Div
            } else if self.eat_punct("%") {
                BinaryOp::Rem
            } else {
                return Ok(left);
            };
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        self.descend()?;
        let expr = self.unary_inner();
        self.depth -= 1;
        expr
    }

    fn unary_inner(&mut self) -> Result<Expr, ScriptError> {
        let op = if self.eat_punct("!") {
            UnaryOp::Not
        } else if self.eat_punct("-") {
            UnaryOp::Neg
        } else if self.eat_punct("+") {
            UnaryOp::Plus
        } else if self.is_keyword("typeof") {
            self.bump();
            UnaryOp::TypeOf
        } else {
            return self.postfix();
        };
        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat_punct(".") {
                let property = self.ident()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                    optional: false,
                };
            } else if self.eat_punct("?.") {
                let property = self.ident()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                    optional: true,
                };
            } else if self.is_punct("(") {
                let args = self.argument_list()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else if self.eat_punct("[") {
                let index = self.expression()?;
                self.expect_punct("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn argument_list(&mut self) -> Result<Vec<ArrayItem>, ScriptError> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.is_punct(")") {
            if self.eat_punct("...") {
                args.push(ArrayItem::Spread(self.assignment()?));
            } else {
                args.push(ArrayItem::Item(self.assignment()?));
            }
            if !self.is_punct(")") {
                self.expect_punct(",")?;
            }
        }
        self.expect_punct(")")?;
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        match self.peek().clone() {
            Tok::Number(n) => {
                self.bump();
                Ok(Expr::Number(n))
            }
            Tok::Str(s) => {
                self.bump();
                Ok(Expr::Str(s))
            }
            Tok::Template(parts) => {
                self.bump();
                let mut out = Vec::with_capacity(parts.len());
                for part in parts {
                    out.push(match part {
                        RawTplPart::Text(text) => TemplatePart::Text(text),
                        RawTplPart::Expr(raw) => {
                            TemplatePart::Expr(Box::new(parse_expression(raw.trim())?))
                        }
                    });
                }
                Ok(Expr::Template(out))
            }
            Tok::Ident(word) => self.primary_word(word),
            Tok::Punct("(") => {
                if self.arrow_ahead() {
                    let params = self.param_list()?;
                    self.expect_punct("=>")?;
                    let body = self.arrow_body()?;
                    Ok(Expr::Arrow { params, body })
                } else {
                    self.bump();
                    let inner = self.expression()?;
                    self.expect_punct(")")?;
                    Ok(inner)
                }
            }
            Tok::Punct("[") => {
                self.bump();
                let mut items = Vec::new();
                while !self.is_punct("]") {
                    if self.eat_punct("...") {
                        items.push(ArrayItem::Spread(self.assignment()?));
                    } else {
                        items.push(ArrayItem::Item(self.assignment()?));
                    }
                    if !self.is_punct("]") {
                        self.expect_punct(",")?;
                    }
                }
                self.expect_punct("]")?;
                Ok(Expr::Array(items))
            }
            Tok::Punct("{") => self.object_literal(),
            other => Err(syntax(format!("unexpected token {}", describe(&other)))),
        }
    }

    fn primary_word(&mut self, word: String) -> Result<Expr, ScriptError> {
        match word.as_str() {
            "true" => {
                self.bump();
                Ok(Expr::Bool(true))
            }
            "false" => {
                self.bump();
                Ok(Expr::Bool(false))
            }
            "null" => {
                self.bump();
                Ok(Expr::Null)
            }
            "undefined" => {
                self.bump();
                Ok(Expr::Undefined)
            }
            "function" => {
                self.bump();
                let name = match self.peek() {
                    Tok::Ident(_) => Some(self.ident()?),
                    _ => None,
                };
                let params = self.param_list()?;
                let body = self.block()?;
                Ok(Expr::Function { name, params, body })
            }
            "new" => {
                // Constructor calls behave as plain calls here; anything
                // relying on prototype identity is outside the subset.
                self.bump();
                self.postfix()
            }
            _ => {
                self.bump();
                if self.is_punct("=>") {
                    self.bump();
                    let body = self.arrow_body()?;
                    return Ok(Expr::Arrow {
                        params: vec![Pattern::Ident(word)],
                        body,
                    });
                }
                Ok(Expr::Ident(word))
            }
        }
    }

    fn arrow_body(&mut self) -> Result<ArrowBody, ScriptError> {
        if self.is_punct("{") {
            Ok(ArrowBody::Block(self.block()?))
        } else {
            Ok(ArrowBody::Expr(Box::new(self.assignment()?)))
        }
    }

    /// Lookahead from a `(`: does the matching `)` lead into `=>`?
    fn arrow_ahead(&self) -> bool {
        let mut depth = 0i32;
        let mut i = 0usize;
        loop {
            match self.peek_at(i) {
                Tok::Punct("(") => depth += 1,
                Tok::Punct(")") => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(self.peek_at(i + 1), Tok::Punct("=>"));
                    }
                }
                Tok::Eof => return false,
                _ => {}
            }
            i += 1;
        }
    }

    fn object_literal(&mut self) -> Result<Expr, ScriptError> {
        self.expect_punct("{")?;
        let mut props = Vec::new();
        while !self.is_punct("}") {
            if self.eat_punct("...") {
                props.push(ObjectProp::Spread(self.assignment()?));
            } else {
                let key = match self.bump() {
                    Tok::Ident(name) => name,
                    Tok::Str(s) => s,
                    Tok::Number(n) => super::value::format_number(n),
                    other => {
                        return Err(syntax(format!(
                            "expected property key, found {}",
                            describe(&other)
                        )))
                    }
                };
                if self.eat_punct(":") {
                    let value = self.assignment()?;
                    props.push(ObjectProp::Pair { key, value });
                } else {
                    props.push(ObjectProp::Shorthand(key));
                }
            }
            if !self.is_punct("}") {
                self.expect_punct(",")?;
            }
        }
        self.expect_punct("}")?;
        Ok(Expr::Object(props))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Ident(w) => format!("'{w}'"),
        Tok::Number(n) => format!("number {n}"),
        Tok::Str(_) => "string literal".to_string(),
        Tok::Template(_) => "template literal".to_string(),
        Tok::Punct(p) => format!("'{p}'"),
        Tok::Eof => "end of input".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_declarations_and_destructuring() {
        let stmts =
            parse_program("const [count, setCount] = useState(0);\nconst { title } = props;")
                .unwrap();
        assert_eq!(stmts.len(), 2);
        match &stmts[0] {
            Stmt::VarDecl { declarators } => match &declarators[0].0 {
                Pattern::Array(els) => assert_eq!(els.len(), 2),
                other => panic!("expected array pattern, got {other:?}"),
            },
            other => panic!("expected declaration, got {other:?}"),
        }
    }

    #[test]
    fn parses_arrow_and_call_chain() {
        let stmts = parse_program("const f = (a, b) => a + b;\nitems.map(x => f(x, 1));").unwrap();
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn parses_object_with_spread_and_string_keys() {
        let stmts = parse_program("h(\"div\", { \"className\": cls, ...(rest) }, child);").unwrap();
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn parses_template_with_interpolation() {
        let stmts = parse_program("const s = `count: ${count + 1}`;").unwrap();
        match &stmts[0] {
            Stmt::VarDecl { declarators } => match &declarators[0].1 {
                Some(Expr::Template(parts)) => assert_eq!(parts.len(), 2),
                other => panic!("expected template, got {other:?}"),
            },
            other => panic!("expected declaration, got {other:?}"),
        }
    }

    #[test]
    fn parses_ternary_optional_chain_and_nullish() {
        parse_program("const v = data?.value ?? (flag ? 1 : 2);").unwrap();
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert!(parse_program("const x = <div/>;").is_err());
        assert!(parse_program("@decorator class X {}").is_err());
    }

    #[test]
    fn pathological_nesting_is_a_syntax_error_not_a_crash() {
        let parens = format!("const x = {}1{};", "(".repeat(2_000), ")".repeat(2_000));
        assert!(parse_program(&parens).is_err());

        let bangs = format!("const y = {}z;", "!".repeat(2_000));
        assert!(parse_program(&bangs).is_err());

        let blocks = format!("{}1;{}", "{".repeat(2_000), "}".repeat(2_000));
        assert!(parse_program(&blocks).is_err());
    }

    #[test]
    fn parses_iife_wrapper_shape() {
        parse_program("(function () {\nconst h = __runtime__.createElement;\n__entry__ = App;\n})();")
            .unwrap();
    }
}
