//! Runtime values for the script interpreter.

use crate::error::ScriptError;
use crate::script::parser::{Pattern, Stmt};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::interp::Interpreter;

/// A script value. Reference types share storage through `Rc`, matching
/// the aliasing the source language expects.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<ObjectData>>),
    Function(Rc<FunctionValue>),
    Native(Rc<NativeFunction>),
}

/// Insertion-ordered key/value storage. Property counts in generated
/// components are small, so lookup is a linear scan.
#[derive(Default)]
pub struct ObjectData {
    entries: Vec<(String, Value)>,
}

impl ObjectData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }
}

/// A user-defined function together with its captured environment.
pub struct FunctionValue {
    pub name: Option<String>,
    pub params: Vec<Pattern>,
    pub body: FunctionBody,
    pub scope: Scope,
}

#[derive(Clone)]
pub enum FunctionBody {
    Block(Rc<Vec<Stmt>>),
    Expr(Rc<crate::script::parser::Expr>),
}

/// A host-provided function. Receives the interpreter so it can call
/// back into script values (the element constructor invokes component
/// functions, for example).
pub struct NativeFunction {
    pub name: String,
    #[allow(clippy::type_complexity)]
    pub call: Box<dyn Fn(&mut Interpreter, &[Value]) -> Result<Value, ScriptError>>,
}

impl NativeFunction {
    pub fn value(
        name: impl Into<String>,
        call: impl Fn(&mut Interpreter, &[Value]) -> Result<Value, ScriptError> + 'static,
    ) -> Value {
        Value::Native(Rc::new(Self {
            name: name.into(),
            call: Box::new(call),
        }))
    }
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Rc::from(s.into().as_str()))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(data: ObjectData) -> Self {
        Value::Object(Rc::new(RefCell::new(data)))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Native(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) | Value::Object(_) => "object",
            Value::Function(_) | Value::Native(_) => "function",
        }
    }

    /// Numeric coercion for arithmetic. NaN where the source language
    /// would produce NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            _ => f64::NAN,
        }
    }

    /// String coercion for concatenation, templates, and display.
    pub fn to_display(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.to_string(),
            Value::Array(items) => items
                .borrow()
                .iter()
                .map(|v| match v {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_display(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(f) => match &f.name {
                Some(name) => format!("function {name}"),
                None => "function".to_string(),
            },
            Value::Native(f) => format!("function {}", f.name),
        }
    }

    /// Strict equality. Reference types compare by identity.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Loose equality: strict equality plus `null == undefined` and
    /// number/string coercion.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Number(_), Value::Str(_)) | (Value::Str(_), Value::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Bool(_), _) => Value::Number(self.to_number()).loose_eq(other),
            (_, Value::Bool(_)) => self.loose_eq(&Value::Number(other.to_number())),
            _ => self.strict_eq(other),
        }
    }

    /// Convert to JSON for serialization. `None` for values JSON cannot
    /// carry (functions, undefined) so object properties holding them
    /// are omitted the way `JSON.stringify` omits them.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Value::Undefined | Value::Function(_) | Value::Native(_) => None,
            Value::Null => Some(serde_json::Value::Null),
            Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
            // Integral values serialize without a fractional part so text
            // children rebuilt from JSON read "3", not "3.0".
            Value::Number(n) if *n == n.trunc() && n.abs() < 1e15 => {
                Some(serde_json::Value::Number(serde_json::Number::from(
                    *n as i64,
                )))
            }
            Value::Number(n) => Some(
                serde_json::Number::from_f64(*n)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
            ),
            Value::Str(s) => Some(serde_json::Value::String(s.to_string())),
            Value::Array(items) => Some(serde_json::Value::Array(
                items
                    .borrow()
                    .iter()
                    .map(|v| v.to_json().unwrap_or(serde_json::Value::Null))
                    .collect(),
            )),
            Value::Object(data) => {
                let mut map = serde_json::Map::new();
                for (key, value) in data.borrow().entries() {
                    if let Some(json) = value.to_json() {
                        map.insert(key.clone(), json);
                    }
                }
                Some(serde_json::Value::Object(map))
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            other => write!(f, "{}", other.to_display()),
        }
    }
}

/// Format a number the way the source language prints it: integral
/// values without a decimal point.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// A lexical environment: bindings plus a parent link.
#[derive(Clone)]
pub struct Scope(Rc<ScopeData>);

struct ScopeData {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Scope>,
}

impl Scope {
    pub fn root() -> Self {
        Scope(Rc::new(ScopeData {
            vars: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    pub fn child(&self) -> Self {
        Scope(Rc::new(ScopeData {
            vars: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    /// Declare in this scope, shadowing any outer binding.
    pub fn declare(&self, name: impl Into<String>, value: Value) {
        self.0.vars.borrow_mut().insert(name.into(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.0.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.0.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Assign to the nearest binding. An assignment to a name that is
    /// nowhere declared lands in the root scope, which is how the
    /// wrapper's `__entry__ = …;` escapes its closure.
    pub fn assign(&self, name: &str, value: Value) {
        if self.try_assign(name, &value) {
            return;
        }
        self.root_scope().declare(name, value);
    }

    fn try_assign(&self, name: &str, value: &Value) -> bool {
        let mut vars = self.0.vars.borrow_mut();
        if let Some(slot) = vars.get_mut(name) {
            *slot = value.clone();
            return true;
        }
        drop(vars);
        match &self.0.parent {
            Some(parent) => parent.try_assign(name, value),
            None => false,
        }
    }

    fn root_scope(&self) -> Scope {
        match &self.0.parent {
            Some(parent) => parent.root_scope(),
            None => self.clone(),
        }
    }
}
