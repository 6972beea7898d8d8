//! Tree-walking evaluator for the parsed script.
//!
//! Every evaluation gets a fresh [`Interpreter`]: the root scope holds
//! only the injected capabilities (console, JSON, Math, the element
//! runtime) so generated code can reach nothing else. Failures are
//! `ScriptError` values carrying a synthesized call stack.

use crate::error::ScriptError;
use crate::script::parser::{
    self, ArrayItem, ArrowBody, BinaryOp, Expr, LogicalOp, ObjectPatternProp, ObjectProp, Pattern,
    Stmt, TemplatePart, UnaryOp,
};
use crate::script::value::{FunctionBody, FunctionValue, NativeFunction, ObjectData, Scope, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Script call-depth cap. Each script frame costs many native frames in
/// `eval`/`exec_block`, so the limit must trip well before the thread's
/// own stack runs out.
const MAX_CALL_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConsoleEntry {
    pub level: ConsoleLevel,
    pub message: String,
}

enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    root: Scope,
    console: Rc<RefCell<Vec<ConsoleEntry>>>,
    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let root = Scope::root();
        let console = Rc::new(RefCell::new(Vec::new()));
        let interp = Self {
            root,
            console,
            depth: 0,
        };
        interp.install_builtins();
        interp
    }

    /// Parse and execute a program in the root scope.
    pub fn run(&mut self, source: &str) -> Result<(), ScriptError> {
        let program = parser::parse_program(source)?;
        let scope = self.root.clone();
        self.exec_block(&program, &scope)?;
        Ok(())
    }

    /// Look up a root binding; `Undefined` when absent.
    pub fn global(&self, name: &str) -> Value {
        self.root.lookup(name).unwrap_or(Value::Undefined)
    }

    pub fn define_global(&mut self, name: impl Into<String>, value: Value) {
        self.root.declare(name, value);
    }

    /// Call a script or native function value.
    pub fn call(&mut self, callee: &Value, args: &[Value]) -> Result<Value, ScriptError> {
        self.call_value(callee, args, None)
    }

    pub fn console_entries(&self) -> Vec<ConsoleEntry> {
        self.console.borrow().clone()
    }

    /// The most recent `console.error` message, if any. The renderer
    /// surfaces this when a script ran but published no entry.
    pub fn last_console_error(&self) -> Option<String> {
        self.console
            .borrow()
            .iter()
            .rev()
            .find(|e| e.level == ConsoleLevel::Error)
            .map(|e| e.message.clone())
    }

    // === builtins ===

    fn install_builtins(&self) {
        self.root.declare("console", self.console_object());
        self.root.declare("JSON", json_object());
        self.root.declare("Math", math_object());
        self.root.declare(
            "String",
            NativeFunction::value("String", |_, args| {
                Ok(Value::string(
                    args.first().map(Value::to_display).unwrap_or_default(),
                ))
            }),
        );
        self.root.declare(
            "Number",
            NativeFunction::value("Number", |_, args| {
                Ok(Value::Number(
                    args.first().map(Value::to_number).unwrap_or(f64::NAN),
                ))
            }),
        );
        self.root.declare(
            "Error",
            NativeFunction::value("Error", |_, args| {
                let mut data = ObjectData::new();
                data.set("name", Value::string("Error"));
                data.set(
                    "message",
                    Value::string(args.first().map(Value::to_display).unwrap_or_default()),
                );
                Ok(Value::object(data))
            }),
        );
        let mut array_ns = ObjectData::new();
        array_ns.set(
            "isArray",
            NativeFunction::value("isArray", |_, args| {
                Ok(Value::Bool(matches!(args.first(), Some(Value::Array(_)))))
            }),
        );
        self.root.declare("Array", Value::object(array_ns));

        self.root.declare("__runtime__", runtime_object());
        self.root.declare("__components__", Value::object(ObjectData::new()));
        self.root.declare("__entry__", Value::Undefined);
    }

    fn console_object(&self) -> Value {
        let mut data = ObjectData::new();
        for (name, level) in [
            ("log", ConsoleLevel::Log),
            ("warn", ConsoleLevel::Warn),
            ("error", ConsoleLevel::Error),
        ] {
            let sink = Rc::clone(&self.console);
            data.set(
                name,
                NativeFunction::value(name, move |_, args| {
                    let message = args
                        .iter()
                        .map(Value::to_display)
                        .collect::<Vec<_>>()
                        .join(" ");
                    match level {
                        ConsoleLevel::Log => {
                            tracing::debug!(target: "uigen::sandbox", "{message}")
                        }
                        ConsoleLevel::Warn => {
                            tracing::warn!(target: "uigen::sandbox", "{message}")
                        }
                        ConsoleLevel::Error => {
                            tracing::error!(target: "uigen::sandbox", "{message}")
                        }
                    }
                    sink.borrow_mut().push(ConsoleEntry { level, message });
                    Ok(Value::Undefined)
                }),
            );
        }
        Value::object(data)
    }

    // === statements ===

    fn exec_block(&mut self, stmts: &[Stmt], scope: &Scope) -> Result<Flow, ScriptError> {
        // Function declarations are hoisted so helpers can be defined
        // below their first use.
        for stmt in stmts {
            if let Stmt::FuncDecl { name, params, body } = stmt {
                let func = Value::Function(Rc::new(FunctionValue {
                    name: Some(name.clone()),
                    params: params.clone(),
                    body: FunctionBody::Block(Rc::new(body.clone())),
                    scope: scope.clone(),
                }));
                scope.declare(name.clone(), func);
            }
        }
        for stmt in stmts {
            if matches!(stmt, Stmt::FuncDecl { .. }) {
                continue;
            }
            match self.exec_stmt(stmt, scope)? {
                Flow::Normal => {}
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, scope: &Scope) -> Result<Flow, ScriptError> {
        match stmt {
            Stmt::VarDecl { declarators } => {
                for (pattern, init) in declarators {
                    let value = match init {
                        Some(expr) => self.eval(expr, scope)?,
                        None => Value::Undefined,
                    };
                    self.bind_pattern(pattern, value, scope)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::FuncDecl { .. } => Ok(Flow::Normal),
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond, scope)?.is_truthy() {
                    self.exec_block(then, &scope.child())
                } else if let Some(otherwise) = otherwise {
                    self.exec_block(otherwise, &scope.child())
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Throw(expr) => {
                let value = self.eval(expr, scope)?;
                Err(thrown_to_error(&value))
            }
            Stmt::Block(stmts) => self.exec_block(stmts, &scope.child()),
            Stmt::Expr(expr) => {
                self.eval(expr, scope)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: Value,
        scope: &Scope,
    ) -> Result<(), ScriptError> {
        match pattern {
            Pattern::Ident(name) => {
                scope.declare(name.clone(), value);
                Ok(())
            }
            Pattern::Array(elements) => {
                let items: Vec<Value> = match &value {
                    Value::Array(items) => items.borrow().clone(),
                    Value::Str(s) => s.chars().map(|c| Value::string(c.to_string())).collect(),
                    other => {
                        return Err(ScriptError::type_error(format!(
                            "{} is not iterable",
                            other.to_display()
                        )))
                    }
                };
                for (i, element) in elements.iter().enumerate() {
                    if let Some(element) = element {
                        let item = items.get(i).cloned().unwrap_or(Value::Undefined);
                        self.bind_pattern(element, item, scope)?;
                    }
                }
                Ok(())
            }
            Pattern::Object(props) => {
                for ObjectPatternProp {
                    key,
                    binding,
                    default,
                } in props
                {
                    let mut item = match &value {
                        Value::Object(data) => data.borrow().get(key).unwrap_or(Value::Undefined),
                        Value::Undefined | Value::Null => {
                            return Err(ScriptError::type_error(format!(
                                "Cannot destructure property '{key}' of {}",
                                value.to_display()
                            )))
                        }
                        _ => Value::Undefined,
                    };
                    if matches!(item, Value::Undefined) {
                        if let Some(default) = default {
                            item = self.eval(default, scope)?;
                        }
                    }
                    match binding {
                        Some(binding) => self.bind_pattern(binding, item, scope)?,
                        None => scope.declare(key.clone(), item),
                    }
                }
                Ok(())
            }
        }
    }

    // === expressions ===

    fn eval(&mut self, expr: &Expr, scope: &Scope) -> Result<Value, ScriptError> {
        match expr {
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::string(s.clone())),
            Expr::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Expr(expr) => {
                            out.push_str(&self.eval(expr, scope)?.to_display())
                        }
                    }
                }
                Ok(Value::string(out))
            }
            Expr::Ident(name) => scope
                .lookup(name)
                .ok_or_else(|| ScriptError::reference(name)),
            Expr::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        ArrayItem::Item(expr) => out.push(self.eval(expr, scope)?),
                        ArrayItem::Spread(expr) => match self.eval(expr, scope)? {
                            Value::Array(items) => out.extend(items.borrow().iter().cloned()),
                            other => {
                                return Err(ScriptError::type_error(format!(
                                    "{} is not iterable",
                                    other.to_display()
                                )))
                            }
                        },
                    }
                }
                Ok(Value::array(out))
            }
            Expr::Object(props) => {
                let mut data = ObjectData::new();
                for prop in props {
                    match prop {
                        ObjectProp::Pair { key, value } => {
                            let value = self.eval(value, scope)?;
                            data.set(key.clone(), value);
                        }
                        ObjectProp::Shorthand(name) => {
                            let value = scope
                                .lookup(name)
                                .ok_or_else(|| ScriptError::reference(name))?;
                            data.set(name.clone(), value);
                        }
                        ObjectProp::Spread(expr) => match self.eval(expr, scope)? {
                            Value::Object(source) => {
                                for (key, value) in source.borrow().entries() {
                                    data.set(key.clone(), value.clone());
                                }
                            }
                            Value::Undefined | Value::Null => {}
                            other => {
                                return Err(ScriptError::type_error(format!(
                                    "cannot spread {} into an object",
                                    other.type_name()
                                )))
                            }
                        },
                    }
                }
                Ok(Value::object(data))
            }
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let object = self.eval(object, scope)?;
                if *optional && matches!(object, Value::Undefined | Value::Null) {
                    return Ok(Value::Undefined);
                }
                self.get_member(&object, property)
            }
            Expr::Index { object, index } => {
                let object = self.eval(object, scope)?;
                let index = self.eval(index, scope)?;
                self.get_index(&object, &index)
            }
            Expr::Call { callee, args } => self.eval_call(callee, args, scope),
            Expr::Function { name, params, body } => Ok(Value::Function(Rc::new(FunctionValue {
                name: name.clone(),
                params: params.clone(),
                body: FunctionBody::Block(Rc::new(body.clone())),
                scope: scope.clone(),
            }))),
            Expr::Arrow { params, body } => {
                let body = match body {
                    ArrowBody::Expr(expr) => FunctionBody::Expr(Rc::new((**expr).clone())),
                    ArrowBody::Block(stmts) => FunctionBody::Block(Rc::new(stmts.clone())),
                };
                Ok(Value::Function(Rc::new(FunctionValue {
                    name: None,
                    params: params.clone(),
                    body,
                    scope: scope.clone(),
                })))
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, scope)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::TypeOf => Value::string(value.type_name()),
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                eval_binary(*op, &left, &right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left, scope)?;
                match op {
                    LogicalOp::And => {
                        if left.is_truthy() {
                            self.eval(right, scope)
                        } else {
                            Ok(left)
                        }
                    }
                    LogicalOp::Or => {
                        if left.is_truthy() {
                            Ok(left)
                        } else {
                            self.eval(right, scope)
                        }
                    }
                    LogicalOp::Nullish => {
                        if matches!(left, Value::Undefined | Value::Null) {
                            self.eval(right, scope)
                        } else {
                            Ok(left)
                        }
                    }
                }
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond, scope)?.is_truthy() {
                    self.eval(then, scope)
                } else {
                    self.eval(otherwise, scope)
                }
            }
            Expr::Assign { target, value } => {
                let value = self.eval(value, scope)?;
                match &**target {
                    Expr::Ident(name) => {
                        scope.assign(name, value.clone());
                    }
                    Expr::Member {
                        object, property, ..
                    } => {
                        let object = self.eval(object, scope)?;
                        match object {
                            Value::Object(data) => {
                                data.borrow_mut().set(property.clone(), value.clone())
                            }
                            other => {
                                return Err(ScriptError::type_error(format!(
                                    "cannot set property '{property}' on {}",
                                    other.type_name()
                                )))
                            }
                        }
                    }
                    Expr::Index { object, index } => {
                        let object = self.eval(object, scope)?;
                        let index = self.eval(index, scope)?;
                        self.set_index(&object, &index, value.clone())?;
                    }
                    _ => return Err(ScriptError::type_error("invalid assignment target")),
                }
                Ok(value)
            }
        }
    }

    fn eval_call(
        &mut self,
        callee: &Expr,
        args: &[ArrayItem],
        scope: &Scope,
    ) -> Result<Value, ScriptError> {
        let args = self.eval_args(args, scope)?;
        if let Expr::Member {
            object,
            property,
            optional,
        } = callee
        {
            let object = self.eval(object, scope)?;
            if *optional && matches!(object, Value::Undefined | Value::Null) {
                return Ok(Value::Undefined);
            }
            return match &object {
                Value::Array(_) => self.array_method(&object, property, &args),
                Value::Str(_) => string_method(&object, property, &args),
                _ => {
                    let method = self.get_member(&object, property)?;
                    if matches!(method, Value::Undefined | Value::Null) {
                        return Err(ScriptError::type_error(format!(
                            "{property} is not a function"
                        )));
                    }
                    self.call_value(&method, &args, Some(property))
                }
            };
        }
        let callee_value = self.eval(callee, scope)?;
        let name_hint = match callee {
            Expr::Ident(name) => Some(name.as_str()),
            _ => None,
        };
        self.call_value(&callee_value, &args, name_hint)
    }

    fn eval_args(&mut self, args: &[ArrayItem], scope: &Scope) -> Result<Vec<Value>, ScriptError> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                ArrayItem::Item(expr) => out.push(self.eval(expr, scope)?),
                ArrayItem::Spread(expr) => match self.eval(expr, scope)? {
                    Value::Array(items) => out.extend(items.borrow().iter().cloned()),
                    other => {
                        return Err(ScriptError::type_error(format!(
                            "{} is not iterable",
                            other.to_display()
                        )))
                    }
                },
            }
        }
        Ok(out)
    }

    fn call_value(
        &mut self,
        callee: &Value,
        args: &[Value],
        name_hint: Option<&str>,
    ) -> Result<Value, ScriptError> {
        match callee {
            Value::Function(func) => {
                if self.depth >= MAX_CALL_DEPTH {
                    return Err(ScriptError::new(
                        "RangeError: Maximum call stack size exceeded",
                    ));
                }
                self.depth += 1;
                let result = self.call_function(func, args);
                self.depth -= 1;
                result.map_err(|mut err| {
                    let frame = func
                        .name
                        .clone()
                        .or_else(|| name_hint.map(str::to_string))
                        .unwrap_or_else(|| "<anonymous>".to_string());
                    err.push_frame(frame);
                    err
                })
            }
            Value::Native(native) => {
                let native = Rc::clone(native);
                (native.call)(self, args)
            }
            other => Err(ScriptError::type_error(format!(
                "{} is not a function",
                name_hint.unwrap_or(other.type_name())
            ))),
        }
    }

    fn call_function(
        &mut self,
        func: &Rc<FunctionValue>,
        args: &[Value],
    ) -> Result<Value, ScriptError> {
        let scope = func.scope.child();
        for (i, param) in func.params.iter().enumerate() {
            let arg = args.get(i).cloned().unwrap_or(Value::Undefined);
            self.bind_pattern(param, arg, &scope)?;
        }
        match &func.body {
            FunctionBody::Expr(expr) => self.eval(expr, &scope),
            FunctionBody::Block(stmts) => match self.exec_block(stmts, &scope)? {
                Flow::Return(value) => Ok(value),
                Flow::Normal => Ok(Value::Undefined),
            },
        }
    }

    // === members, indexing, methods ===

    fn get_member(&mut self, object: &Value, property: &str) -> Result<Value, ScriptError> {
        match object {
            Value::Object(data) => Ok(data.borrow().get(property).unwrap_or(Value::Undefined)),
            Value::Array(items) => match property {
                "length" => Ok(Value::Number(items.borrow().len() as f64)),
                _ => Ok(Value::Undefined),
            },
            Value::Str(s) => match property {
                "length" => Ok(Value::Number(s.chars().count() as f64)),
                _ => Ok(Value::Undefined),
            },
            Value::Undefined | Value::Null => Err(ScriptError::type_error(format!(
                "Cannot read properties of {} (reading '{property}')",
                object.to_display()
            ))),
            _ => Ok(Value::Undefined),
        }
    }

    fn get_index(&mut self, object: &Value, index: &Value) -> Result<Value, ScriptError> {
        match object {
            Value::Array(items) => {
                let i = index.to_number();
                if i.is_nan() || i < 0.0 {
                    return Ok(Value::Undefined);
                }
                Ok(items
                    .borrow()
                    .get(i as usize)
                    .cloned()
                    .unwrap_or(Value::Undefined))
            }
            Value::Str(s) => {
                let i = index.to_number();
                if i.is_nan() || i < 0.0 {
                    return Ok(Value::Undefined);
                }
                Ok(s.chars()
                    .nth(i as usize)
                    .map(|c| Value::string(c.to_string()))
                    .unwrap_or(Value::Undefined))
            }
            _ => self.get_member(object, &index.to_display()),
        }
    }

    fn set_index(
        &mut self,
        object: &Value,
        index: &Value,
        value: Value,
    ) -> Result<(), ScriptError> {
        match object {
            Value::Array(items) => {
                let i = index.to_number();
                if i.is_nan() || i < 0.0 {
                    return Err(ScriptError::type_error("invalid array index"));
                }
                let i = i as usize;
                let mut items = items.borrow_mut();
                if i >= items.len() {
                    items.resize(i + 1, Value::Undefined);
                }
                items[i] = value;
                Ok(())
            }
            Value::Object(data) => {
                data.borrow_mut().set(index.to_display(), value);
                Ok(())
            }
            other => Err(ScriptError::type_error(format!(
                "cannot index {}",
                other.type_name()
            ))),
        }
    }

    fn array_method(
        &mut self,
        array: &Value,
        method: &str,
        args: &[Value],
    ) -> Result<Value, ScriptError> {
        let Value::Array(items) = array else {
            return Err(ScriptError::type_error("not an array"));
        };
        match method {
            "map" => {
                let callback = args.first().cloned().unwrap_or(Value::Undefined);
                let snapshot = items.borrow().clone();
                let mut out = Vec::with_capacity(snapshot.len());
                for (i, item) in snapshot.into_iter().enumerate() {
                    out.push(self.call_value(
                        &callback,
                        &[item, Value::Number(i as f64)],
                        Some("map"),
                    )?);
                }
                Ok(Value::array(out))
            }
            "filter" => {
                let callback = args.first().cloned().unwrap_or(Value::Undefined);
                let snapshot = items.borrow().clone();
                let mut out = Vec::new();
                for (i, item) in snapshot.into_iter().enumerate() {
                    let keep = self.call_value(
                        &callback,
                        &[item.clone(), Value::Number(i as f64)],
                        Some("filter"),
                    )?;
                    if keep.is_truthy() {
                        out.push(item);
                    }
                }
                Ok(Value::array(out))
            }
            "join" => {
                let sep = args
                    .first()
                    .map(Value::to_display)
                    .unwrap_or_else(|| ",".to_string());
                let joined = items
                    .borrow()
                    .iter()
                    .map(|v| match v {
                        Value::Undefined | Value::Null => String::new(),
                        other => other.to_display(),
                    })
                    .collect::<Vec<_>>()
                    .join(&sep);
                Ok(Value::string(joined))
            }
            "push" => {
                let mut items = items.borrow_mut();
                items.extend(args.iter().cloned());
                Ok(Value::Number(items.len() as f64))
            }
            "includes" => {
                let needle = args.first().cloned().unwrap_or(Value::Undefined);
                Ok(Value::Bool(
                    items.borrow().iter().any(|v| v.strict_eq(&needle)),
                ))
            }
            "slice" => {
                let items = items.borrow();
                let len = items.len() as i64;
                let start = clamp_index(args.first(), 0, len);
                let end = clamp_index(args.get(1), len, len);
                let out = if start < end {
                    items[start as usize..end as usize].to_vec()
                } else {
                    Vec::new()
                };
                Ok(Value::array(out))
            }
            other => Err(ScriptError::type_error(format!(
                "{other} is not a function"
            ))),
        }
    }
}

fn string_method(string: &Value, method: &str, args: &[Value]) -> Result<Value, ScriptError> {
    let Value::Str(s) = string else {
        return Err(ScriptError::type_error("not a string"));
    };
    match method {
        "includes" => {
            let needle = args.first().map(Value::to_display).unwrap_or_default();
            Ok(Value::Bool(s.contains(&needle)))
        }
        "toUpperCase" => Ok(Value::string(s.to_uppercase())),
        "toLowerCase" => Ok(Value::string(s.to_lowercase())),
        "trim" => Ok(Value::string(s.trim().to_string())),
        "split" => {
            let sep = args.first().map(Value::to_display);
            let parts: Vec<Value> = match sep.as_deref() {
                None => vec![Value::string(s.to_string())],
                Some("") => s.chars().map(|c| Value::string(c.to_string())).collect(),
                Some(sep) => s.split(sep).map(Value::string).collect(),
            };
            Ok(Value::array(parts))
        }
        "charAt" => {
            let i = args.first().map(Value::to_number).unwrap_or(0.0);
            if i.is_nan() || i < 0.0 {
                return Ok(Value::string(""));
            }
            Ok(Value::string(
                s.chars().nth(i as usize).map(String::from).unwrap_or_default(),
            ))
        }
        other => Err(ScriptError::type_error(format!(
            "{other} is not a function"
        ))),
    }
}

fn clamp_index(arg: Option<&Value>, default: i64, len: i64) -> i64 {
    let raw = match arg {
        None | Some(Value::Undefined) => return default,
        Some(v) => v.to_number(),
    };
    if raw.is_nan() {
        return 0;
    }
    let mut i = raw as i64;
    if i < 0 {
        i += len;
    }
    i.clamp(0, len)
}

fn eval_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ScriptError> {
    let value = match op {
        BinaryOp::Add => match (left, right) {
            (Value::Str(_), _) | (_, Value::Str(_)) => {
                Value::string(format!("{}{}", left.to_display(), right.to_display()))
            }
            _ => Value::Number(left.to_number() + right.to_number()),
        },
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Eq => Value::Bool(left.loose_eq(right)),
        BinaryOp::NotEq => Value::Bool(!left.loose_eq(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_eq(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.strict_eq(right)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = match (left, right) {
                (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            let result = match (op, ordering) {
                (_, None) => false,
                (BinaryOp::Lt, Some(o)) => o.is_lt(),
                (BinaryOp::LtEq, Some(o)) => o.is_le(),
                (BinaryOp::Gt, Some(o)) => o.is_gt(),
                (BinaryOp::GtEq, Some(o)) => o.is_ge(),
                _ => false,
            };
            Value::Bool(result)
        }
    };
    Ok(value)
}

fn thrown_to_error(value: &Value) -> ScriptError {
    match value {
        Value::Object(data) => {
            let message = data
                .borrow()
                .get("message")
                .map(|m| m.to_display())
                .unwrap_or_else(|| "[object Object]".to_string());
            ScriptError::new(format!("Error: {message}"))
        }
        other => ScriptError::new(other.to_display()),
    }
}

fn json_object() -> Value {
    let mut data = ObjectData::new();
    data.set(
        "stringify",
        NativeFunction::value("stringify", |_, args| {
            let value = match args.first() {
                None | Some(Value::Undefined) => return Ok(Value::Undefined),
                Some(v) => v,
            };
            let json = match value.to_json() {
                Some(json) => json,
                None => return Ok(Value::Undefined),
            };
            let pretty = matches!(args.get(2), Some(v) if v.to_number() > 0.0);
            let text = if pretty {
                serde_json::to_string_pretty(&json)
            } else {
                serde_json::to_string(&json)
            };
            text.map(Value::string)
                .map_err(|e| ScriptError::type_error(e.to_string()))
        }),
    );
    data.set(
        "parse",
        NativeFunction::value("parse", |_, args| {
            let text = args.first().map(Value::to_display).unwrap_or_default();
            let json: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| ScriptError::new(format!("SyntaxError: {e}")))?;
            Ok(json_to_value(&json))
        }),
    );
    Value::object(data)
}

pub(crate) fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::string(s.clone()),
        serde_json::Value::Array(items) => Value::array(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => {
            let mut data = ObjectData::new();
            for (key, value) in map {
                data.set(key.clone(), json_to_value(value));
            }
            Value::object(data)
        }
    }
}

fn math_object() -> Value {
    let mut data = ObjectData::new();
    data.set(
        "floor",
        NativeFunction::value("floor", |_, args| {
            Ok(Value::Number(
                args.first().map(Value::to_number).unwrap_or(f64::NAN).floor(),
            ))
        }),
    );
    data.set(
        "round",
        NativeFunction::value("round", |_, args| {
            Ok(Value::Number(
                args.first().map(Value::to_number).unwrap_or(f64::NAN).round(),
            ))
        }),
    );
    data.set(
        "abs",
        NativeFunction::value("abs", |_, args| {
            Ok(Value::Number(
                args.first().map(Value::to_number).unwrap_or(f64::NAN).abs(),
            ))
        }),
    );
    data.set(
        "min",
        NativeFunction::value("min", |_, args| {
            Ok(Value::Number(
                args.iter()
                    .map(Value::to_number)
                    .fold(f64::INFINITY, f64::min),
            ))
        }),
    );
    data.set(
        "max",
        NativeFunction::value("max", |_, args| {
            Ok(Value::Number(
                args.iter()
                    .map(Value::to_number)
                    .fold(f64::NEG_INFINITY, f64::max),
            ))
        }),
    );
    // xorshift; enough for layout jitter, not for anything that matters.
    let seed = Cell::new(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9e3779b97f4a7c15)
            | 1,
    );
    data.set(
        "random",
        NativeFunction::value("random", move |_, _| {
            let mut x = seed.get();
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            seed.set(x);
            Ok(Value::Number((x >> 11) as f64 / (1u64 << 53) as f64))
        }),
    );
    Value::object(data)
}

/// Marker tag for fragments; the tree rebuild splices their children
/// into the parent.
pub const FRAGMENT_TAG: &str = "#fragment";

fn runtime_object() -> Value {
    let mut data = ObjectData::new();
    data.set(
        "createElement",
        NativeFunction::value("createElement", |interp, args| {
            let element_type = args.first().cloned().unwrap_or(Value::Undefined);
            let props = args.get(1).cloned().unwrap_or(Value::Null);
            let children: Vec<Value> = args.iter().skip(2).cloned().collect();

            // Component functions are invoked immediately so the
            // published tree contains only plain data.
            if matches!(element_type, Value::Function(_) | Value::Native(_)) {
                let mut call_props = ObjectData::new();
                if let Value::Object(source) = &props {
                    for (key, value) in source.borrow().entries() {
                        call_props.set(key.clone(), value.clone());
                    }
                }
                match children.len() {
                    0 => {}
                    1 => call_props.set("children", children[0].clone()),
                    _ => call_props.set("children", Value::array(children)),
                }
                return interp.call_value(&element_type, &[Value::object(call_props)], None);
            }

            let mut node = ObjectData::new();
            node.set("type", element_type);
            node.set("props", props);
            node.set("children", Value::array(children));
            Ok(Value::object(node))
        }),
    );
    data.set("Fragment", Value::string(FRAGMENT_TAG));
    data.set(
        "useState",
        NativeFunction::value("useState", |_, args| {
            let initial = args.first().cloned().unwrap_or(Value::Undefined);
            let setter = NativeFunction::value("setState", |_, _| Ok(Value::Undefined));
            Ok(Value::array(vec![initial, setter]))
        }),
    );
    data.set(
        "useEffect",
        NativeFunction::value("useEffect", |_, _| Ok(Value::Undefined)),
    );
    Value::object(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Interpreter {
        let mut interp = Interpreter::new();
        interp.run(source).unwrap();
        interp
    }

    fn eval_global(source: &str, name: &str) -> Value {
        run(source).global(name)
    }

    #[test]
    fn entry_assignment_escapes_the_closure() {
        let interp = run("(function () {\nfunction App() { return 1; }\n__entry__ = App;\n})();");
        assert!(matches!(interp.global("__entry__"), Value::Function(_)));
    }

    #[test]
    fn use_state_destructures() {
        let v = eval_global(
            "const [count, setCount] = __runtime__.useState(5);\nout = count;",
            "out",
        );
        assert!(matches!(v, Value::Number(n) if n == 5.0));
    }

    #[test]
    fn create_element_builds_plain_nodes() {
        let interp = run(
            "const h = __runtime__.createElement;\nnode = h(\"div\", { \"className\": \"p-4\" }, \"hello\");",
        );
        let Value::Object(node) = interp.global("node") else {
            panic!("expected node object");
        };
        let node = node.borrow();
        assert!(matches!(node.get("type"), Some(Value::Str(s)) if &*s == "div"));
        assert!(matches!(node.get("children"), Some(Value::Array(_))));
    }

    #[test]
    fn create_element_invokes_component_functions() {
        let interp = run(
            "const h = __runtime__.createElement;\nconst Badge = ({ label }) => h(\"span\", null, label);\nnode = h(Badge, { \"label\": \"new\" });",
        );
        let Value::Object(node) = interp.global("node") else {
            panic!("expected node object");
        };
        assert!(matches!(
            node.borrow().get("type"),
            Some(Value::Str(s)) if &*s == "span"
        ));
    }

    #[test]
    fn map_and_template_literals() {
        let v = eval_global(
            "const items = [1, 2, 3];\nout = items.map(x => `n${x * 2}`).join(\",\");",
            "out",
        );
        assert!(matches!(v, Value::Str(s) if &*s == "n2,n4,n6"));
    }

    #[test]
    fn reference_error_names_the_identifier() {
        let mut interp = Interpreter::new();
        let err = interp.run("missing();").unwrap_err();
        assert_eq!(err.message, "ReferenceError: missing is not defined");
    }

    #[test]
    fn errors_carry_call_stack_frames() {
        let mut interp = Interpreter::new();
        let err = interp
            .run("function inner() { return nope; }\nfunction outer() { return inner(); }\nouter();")
            .unwrap_err();
        assert_eq!(err.stack, vec!["inner".to_string(), "outer".to_string()]);
        assert!(err.stack_trace().unwrap().contains("    at inner"));
    }

    #[test]
    fn console_error_is_recorded() {
        let interp = run("console.error(\"Compilation error: bad\");");
        assert_eq!(
            interp.last_console_error().as_deref(),
            Some("Compilation error: bad")
        );
    }

    #[test]
    fn member_on_undefined_is_a_type_error() {
        let mut interp = Interpreter::new();
        let err = interp.run("const a = undefined;\na.b;").unwrap_err();
        assert!(err.message.starts_with("TypeError: Cannot read properties"));
    }

    #[test]
    fn optional_chain_short_circuits() {
        let v = eval_global("const a = null;\nout = a?.b ?? \"fallback\";", "out");
        assert!(matches!(v, Value::Str(s) if &*s == "fallback"));
    }

    #[test]
    fn throw_becomes_an_error_value() {
        let mut interp = Interpreter::new();
        let err = interp
            .run("throw { message: \"boom\" };")
            .unwrap_err();
        assert_eq!(err.message, "Error: boom");
    }

    #[test]
    fn new_error_throws_carry_their_message() {
        let mut interp = Interpreter::new();
        let err = interp
            .run("throw new Error(\"bad input\");")
            .unwrap_err();
        assert_eq!(err.message, "Error: bad input");
    }

    #[test]
    fn json_stringify_round_trip() {
        let v = eval_global(
            "out = JSON.stringify({ a: 1, f: () => 2, s: \"x\" });",
            "out",
        );
        assert!(matches!(v, Value::Str(s) if &*s == "{\"a\":1,\"s\":\"x\"}"));
    }

    #[test]
    fn object_pattern_defaults_apply() {
        let v = eval_global("const { label = \"none\" } = {};\nout = label;", "out");
        assert!(matches!(v, Value::Str(s) if &*s == "none"));
    }

    #[test]
    fn recursion_is_bounded() {
        let mut interp = Interpreter::new();
        let err = interp.run("function loop() { return loop(); }\nloop();").unwrap_err();
        assert!(err.message.contains("call stack"));
    }
}
