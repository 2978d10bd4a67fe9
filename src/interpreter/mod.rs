// File: src/interpreter/mod.rs
//
// Tree-walking evaluator for the keai language.
//
// The interpreter walks the AST against an environment chain and
// produces values. Operator dispatch is by operand type pair; early
// return is a sentinel value that blocks propagate and calls unwrap.
// Errors come in two flavors: errors raised by the `error(...)` built-in
// carry a flag and travel as ordinary values, while everything else is
// fatal at the nearest call site (or, for operator errors, immediately).
//
// A cancellation token is consulted before every node, so an embedder
// can stop a runaway script from another thread.

mod environment;
mod interpolate;
mod iterator;
pub mod native_functions;
mod value;

pub use environment::{Env, Environment};
pub use interpolate::interpolate;
pub use iterator::ValueIter;
pub use value::{
    Builtin, ErrorValue, FileValue, Function, HashKey, HashPair, HashStore, ModuleValue, Value,
};

use crate::ast::{Expr, Stmt};
use crate::errors;
use crate::module;
use once_cell::sync::OnceCell;
use std::rc::Rc;
use std::sync::Arc;

/// Set once with a reason to stop evaluation at the next node boundary.
pub type CancelToken = Arc<OnceCell<String>>;

pub struct Interpreter {
    cancel: CancelToken,
    /// Quiet instances (interpolation fragments) neither print
    /// diagnostics nor exit; their errors collapse at the caller.
    quiet: bool,
}

impl Interpreter {
    pub fn new() -> Self {
        native_functions::ensure_registered();
        Interpreter { cancel: Arc::new(OnceCell::new()), quiet: false }
    }

    /// An instance whose fatal paths stay silent; used for string
    /// interpolation fragments.
    pub(crate) fn new_quiet() -> Self {
        native_functions::ensure_registered();
        Interpreter { cancel: Arc::new(OnceCell::new()), quiet: true }
    }

    /// Handle for cancelling this interpreter from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        Arc::clone(&self.cancel)
    }

    fn cancelled(&self) -> Option<Value> {
        self.cancel.get().map(|reason| Value::error(format!("cancelled: {}", reason)))
    }

    /// Prints a diagnostic and terminates the process unless running
    /// interactively (or quietly).
    fn fatal(&self, code: i32, message: &str) {
        if self.quiet {
            return;
        }
        errors::report(message);
        errors::exit_conditionally(code);
    }

    /// Evaluates a whole program, unwrapping a top-level return.
    pub fn eval_program(&self, program: &[Stmt], env: &Env) -> Value {
        let mut result = Value::Null;
        for stmt in program {
            result = self.eval_stmt(stmt, env);
            if let Value::Return(inner) = result {
                return *inner;
            }
        }
        result
    }

    /// Evaluates a block; only a return sentinel short-circuits it.
    fn eval_block(&self, stmts: &[Stmt], env: &Env) -> Value {
        let mut result = Value::Null;
        for stmt in stmts {
            result = self.eval_stmt(stmt, env);
            if matches!(result, Value::Return(_)) {
                return result;
            }
        }
        result
    }

    fn eval_stmt(&self, stmt: &Stmt, env: &Env) -> Value {
        if let Some(cancelled) = self.cancelled() {
            return cancelled;
        }
        match stmt {
            Stmt::Let { name, value } => {
                // error values are bindable; `let e = error(...)` is the
                // normal way to hold one
                let value = self.eval_expr(value, env);
                env.borrow_mut().set_let(name, value.clone());
                value
            }
            Stmt::Mutable { name, value } => {
                let value = self.eval_expr(value, env);
                env.borrow_mut().set_mutable(name, value.clone());
                value
            }
            Stmt::Return(expr) => Value::Return(Box::new(self.eval_expr(expr, env))),
            Stmt::Assign { name, op, value } => self.eval_assign(name, op, value, env),
            Stmt::Expr(expr) => self.eval_expr(expr, env),
        }
    }

    fn eval_expr(&self, expr: &Expr, env: &Env) -> Value {
        if let Some(cancelled) = self.cancelled() {
            return cancelled;
        }
        match expr {
            Expr::Integer(n) => Value::Int(*n),
            Expr::Float(n) => Value::Float(*n),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Null => Value::Null,
            Expr::Str(s) => Value::str(interpolate(s, env)),
            Expr::Identifier(name) => self.eval_identifier(name, env),
            Expr::Function { parameters, defaults, body, docstring } => {
                Value::Function(Rc::new(Function {
                    parameters: parameters.clone(),
                    defaults: defaults.clone(),
                    body: Rc::new(body.clone()),
                    env: Rc::clone(env),
                    docstring: docstring.clone(),
                }))
            }
            Expr::Prefix { op, right } => {
                let right = self.eval_expr(right, env);
                if right.is_error() {
                    return right;
                }
                self.eval_prefix(op, right)
            }
            Expr::Postfix { op, name } => self.eval_postfix(op, name, env),
            Expr::Infix { left, op, right } if op == "&&" || op == "||" => {
                // short-circuit on truthiness
                let left = self.eval_expr(left, env);
                if left.is_error() {
                    return left;
                }
                let left_truthy = is_truthy(&left);
                if op == "&&" && !left_truthy {
                    return Value::Bool(false);
                }
                if op == "||" && left_truthy {
                    return Value::Bool(true);
                }
                let right = self.eval_expr(right, env);
                if right.is_error() {
                    return right;
                }
                Value::Bool(is_truthy(&right))
            }
            Expr::Infix { left, op, right } => {
                let left = self.eval_expr(left, env);
                if left.is_error() {
                    return left;
                }
                let right = self.eval_expr(right, env);
                if right.is_error() {
                    return right;
                }
                let result = self.eval_infix_op(op, left, right);
                if result.is_error() {
                    self.fatal(1, &result.inspect());
                }
                result
            }
            Expr::If { condition, consequence, alternative } => {
                let condition = self.eval_expr(condition, env);
                if condition.is_error() {
                    return condition;
                }
                if is_truthy(&condition) {
                    self.eval_block(consequence, env)
                } else if let Some(alternative) = alternative {
                    self.eval_block(alternative, env)
                } else {
                    Value::Null
                }
            }
            Expr::For { condition, body } => {
                loop {
                    let condition = self.eval_expr(condition, env);
                    if condition.is_error() {
                        return condition;
                    }
                    if !is_truthy(&condition) {
                        break;
                    }
                    let result = self.eval_block(body, env);
                    if matches!(result, Value::Return(_)) || result.is_error() {
                        return result;
                    }
                }
                Value::Bool(true)
            }
            Expr::Foreach { ident, index, iterable, body } => {
                self.eval_foreach(ident, index.as_deref(), iterable, body, env)
            }
            Expr::Array(elements) => self.eval_array_literal(elements, env),
            Expr::Hash(pairs) => self.eval_hash_literal(pairs, env),
            Expr::Index { left, index } => {
                let left = self.eval_expr(left, env);
                if left.is_error() {
                    return left;
                }
                let index = self.eval_expr(index, env);
                if index.is_error() {
                    return index;
                }
                self.eval_index(&left, &index, env)
            }
            Expr::Call { function, arguments } => self.eval_call(function, arguments, env),
            Expr::Import { path, literal } => self.eval_import(path, literal, env),
            Expr::Spread(name) => match env.borrow().get(name) {
                Some(Value::Array { elements, .. }) => {
                    Value::Array { elements, current_args: true }
                }
                Some(other) => {
                    Value::error(format!("spread expected an array, got {}", other.type_name()))
                }
                None => Value::error(format!("`{}` is unknown", name)),
            },
            Expr::CurrentArgs => Value::current_args_array(env.borrow().current_args.clone()),
        }
    }

    fn eval_identifier(&self, name: &str, env: &Env) -> Value {
        if let Some(value) = env.borrow().get(name) {
            return value;
        }
        if let Some(builtin) = native_functions::lookup_builtin(name) {
            return builtin;
        }
        let message = format!("identifier not found: {}", name);
        self.fatal(1, &message);
        Value::error(message)
    }

    fn eval_prefix(&self, op: &str, right: Value) -> Value {
        match op {
            "!" => match right {
                Value::Bool(b) => Value::Bool(!b),
                Value::Null => Value::Bool(true),
                _ => Value::Bool(false),
            },
            "-" => match right {
                Value::Int(n) => Value::Int(n.wrapping_neg()),
                Value::Float(n) => Value::Float(-n),
                other => Value::error(format!("unknown operator: -{}", other.type_name())),
            },
            "~" => match right {
                Value::Int(n) => Value::Int(!n),
                other => Value::error(format!("expected integer, got {}", other.type_name())),
            },
            _ => Value::error(format!("unknown operator: {}{}", op, right.type_name())),
        }
    }

    /// `name++` / `name--` mutate in place and return the value from
    /// before the modification.
    fn eval_postfix(&self, op: &str, name: &str, env: &Env) -> Value {
        let current = match env.borrow().get(name) {
            Some(value) => value,
            None => return Value::error(format!("`{}` is unknown", name)),
        };
        let Value::Int(n) = current else {
            return Value::error(format!("`{}` is not an int", name));
        };
        let next = if op == "++" { n + 1 } else { n - 1 };
        if let Err(message) = env.borrow_mut().set(name, Value::Int(next)) {
            self.fatal(1, &message);
            return Value::error(message);
        }
        Value::Int(n)
    }

    fn eval_infix_op(&self, op: &str, left: Value, right: Value) -> Value {
        // augmented assignment reuses the base operator
        let op = match op {
            "+=" => "+",
            "-=" => "-",
            "*=" => "*",
            "/=" => "/",
            other => other,
        };

        match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => eval_integer_infix(op, *a, *b),
            (Value::Float(a), Value::Float(b)) => eval_float_infix(op, *a, *b),
            (Value::Float(a), Value::Int(b)) => eval_float_infix(op, *a, *b as f64),
            (Value::Int(a), Value::Float(b)) => eval_float_infix(op, *a as f64, *b),
            (Value::Str(a), Value::Str(b)) => eval_string_infix(op, a, b),
            _ => match op {
                "==" => Value::Bool(left.identity_eq(&right)),
                "!=" => Value::Bool(!left.identity_eq(&right)),
                _ => match (&left, &right) {
                    (Value::Bool(_), Value::Bool(_)) => {
                        eval_boolean_infix(op, &left, &right)
                    }
                    _ if left.type_name() != right.type_name() => Value::error(format!(
                        "type mismatch: {} {} {}",
                        left.type_name(),
                        op,
                        right.type_name()
                    )),
                    _ => Value::error(format!(
                        "unknown operator: {} {} {}",
                        left.type_name(),
                        op,
                        right.type_name()
                    )),
                },
            },
        }
    }

    fn eval_assign(&self, name: &str, op: &str, value: &Expr, env: &Env) -> Value {
        let evaluated = self.eval_expr(value, env);
        if evaluated.is_error() {
            return evaluated;
        }

        if op == "=" {
            if env.borrow().get(name).is_none() {
                let message = format!("setting unknown variable `{}` is an error", name);
                self.fatal(1, &message);
                return Value::error(message);
            }
            if let Err(message) = env.borrow_mut().set(name, evaluated.clone()) {
                self.fatal(1, &message);
                return Value::error(message);
            }
            return evaluated;
        }

        // += -= *= /= compute with the current value and assign back
        let current = match env.borrow().get(name) {
            Some(value) => value,
            None => return Value::error(format!("`{}` is unknown", name)),
        };
        let result = self.eval_infix_op(op, current, evaluated);
        if result.is_error() {
            return result;
        }
        if let Err(message) = env.borrow_mut().set(name, result.clone()) {
            self.fatal(1, &message);
            return Value::error(message);
        }
        result
    }

    fn eval_foreach(
        &self,
        ident: &str,
        index: Option<&str>,
        iterable: &Expr,
        body: &[Stmt],
        env: &Env,
    ) -> Value {
        let value = self.eval_expr(iterable, env);
        if value.is_error() {
            return value;
        }
        let mut iter = match ValueIter::from_value(&value) {
            Some(iter) => iter,
            None => {
                return Value::error(format!(
                    "{} object doesn't implement the Iterable interface",
                    value.type_name()
                ))
            }
        };

        let mut permit = vec![ident.to_string()];
        if let Some(index) = index {
            permit.push(index.to_string());
        }
        let child = Environment::new_temporary(env, permit);

        iter.reset();
        while let Some((element, position)) = iter.next() {
            child.borrow_mut().set_mutable(ident, element);
            if let Some(index) = index {
                child.borrow_mut().set_mutable(index, position);
            }
            let result = self.eval_block(body, &child);
            if matches!(result, Value::Return(_)) || result.is_error() {
                return result;
            }
        }
        Value::Null
    }

    /// Array literals splice current-args arrays produced by the spread
    /// forms, so `[...]` rebuilds the argument list as a plain array.
    fn eval_array_literal(&self, elements: &[Expr], env: &Env) -> Value {
        let mut out = Vec::new();
        for element in elements {
            let value = self.eval_expr(element, env);
            if value.is_error() {
                return value;
            }
            match value {
                Value::Array { elements, current_args: true } => {
                    out.extend(elements.borrow().iter().cloned());
                }
                other => out.push(other),
            }
        }
        Value::array(out)
    }

    fn eval_hash_literal(&self, pairs: &[(Expr, Expr)], env: &Env) -> Value {
        let mut store = HashStore::new();
        for (key_expr, value_expr) in pairs {
            let key = self.eval_expr(key_expr, env);
            if key.is_error() {
                return key;
            }
            let hashed = match key.hash_key() {
                Some(hashed) => hashed,
                None => {
                    return Value::error(format!("unusable as hash key: {}", key.type_name()))
                }
            };
            let value = self.eval_expr(value_expr, env);
            if value.is_error() {
                return value;
            }
            store.insert(hashed, HashPair { key, value });
        }
        Value::hash(store)
    }

    fn eval_call(&self, function: &Expr, arguments: &[Expr], env: &Env) -> Value {
        let callee = self.eval_expr(function, env);
        if callee.is_error() {
            return callee;
        }

        // arguments evaluate left to right; an Error stops the sweep
        // and becomes the sole argument (this is how `panic(e)` gets
        // its error)
        let mut args = Vec::with_capacity(arguments.len());
        for argument in arguments {
            let value = self.eval_expr(argument, env);
            if value.is_error() {
                args = vec![value];
                break;
            }
            args.push(value);
        }

        // a current-args array in first position forwards the caller's
        // own arguments
        if matches!(args.first(), Some(Value::Array { current_args: true, .. })) {
            let mut spliced = env.borrow().current_args.clone();
            spliced.extend(args.into_iter().skip(1));
            args = spliced;
        }

        let result = self.apply_function(env, &callee, args);

        if let Value::Error(err) = &result {
            if !err.builtin_call {
                let code = err.code.unwrap_or(1);
                self.fatal(
                    code as i32,
                    &format!("Error calling `{}` : {}", function, result.inspect()),
                );
            }
        }
        result
    }

    /// Applies a function or built-in to already-evaluated arguments.
    pub fn apply_function(&self, env: &Env, callee: &Value, args: Vec<Value>) -> Value {
        match callee {
            Value::Function(func) => {
                let child = self.extend_function_env(func, args);
                let result = self.eval_block(&func.body, &child);
                match result {
                    Value::Return(inner) => *inner,
                    other => other,
                }
            }
            Value::Builtin(builtin) => builtin.call(env, &args),
            other => Value::error(format!("not a function: {}", other.type_name())),
        }
    }

    fn extend_function_env(&self, func: &Function, args: Vec<Value>) -> Env {
        let env = Environment::new_enclosed(&func.env, args.clone());
        for (idx, param) in func.parameters.iter().enumerate() {
            if let Some(arg) = args.get(idx) {
                env.borrow_mut().set_mutable(param, arg.clone());
            } else if let Some((_, default)) =
                func.defaults.iter().find(|(name, _)| name == param)
            {
                // defaults are evaluated at call time, in the call frame
                let value = self.eval_expr(default, &env);
                env.borrow_mut().set_mutable(param, value);
            }
        }
        env
    }

    fn eval_index(&self, left: &Value, index: &Value, env: &Env) -> Value {
        match left {
            Value::Array { elements, .. } => match index {
                Value::Int(idx) => {
                    let elements = elements.borrow();
                    if *idx < 0 || *idx as usize >= elements.len() {
                        return Value::Null;
                    }
                    elements[*idx as usize].clone()
                }
                _ => self.resolve_method(left, index, env).unwrap_or(Value::Null),
            },
            Value::Hash(store) => self.eval_hash_index(left, store, index, env),
            Value::Str(s) => match index {
                Value::Int(idx) => {
                    let chars: Vec<char> = s.chars().collect();
                    if *idx < 0 || *idx as usize >= chars.len() {
                        return Value::Null;
                    }
                    Value::str(chars[*idx as usize].to_string())
                }
                _ => self.resolve_method(left, index, env).unwrap_or(Value::Null),
            },
            Value::Module(module) => {
                let Value::Hash(attrs) = &module.attrs else {
                    return Value::Null;
                };
                self.eval_hash_index(&module.attrs, attrs, index, env)
            }
            _ => match self.resolve_method(left, index, env) {
                Some(resolved) => resolved,
                None => {
                    Value::error(format!("index operator not supported: {}", left.type_name()))
                }
            },
        }
    }

    fn eval_hash_index(
        &self,
        receiver: &Value,
        store: &Rc<std::cell::RefCell<HashStore>>,
        index: &Value,
        env: &Env,
    ) -> Value {
        let hashed = match index.hash_key() {
            Some(hashed) => hashed,
            None => return Value::error(format!("unusable as hash key: {}", index.type_name())),
        };
        let found = store.borrow().get(&hashed).map(|pair| pair.value.clone());
        match found {
            Some(value) => value,
            None => self.resolve_method(receiver, index, env).unwrap_or(Value::Null),
        }
    }

    /// Method resolution for `receiver.member`: a native method wins,
    /// then a `"<type>.<member>"` binding, then `"object.<member>"`.
    /// User functions are cloned with `self` bound to the receiver.
    fn resolve_method(&self, receiver: &Value, key: &Value, env: &Env) -> Option<Value> {
        let Value::Str(name) = key else {
            return None;
        };

        if let Some(native) = receiver.get_method(name) {
            return Some(Value::Builtin(native));
        }

        let type_prefix = receiver.type_name().to_lowercase();
        for prefix in [type_prefix.as_str(), "object"] {
            let qualified = format!("{}.{}", prefix, name);
            let binding = env.borrow().get(&qualified);
            if let Some(binding) = binding {
                if let Value::Function(func) = &binding {
                    let bound = Environment::new_enclosed(&func.env, Vec::new());
                    bound.borrow_mut().set_mutable("self", receiver.clone());
                    return Some(Value::Function(Rc::new(Function {
                        parameters: func.parameters.clone(),
                        defaults: func.defaults.clone(),
                        body: Rc::clone(&func.body),
                        env: bound,
                        docstring: func.docstring.clone(),
                    })));
                }
                return Some(binding);
            }
        }
        None
    }

    /// `import "path"`: modules are singletons, cached by the literal
    /// path text as written in the source.
    fn eval_import(&self, path: &Expr, literal: &str, env: &Env) -> Value {
        if let Some(cached) = module::cached_module(literal) {
            return cached;
        }

        let name = self.eval_expr(path, env);
        if name.is_error() {
            return name;
        }
        let Value::Str(name) = name else {
            return Value::error(format!("ImportError: invalid import path '{}'", name.inspect()));
        };

        let attrs = module::eval_module(&name);
        if attrs.is_error() {
            return attrs;
        }

        let module =
            Value::Module(Rc::new(ModuleValue { name: name.as_ref().clone(), attrs }));
        module::cache_module(literal, module.clone());
        module
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// The truthiness predicate behind `if`, `for`, `&&` and `||`. Note
/// that the bang operator is deliberately coarser: it only treats the
/// boolean singletons and null specially.
pub fn is_truthy(value: &Value) -> bool {
    let value = match value {
        Value::Return(inner) => inner.as_ref(),
        other => other,
    };
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Int(n) => *n != 0,
        Value::Float(n) => *n != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::Array { elements, .. } => !elements.borrow().is_empty(),
        Value::Hash(store) => !store.borrow().is_empty(),
        _ => true,
    }
}

fn eval_integer_infix(op: &str, a: i64, b: i64) -> Value {
    match op {
        "+" => Value::Int(a.wrapping_add(b)),
        "-" => Value::Int(a.wrapping_sub(b)),
        "*" => Value::Int(a.wrapping_mul(b)),
        "/" => {
            if b == 0 {
                return Value::error("division by zero");
            }
            Value::Int(a.wrapping_div(b))
        }
        "%" => {
            if b == 0 {
                return Value::error("division by zero");
            }
            Value::Int(a.wrapping_rem(b))
        }
        "**" => Value::Int((a as f64).powf(b as f64) as i64),
        "<" => Value::Bool(a < b),
        "<=" => Value::Bool(a <= b),
        ">" => Value::Bool(a > b),
        ">=" => Value::Bool(a >= b),
        "==" => Value::Bool(a == b),
        "!=" => Value::Bool(a != b),
        "|" => Value::Int(a | b),
        "^" => Value::Int(a ^ b),
        "&" => Value::Int(a & b),
        "<<" => {
            if !(0..64).contains(&b) {
                return Value::error(format!("invalid shift amount: {}", b));
            }
            Value::Int(a.wrapping_shl(b as u32))
        }
        ">>" => {
            if !(0..64).contains(&b) {
                return Value::error(format!("invalid shift amount: {}", b));
            }
            Value::Int(a.wrapping_shr(b as u32))
        }
        ".." => {
            // inclusive range; an inverted range is empty
            if b < a {
                return Value::array(Vec::new());
            }
            Value::array((a..=b).map(Value::Int).collect())
        }
        _ => Value::error(format!("unknown operator: INTEGER {} INTEGER", op)),
    }
}

fn eval_float_infix(op: &str, a: f64, b: f64) -> Value {
    match op {
        "+" => Value::Float(a + b),
        "-" => Value::Float(a - b),
        "*" => Value::Float(a * b),
        "/" => Value::Float(a / b),
        "**" => Value::Float(a.powf(b)),
        "<" => Value::Bool(a < b),
        "<=" => Value::Bool(a <= b),
        ">" => Value::Bool(a > b),
        ">=" => Value::Bool(a >= b),
        "==" => Value::Bool(a == b),
        "!=" => Value::Bool(a != b),
        _ => Value::error(format!("unknown operator: FLOAT {} FLOAT", op)),
    }
}

fn eval_string_infix(op: &str, a: &str, b: &str) -> Value {
    match op {
        "+" => Value::str(format!("{}{}", a, b)),
        "==" => Value::Bool(a == b),
        "!=" => Value::Bool(a != b),
        "<" => Value::Bool(a < b),
        "<=" => Value::Bool(a <= b),
        ">" => Value::Bool(a > b),
        ">=" => Value::Bool(a >= b),
        _ => Value::error(format!("unknown operator: STRING {} STRING", op)),
    }
}

/// Boolean ordering compares the textual inspection, so `false < true`
/// holds lexically. Keep it this way.
fn eval_boolean_infix(op: &str, left: &Value, right: &Value) -> Value {
    match op {
        "<" | "<=" | ">" | ">=" => eval_string_infix(op, &left.inspect(), &right.inspect()),
        _ => Value::error(format!(
            "unknown operator: {} {} {}",
            left.type_name(),
            op,
            right.type_name()
        )),
    }
}
