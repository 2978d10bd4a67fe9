// File: src/interpreter/value.rs
//
// Runtime values for the keai interpreter: the tagged Value enum, hash
// keys, native method lookup, inspection and JSON conversion.
//
// Scalars (null, booleans, integers, floats, strings) compare by value;
// everything else compares by reference identity, which `Rc` pointers
// give us directly.

use crate::ast::{Expr, Stmt};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::rc::Rc;

use super::environment::Env;

/// Key type for hash values. Only hashable tags can appear here; the
/// evaluator rejects everything else before constructing a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

/// A stored hash entry. The original key value is kept alongside the
/// mapped value so iteration and inspection can reproduce it.
#[derive(Debug, Clone)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

pub type HashStore = HashMap<HashKey, HashPair>;

/// A user-defined function together with its captured environment.
#[derive(Clone)]
pub struct Function {
    pub parameters: Vec<String>,
    pub defaults: Vec<(String, Expr)>,
    pub body: Rc<Vec<Stmt>>,
    pub env: Env,
    pub docstring: Option<String>,
}

/// A native callable. Registry entries and receiver-bound methods both
/// end up in this shape.
#[derive(Clone)]
pub struct Builtin(pub Rc<dyn Fn(&Env, &[Value]) -> Value>);

impl Builtin {
    pub fn new(f: impl Fn(&Env, &[Value]) -> Value + 'static) -> Self {
        Builtin(Rc::new(f))
    }

    pub fn call(&self, env: &Env, args: &[Value]) -> Value {
        (self.0)(env, args)
    }
}

/// A runtime error. `builtin_call` marks errors raised deliberately by
/// the `error(...)` built-in; those propagate as ordinary values, while
/// unflagged errors are fatal at the nearest call site.
#[derive(Debug, Clone)]
pub struct ErrorValue {
    pub message: String,
    pub code: Option<i64>,
    pub data: Option<String>,
    pub builtin_call: bool,
}

/// A loaded module: its name and the exported hash snapshot.
#[derive(Debug, Clone)]
pub struct ModuleValue {
    pub name: String,
    pub attrs: Value,
}

/// An open file handle. Reading and writing are exclusive, decided by
/// the open mode.
pub struct FileValue {
    pub path: String,
    pub mode: String,
    reader: Option<BufReader<fs::File>>,
    writer: Option<fs::File>,
}

impl FileValue {
    pub fn open(path: &str, mode: &str) -> Result<FileValue, String> {
        let mut file = FileValue {
            path: path.to_string(),
            mode: mode.to_string(),
            reader: None,
            writer: None,
        };
        match mode {
            "w" => {
                let handle =
                    fs::File::create(path).map_err(|e| format!("error opening {}: {}", path, e))?;
                file.writer = Some(handle);
            }
            "a" => {
                let handle = fs::OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(path)
                    .map_err(|e| format!("error opening {}: {}", path, e))?;
                file.writer = Some(handle);
            }
            _ => {
                let handle =
                    fs::File::open(path).map_err(|e| format!("error opening {}: {}", path, e))?;
                file.reader = Some(BufReader::new(handle));
            }
        }
        Ok(file)
    }

    pub fn read_to_end(&mut self) -> Result<String, String> {
        let reader = self.reader.as_mut().ok_or("file is not open for reading")?;
        let mut out = String::new();
        reader.read_to_string(&mut out).map_err(|e| e.to_string())?;
        Ok(out)
    }

    /// Reads one line, without the trailing newline. None at EOF.
    pub fn read_line(&mut self) -> Result<Option<String>, String> {
        let reader = self.reader.as_mut().ok_or("file is not open for reading")?;
        let mut line = String::new();
        let n = reader.read_line(&mut line).map_err(|e| e.to_string())?;
        if n == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    pub fn write(&mut self, data: &str) -> Result<i64, String> {
        let writer = self.writer.as_mut().ok_or("file is not open for writing")?;
        writer.write_all(data.as_bytes()).map_err(|e| e.to_string())?;
        Ok(data.len() as i64)
    }

    pub fn rewind(&mut self) -> bool {
        match self.reader.as_mut() {
            Some(reader) => reader.seek(SeekFrom::Start(0)).is_ok(),
            None => false,
        }
    }

    pub fn close(&mut self) {
        self.reader = None;
        self.writer = None;
    }

    /// Remaining lines, consumed from the current position. Used by the
    /// iterator protocol.
    pub fn remaining_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(Some(line)) = self.read_line() {
            lines.push(line);
        }
        lines
    }
}

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<String>),
    /// `current_args` marks the special array produced by the spread
    /// forms; it only means something as a call's first argument or
    /// inside an array literal.
    Array { elements: Rc<RefCell<Vec<Value>>>, current_args: bool },
    Hash(Rc<RefCell<HashStore>>),
    Function(Rc<Function>),
    Builtin(Builtin),
    Module(Rc<ModuleValue>),
    Error(Rc<ErrorValue>),
    /// Internal sentinel that blocks propagate and calls unwrap.
    Return(Box<Value>),
    File(Rc<RefCell<FileValue>>),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(Rc::new(s.into()))
    }

    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array { elements: Rc::new(RefCell::new(elements)), current_args: false }
    }

    pub fn current_args_array(elements: Vec<Value>) -> Self {
        Value::Array { elements: Rc::new(RefCell::new(elements)), current_args: true }
    }

    pub fn hash(store: HashStore) -> Self {
        Value::Hash(Rc::new(RefCell::new(store)))
    }

    /// Builds a hash from string keys, the way native libraries report
    /// structured results.
    pub fn hash_of(pairs: Vec<(&str, Value)>) -> Self {
        let mut store = HashStore::new();
        for (key, value) in pairs {
            store.insert(
                HashKey::Str(key.to_string()),
                HashPair { key: Value::str(key), value },
            );
        }
        Value::hash(store)
    }

    /// An ordinary (fatal-at-call-site) error value.
    pub fn error(message: impl Into<String>) -> Self {
        Value::Error(Rc::new(ErrorValue {
            message: message.into(),
            code: None,
            data: None,
            builtin_call: false,
        }))
    }

    /// An error raised deliberately by a built-in; propagates as a value.
    pub fn raised_error(message: impl Into<String>, code: Option<i64>, data: Option<String>) -> Self {
        Value::Error(Rc::new(ErrorValue { message: message.into(), code, data, builtin_call: true }))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::Str(_) => "STRING",
            Value::Array { .. } => "ARRAY",
            Value::Hash(_) => "HASH",
            Value::Function(_) => "FUNCTION",
            Value::Builtin(_) => "BUILTIN",
            Value::Module(_) => "MODULE",
            Value::Error(_) => "ERROR",
            Value::Return(_) => "RETURN_VALUE",
            Value::File(_) => "FILE",
        }
    }

    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Value::Null => Some(HashKey::Null),
            Value::Bool(b) => Some(HashKey::Bool(*b)),
            Value::Int(n) => Some(HashKey::Int(*n)),
            Value::Str(s) => Some(HashKey::Str(s.as_ref().clone())),
            _ => None,
        }
    }

    /// Human-readable textual form. Strings inspect to their raw value.
    pub fn inspect(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::Str(s) => s.as_ref().clone(),
            Value::Array { elements, .. } => {
                let parts: Vec<String> =
                    elements.borrow().iter().map(|e| e.inspect()).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Hash(store) => {
                let parts: Vec<String> = store
                    .borrow()
                    .values()
                    .map(|pair| format!("{}: {}", pair.key.inspect(), pair.value.inspect()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Function(func) => format!("fn({}) {{...}}", func.parameters.join(", ")),
            Value::Builtin(_) => "builtin function".to_string(),
            Value::Module(module) => format!("module({})", module.name),
            Value::Error(err) => format!("ERROR: {}", err.message),
            Value::Return(inner) => inner.inspect(),
            Value::File(file) => format!("<file:{}>", file.borrow().path),
        }
    }

    /// JSON rendering; used by the `json` method, the `json.*` library
    /// and Error data payloads. Values without a JSON shape degrade to
    /// their inspection string.
    pub fn json(&self, pretty: bool) -> String {
        let converted = self.to_json_value();
        if pretty {
            serde_json::to_string_pretty(&converted).unwrap_or_else(|_| "null".to_string())
        } else {
            serde_json::to_string(&converted).unwrap_or_else(|_| "null".to_string())
        }
    }

    fn to_json_value(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.as_ref().clone()),
            Value::Array { elements, .. } => serde_json::Value::Array(
                elements.borrow().iter().map(|e| e.to_json_value()).collect(),
            ),
            Value::Hash(store) => {
                let mut map = serde_json::Map::new();
                for pair in store.borrow().values() {
                    map.insert(pair.key.inspect(), pair.value.to_json_value());
                }
                serde_json::Value::Object(map)
            }
            Value::Return(inner) => inner.to_json_value(),
            other => serde_json::Value::String(other.inspect()),
        }
    }

    /// Reference identity, the fallback for `==` on non-numeric,
    /// non-string operands. Scalars are singletons in spirit, so they
    /// compare by value here.
    pub fn identity_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            (Value::Array { elements: a, .. }, Value::Array { elements: b, .. }) => {
                Rc::ptr_eq(a, b)
            }
            (Value::Hash(a), Value::Hash(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::Error(a), Value::Error(b)) => Rc::ptr_eq(a, b),
            (Value::File(a), Value::File(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn method_names(&self) -> Vec<&'static str> {
        let mut names = vec!["json", "methods", "string", "type"];
        let specific: &[&str] = match self {
            Value::Str(_) => &[
                "contains", "len", "lower", "ord", "replace", "reverse", "split", "to_f", "to_i",
                "trim", "upper",
            ],
            Value::Array { .. } => &["first", "join", "last", "len", "push", "reverse"],
            Value::Hash(_) => &["delete", "keys", "set", "values"],
            Value::Int(_) => &["chr"],
            Value::File(_) => &["close", "read", "readline", "rewind", "write"],
            _ => &[],
        };
        names.extend_from_slice(specific);
        names.sort_unstable();
        names
    }

    /// Native method lookup. The returned Builtin closes over the
    /// receiver, so the caller invokes it like any other built-in.
    pub fn get_method(&self, name: &str) -> Option<Builtin> {
        // methods shared by every value
        match name {
            "type" => {
                let recv = self.clone();
                return Some(Builtin::new(move |_, _| {
                    Value::str(recv.type_name().to_lowercase())
                }));
            }
            "string" => {
                let recv = self.clone();
                return Some(Builtin::new(move |_, _| Value::str(recv.inspect())));
            }
            "json" => {
                let recv = self.clone();
                return Some(Builtin::new(move |_, args| {
                    let pretty = matches!(args.first(), Some(Value::Bool(true)));
                    Value::str(recv.json(pretty))
                }));
            }
            "methods" => {
                let recv = self.clone();
                return Some(Builtin::new(move |_, _| {
                    Value::array(recv.method_names().into_iter().map(Value::str).collect())
                }));
            }
            _ => {}
        }

        match self {
            Value::Str(s) => string_method(s, name),
            Value::Array { elements, .. } => array_method(elements, name),
            Value::Hash(store) => hash_method(store, name),
            Value::Int(n) => integer_method(*n, name),
            Value::File(file) => file_method(file, name),
            _ => None,
        }
    }
}

fn string_method(s: &Rc<String>, name: &str) -> Option<Builtin> {
    let s = Rc::clone(s);
    let builtin = match name {
        "len" => Builtin::new(move |_, _| Value::Int(s.chars().count() as i64)),
        "upper" => Builtin::new(move |_, _| Value::str(s.to_uppercase())),
        "lower" => Builtin::new(move |_, _| Value::str(s.to_lowercase())),
        "trim" => Builtin::new(move |_, _| Value::str(s.trim())),
        "reverse" => Builtin::new(move |_, _| Value::str(s.chars().rev().collect::<String>())),
        "split" => Builtin::new(move |_, args| {
            let sep = match args.first() {
                Some(Value::Str(sep)) => sep.as_ref().clone(),
                None => " ".to_string(),
                Some(other) => {
                    return Value::error(format!(
                        "argument to `split` must be STRING, got {}",
                        other.type_name()
                    ))
                }
            };
            Value::array(s.split(sep.as_str()).map(Value::str).collect())
        }),
        "contains" => Builtin::new(move |_, args| match args.first() {
            Some(Value::Str(needle)) => Value::Bool(s.contains(needle.as_str())),
            _ => Value::error("argument to `contains` must be STRING"),
        }),
        "replace" => Builtin::new(move |_, args| match (args.first(), args.get(1)) {
            (Some(Value::Str(from)), Some(Value::Str(to))) => {
                Value::str(s.replace(from.as_str(), to.as_str()))
            }
            _ => Value::error("arguments to `replace` must be STRING"),
        }),
        "to_i" => Builtin::new(move |_, _| match s.trim().parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => Value::error(format!("could not parse `{}` as integer", s)),
        }),
        "to_f" => Builtin::new(move |_, _| match s.trim().parse::<f64>() {
            Ok(n) => Value::Float(n),
            Err(_) => Value::error(format!("could not parse `{}` as float", s)),
        }),
        "ord" => Builtin::new(move |_, _| match s.chars().next() {
            Some(c) => Value::Int(c as i64),
            None => Value::error("ord of empty string"),
        }),
        _ => return None,
    };
    Some(builtin)
}

fn array_method(elements: &Rc<RefCell<Vec<Value>>>, name: &str) -> Option<Builtin> {
    let elements = Rc::clone(elements);
    let builtin = match name {
        "len" => Builtin::new(move |_, _| Value::Int(elements.borrow().len() as i64)),
        "first" => {
            Builtin::new(move |_, _| elements.borrow().first().cloned().unwrap_or(Value::Null))
        }
        "last" => {
            Builtin::new(move |_, _| elements.borrow().last().cloned().unwrap_or(Value::Null))
        }
        "push" => Builtin::new(move |_, args| {
            let mut out = elements.borrow().clone();
            match args.first() {
                Some(value) => out.push(value.clone()),
                None => return Value::error("wrong number of arguments. got=0, want=1"),
            }
            Value::array(out)
        }),
        "join" => Builtin::new(move |_, args| {
            let sep = match args.first() {
                Some(Value::Str(sep)) => sep.as_ref().clone(),
                _ => String::new(),
            };
            let parts: Vec<String> = elements.borrow().iter().map(|e| e.inspect()).collect();
            Value::str(parts.join(&sep))
        }),
        "reverse" => Builtin::new(move |_, _| {
            let mut out = elements.borrow().clone();
            out.reverse();
            Value::array(out)
        }),
        _ => return None,
    };
    Some(builtin)
}

fn hash_method(store: &Rc<RefCell<HashStore>>, name: &str) -> Option<Builtin> {
    let store = Rc::clone(store);
    let builtin = match name {
        "keys" => Builtin::new(move |_, _| {
            Value::array(store.borrow().values().map(|p| p.key.clone()).collect())
        }),
        "values" => Builtin::new(move |_, _| {
            Value::array(store.borrow().values().map(|p| p.value.clone()).collect())
        }),
        "set" => Builtin::new(move |_, args| {
            let (key, value) = match (args.first(), args.get(1)) {
                (Some(k), Some(v)) => (k.clone(), v.clone()),
                _ => return Value::error("wrong number of arguments. got=0, want=2"),
            };
            let hashed = match key.hash_key() {
                Some(h) => h,
                None => {
                    return Value::error(format!("unusable as hash key: {}", key.type_name()))
                }
            };
            let mut out = store.borrow().clone();
            out.insert(hashed, HashPair { key, value });
            Value::hash(out)
        }),
        "delete" => Builtin::new(move |_, args| {
            let key = match args.first() {
                Some(k) => k.clone(),
                None => return Value::error("wrong number of arguments. got=0, want=1"),
            };
            let hashed = match key.hash_key() {
                Some(h) => h,
                None => {
                    return Value::error(format!("unusable as hash key: {}", key.type_name()))
                }
            };
            let mut out = store.borrow().clone();
            out.remove(&hashed);
            Value::hash(out)
        }),
        _ => return None,
    };
    Some(builtin)
}

fn integer_method(n: i64, name: &str) -> Option<Builtin> {
    match name {
        "chr" => Some(Builtin::new(move |_, _| {
            match u32::try_from(n).ok().and_then(char::from_u32) {
                Some(c) => Value::str(c.to_string()),
                None => Value::error(format!("{} is not a valid codepoint", n)),
            }
        })),
        _ => None,
    }
}

fn file_method(file: &Rc<RefCell<FileValue>>, name: &str) -> Option<Builtin> {
    let file = Rc::clone(file);
    let builtin = match name {
        "read" => Builtin::new(move |_, _| match file.borrow_mut().read_to_end() {
            Ok(text) => Value::str(text),
            Err(e) => Value::error(e),
        }),
        "readline" => Builtin::new(move |_, _| match file.borrow_mut().read_line() {
            Ok(Some(line)) => Value::str(line),
            Ok(None) => Value::Null,
            Err(e) => Value::error(e),
        }),
        "write" => Builtin::new(move |_, args| match args.first() {
            Some(Value::Str(data)) => match file.borrow_mut().write(data) {
                Ok(n) => Value::Int(n),
                Err(e) => Value::error(e),
            },
            _ => Value::error("argument to `write` must be STRING"),
        }),
        "rewind" => Builtin::new(move |_, _| Value::Bool(file.borrow_mut().rewind())),
        "close" => Builtin::new(move |_, _| {
            file.borrow_mut().close();
            Value::Bool(true)
        }),
        _ => return None,
    };
    Some(builtin)
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(n) => write!(f, "Int({})", n),
            Value::Float(n) => write!(f, "Float({})", n),
            Value::Str(s) => write!(f, "Str({:?})", s.as_ref()),
            Value::Array { elements, current_args } => {
                write!(f, "Array[{}{}]", elements.borrow().len(), if *current_args { " *" } else { "" })
            }
            Value::Hash(store) => write!(f, "Hash{{{} pairs}}", store.borrow().len()),
            Value::Function(func) => write!(f, "Function({:?})", func.parameters),
            Value::Builtin(_) => write!(f, "Builtin"),
            Value::Module(module) => write!(f, "Module({})", module.name),
            Value::Error(err) => write!(f, "Error({})", err.message),
            Value::Return(inner) => write!(f, "Return({:?})", inner),
            Value::File(file) => write!(f, "File({})", file.borrow().path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{HashKey, Value};

    #[test]
    fn test_inspect_forms() {
        assert_eq!(Value::Null.inspect(), "null");
        assert_eq!(Value::Bool(false).inspect(), "false");
        assert_eq!(Value::Int(42).inspect(), "42");
        assert_eq!(Value::str("hi").inspect(), "hi");
        let arr = Value::array(vec![Value::Int(1), Value::str("a"), Value::Null]);
        assert_eq!(arr.inspect(), "[1, a, null]");
    }

    #[test]
    fn test_hash_keys_by_value() {
        assert_eq!(Value::str("a").hash_key(), Some(HashKey::Str("a".into())));
        assert_eq!(Value::Int(1).hash_key(), Some(HashKey::Int(1)));
        assert_eq!(Value::str("a").hash_key(), Value::str("a").hash_key());
        assert!(Value::array(vec![]).hash_key().is_none());
        assert!(Value::Float(1.0).hash_key().is_none());
    }

    #[test]
    fn test_identity_vs_value_equality() {
        let a = Value::array(vec![Value::Int(1)]);
        let b = Value::array(vec![Value::Int(1)]);
        assert!(a.identity_eq(&a.clone()));
        assert!(!a.identity_eq(&b));
        assert!(Value::Int(3).identity_eq(&Value::Int(3)));
        assert!(Value::Null.identity_eq(&Value::Null));
    }

    #[test]
    fn test_json_rendering() {
        let hash = Value::hash_of(vec![("a", Value::Int(1))]);
        assert_eq!(hash.json(false), r#"{"a":1}"#);
        assert_eq!(Value::array(vec![Value::Int(1), Value::Bool(true)]).json(false), "[1,true]");
    }

    #[test]
    fn test_native_method_binds_receiver() {
        let s = Value::str("keai");
        let method = s.get_method("upper").expect("string should expose upper");
        let env = crate::interpreter::Environment::new();
        match method.call(&env, &[]) {
            Value::Str(out) => assert_eq!(out.as_ref(), "KEAI"),
            other => panic!("expected string, got {:?}", other),
        }
    }
}
