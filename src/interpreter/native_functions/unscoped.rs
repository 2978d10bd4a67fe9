// File: src/interpreter/native_functions/unscoped.rs
//
// The un-namespaced built-ins: print, error, panic. `version` is
// registered by the embedding entry points so the binary controls the
// reported string.

use super::{register_builtin, Env};
use crate::errors;
use crate::interpreter::value::{ErrorValue, HashKey, Value};
use std::rc::Rc;

pub fn register() {
    register_builtin("print", print_fn);
    register_builtin("error", error_fn);
    register_builtin("panic", panic_fn);
}

/// Writes each argument's inspection followed by a space, then a
/// newline. String arguments containing backslash escapes get one
/// unquote pass; if that fails the original text is emitted.
fn print_fn(_env: &Env, args: &[Value]) -> Value {
    let mut out = String::new();
    for arg in args {
        let mut text = arg.inspect();
        if matches!(arg, Value::Str(_)) && text.contains('\\') {
            if let Some(unquoted) = unquote(&text) {
                text = unquoted;
            }
        }
        out.push_str(&text);
        out.push(' ');
    }
    println!("{}", out);
    Value::Null
}

/// Builds an Error value from a message string, or from a hash with
/// `message`, `code` and `data` keys. Errors built here carry the
/// raised-from-builtin flag and propagate as ordinary values.
fn error_fn(_env: &Env, args: &[Value]) -> Value {
    if args.len() != 1 {
        return Value::error(format!("wrong number of arguments. got={}, want=1", args.len()));
    }
    match &args[0] {
        Value::Str(message) => Value::raised_error(message.as_ref().clone(), None, None),
        Value::Hash(store) => {
            let store = store.borrow();
            let mut message = String::new();
            let mut code = None;
            let mut data = None;

            if let Some(pair) = store.get(&HashKey::Str("message".into())) {
                match &pair.value {
                    Value::Str(m) => message = m.as_ref().clone(),
                    _ => return Value::error("error.message should be string!"),
                }
            }
            if let Some(pair) = store.get(&HashKey::Str("code".into())) {
                match &pair.value {
                    Value::Int(c) => code = Some(*c),
                    _ => return Value::error("error.code should be integer!"),
                }
            }
            if let Some(pair) = store.get(&HashKey::Str("data".into())) {
                data = Some(pair.value.json(false));
            }

            Value::Error(Rc::new(ErrorValue { message, code, data, builtin_call: true }))
        }
        _ => Value::error("error() expected a string or hash!"),
    }
}

/// Prints the Error's message to stderr and exits with its code
/// (default 1).
fn panic_fn(_env: &Env, args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Error(err)) => {
            eprintln!("{}", err.message);
            errors::exit_conditionally(err.code.unwrap_or(1) as i32);
            Value::Null
        }
        _ => Value::error("panic expected an error!"),
    }
}

/// A strconv.Unquote-style pass over escape sequences. Returns None on
/// anything malformed so the caller can fall back to the raw text.
pub fn unquote(input: &str) -> Option<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            if c == '"' {
                return None;
            }
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            '0' => out.push('\0'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            'e' => out.push('\x1b'),
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                if hex.len() != 2 {
                    return None;
                }
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return None;
                }
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            _ => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::{error_fn, unquote};
    use crate::interpreter::{Environment, Value};

    #[test]
    fn test_unquote_common_escapes() {
        assert_eq!(unquote(r"a\nb").as_deref(), Some("a\nb"));
        assert_eq!(unquote(r"tab\there").as_deref(), Some("tab\there"));
        assert_eq!(unquote(r"\x41B").as_deref(), Some("AB"));
        assert_eq!(unquote(r"\q"), None);
        assert_eq!(unquote("tail\\"), None);
    }

    #[test]
    fn test_error_from_string_sets_builtin_flag() {
        let env = Environment::new();
        match error_fn(&env, &[Value::str("boom")]) {
            Value::Error(err) => {
                assert_eq!(err.message, "boom");
                assert!(err.builtin_call);
                assert!(err.code.is_none());
            }
            other => panic!("expected error value, got {:?}", other),
        }
    }

    #[test]
    fn test_error_from_hash_reads_fields() {
        let env = Environment::new();
        let spec = Value::hash_of(vec![
            ("message", Value::str("boom")),
            ("code", Value::Int(7)),
            ("data", Value::array(vec![Value::Int(1)])),
        ]);
        match error_fn(&env, &[spec]) {
            Value::Error(err) => {
                assert_eq!(err.message, "boom");
                assert_eq!(err.code, Some(7));
                assert_eq!(err.data.as_deref(), Some("[1]"));
            }
            other => panic!("expected error value, got {:?}", other),
        }
    }

    #[test]
    fn test_error_rejects_bad_shapes() {
        let env = Environment::new();
        assert!(error_fn(&env, &[Value::Int(1)]).is_error());
        let bad = Value::hash_of(vec![("code", Value::str("seven"))]);
        match error_fn(&env, &[bad]) {
            Value::Error(err) => assert!(!err.builtin_call),
            other => panic!("expected error value, got {:?}", other),
        }
    }
}
