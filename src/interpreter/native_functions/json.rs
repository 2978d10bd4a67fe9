// File: src/interpreter/native_functions/json.rs
//
// JSON encoding/decoding built-ins. `json.parse` maps objects to
// hashes, arrays to arrays and lossless numbers to integers;
// `json.str` is the inverse, rendering any value.

use super::{register_builtin, Env};
use crate::interpreter::value::{HashKey, HashPair, HashStore, Value};

pub fn register() {
    register_builtin("json.parse", json_parse);
    register_builtin("json.str", json_str);
}

fn json_parse(_env: &Env, args: &[Value]) -> Value {
    let text = match args.first() {
        Some(Value::Str(text)) => text,
        _ => return Value::error("json.parse expected a string arg!"),
    };
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(parsed) => from_json_value(&parsed),
        Err(e) => Value::error(format!("json.parse: {}", e)),
    }
}

fn json_str(_env: &Env, args: &[Value]) -> Value {
    let value = match args.first() {
        Some(value) => value,
        None => return Value::error("wrong number of arguments. got=0, want=1"),
    };
    let pretty = matches!(args.get(1), Some(Value::Bool(true)));
    Value::str(value.json(pretty))
}

fn from_json_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(0.0)),
        },
        serde_json::Value::String(s) => Value::str(s.clone()),
        serde_json::Value::Array(items) => {
            Value::array(items.iter().map(from_json_value).collect())
        }
        serde_json::Value::Object(map) => {
            let mut store = HashStore::new();
            for (key, item) in map {
                store.insert(
                    HashKey::Str(key.clone()),
                    HashPair { key: Value::str(key.clone()), value: from_json_value(item) },
                );
            }
            Value::hash(store)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{json_parse, json_str};
    use crate::interpreter::{Environment, HashKey, Value};

    #[test]
    fn test_parse_object_to_hash() {
        let env = Environment::new();
        match json_parse(&env, &[Value::str(r#"{"a": 1, "b": [true, 2.5]}"#)]) {
            Value::Hash(store) => {
                let store = store.borrow();
                assert!(matches!(
                    store.get(&HashKey::Str("a".into())).map(|p| p.value.clone()),
                    Some(Value::Int(1))
                ));
            }
            other => panic!("expected hash, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_failure_is_error_value() {
        let env = Environment::new();
        assert!(json_parse(&env, &[Value::str("{nope")]).is_error());
        assert!(json_parse(&env, &[Value::Int(3)]).is_error());
    }

    #[test]
    fn test_str_roundtrip() {
        let env = Environment::new();
        let value = Value::array(vec![Value::Int(1), Value::str("x"), Value::Null]);
        match json_str(&env, &[value]) {
            Value::Str(out) => assert_eq!(out.as_ref(), r#"[1,"x",null]"#),
            other => panic!("expected string, got {:?}", other),
        }
    }
}
