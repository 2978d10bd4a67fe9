// File: src/interpreter/native_functions/mod.rs
//
// The built-in registry: a process-wide map from qualified name
// ("print", "math.sqrt", "fs.glob") to a native function. Registration
// is the sole extensibility surface; identifier lookup falls back here
// after the environment.

pub mod filesystem;
pub mod http;
pub mod json;
pub mod math;
pub mod time;
pub mod unscoped;

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Once, RwLock};

pub(crate) use super::environment::Env;
use super::value::{Builtin, Value};

/// Signature of a registered native function.
pub type BuiltinFn = fn(&Env, &[Value]) -> Value;

static BUILTINS: Lazy<RwLock<HashMap<String, BuiltinFn>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

static REGISTER: Once = Once::new();

/// Registers the standard library once per process. Called on every
/// interpreter construction; cheap after the first.
pub fn ensure_registered() {
    REGISTER.call_once(|| {
        unscoped::register();
        math::register();
        filesystem::register();
        http::register();
        json::register();
        time::register();
    });
}

/// Registers (or replaces) a named built-in.
pub fn register_builtin(name: &str, f: BuiltinFn) {
    if let Ok(mut builtins) = BUILTINS.write() {
        builtins.insert(name.to_string(), f);
    }
}

/// Looks a name up in the registry, wrapping the hit as a value.
pub fn lookup_builtin(name: &str) -> Option<Value> {
    let f = *BUILTINS.read().ok()?.get(name)?;
    Some(Value::Builtin(Builtin::new(move |env, args| f(env, args))))
}

/// All registered names, for introspection and tests.
pub fn builtin_names() -> Vec<String> {
    match BUILTINS.read() {
        Ok(builtins) => {
            let mut names: Vec<String> = builtins.keys().cloned().collect();
            names.sort();
            names
        }
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{builtin_names, ensure_registered, lookup_builtin};

    #[test]
    fn test_standard_library_registration() {
        ensure_registered();
        let names = builtin_names();
        for required in [
            "print",
            "error",
            "panic",
            "math.abs",
            "math.rand",
            "math.sqrt",
            "fs.glob",
            "fs.open",
            "fs.stat",
            "fs.tmpl",
            "http.create_client",
            "json.parse",
            "json.str",
            "time.now",
            "time.strftime",
        ] {
            assert!(names.iter().any(|n| n == required), "missing builtin {}", required);
        }
    }

    #[test]
    fn test_unknown_name_misses() {
        ensure_registered();
        assert!(lookup_builtin("no.such.function").is_none());
    }
}
