// File: src/module.rs
//
// Module loading: the search path, the singleton cache and module
// evaluation. A module is a .keai file evaluated in a fresh environment
// by a fresh interpreter instance; its public top-level bindings are
// snapshotted into a hash and wrapped as a Module value by the import
// expression.
//
// The cache key is the literal path text as written in the source, so
// two spellings of the same file evaluate it twice. Documented
// behavior; do not "fix".

use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::interpreter::{Environment, Interpreter, Value};
use crate::lexer;
use crate::parser::Parser;

/// Search path, built from KEAI_PATH (colon-separated, env-expanded,
/// absolutized) or defaulting to the current working directory.
static SEARCH_PATHS: Lazy<RwLock<Vec<PathBuf>>> = Lazy::new(|| RwLock::new(initial_paths()));

thread_local! {
    /// Loaded modules by literal import path. Values are Rc-based, so
    /// the cache is per thread; scripts are single-threaded.
    static CACHE: RefCell<HashMap<String, Value>> = RefCell::new(HashMap::new());
    /// Modules currently being evaluated, for circular-import detection.
    static LOADING: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

fn initial_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    match env::var("KEAI_PATH") {
        Ok(spec) if !spec.is_empty() => {
            for token in spec.split(':') {
                if token.is_empty() {
                    continue;
                }
                let expanded = expand_env(token);
                match fs::canonicalize(&expanded) {
                    Ok(abs) => paths.push(abs),
                    Err(_) => paths.push(PathBuf::from(expanded)),
                }
            }
        }
        _ => {
            if let Ok(cwd) = env::current_dir() {
                paths.push(cwd);
            }
        }
    }
    paths
}

/// $VAR and ${VAR} expansion against the process environment.
fn expand_env(input: &str) -> String {
    static VAR: Lazy<regex::Regex> =
        Lazy::new(|| regex::Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?").expect("env pattern"));
    VAR.replace_all(input, |caps: &regex::Captures| {
        env::var(caps.get(1).map(|m| m.as_str()).unwrap_or("")).unwrap_or_default()
    })
    .into_owned()
}

/// Appends a directory to the module search path (embedders, tests).
pub fn add_search_path<P: AsRef<Path>>(path: P) {
    if let Ok(mut paths) = SEARCH_PATHS.write() {
        paths.push(path.as_ref().to_path_buf());
    }
}

/// Probes the search path for `<name>.keai`, returning the first hit.
pub fn find_module(name: &str) -> Option<PathBuf> {
    let basename = format!("{}.keai", name);
    let paths = SEARCH_PATHS.read().ok()?;
    paths.iter().map(|p| p.join(&basename)).find(|candidate| candidate.exists())
}

pub fn cached_module(literal: &str) -> Option<Value> {
    CACHE.with(|cache| cache.borrow().get(literal).cloned())
}

pub fn cache_module(literal: &str, module: Value) {
    CACHE.with(|cache| {
        cache.borrow_mut().insert(literal.to_string(), module);
    });
}

/// Evaluates the named module and returns its exported hash. This spins
/// up a whole new lexer, parser, environment and interpreter, the same
/// thing string interpolation does for expression fragments. Failures
/// come back as Error values so importers may handle them.
pub fn eval_module(name: &str) -> Value {
    let filename = match find_module(name) {
        Some(filename) => filename,
        None => return Value::error(format!("ImportError: no module named '{}'", name)),
    };

    let circular = LOADING.with(|loading| loading.borrow().iter().any(|n| n == name));
    if circular {
        return Value::error(format!("ImportError: circular import of '{}'", name));
    }

    let source = match fs::read_to_string(&filename) {
        Ok(source) => source,
        Err(e) => {
            return Value::error(format!("IOError: error reading module '{}': {}", name, e))
        }
    };

    let tokens = lexer::tokenize(&source);
    let mut parser = Parser::new(tokens);
    let program = parser.parse();
    if !parser.errors().is_empty() {
        return Value::error(format!("ParseError: {}", parser.errors().join("; ")));
    }

    LOADING.with(|loading| loading.borrow_mut().push(name.to_string()));
    let env = Environment::new();
    let interp = Interpreter::new();
    interp.eval_program(&program, &env);
    LOADING.with(|loading| {
        loading.borrow_mut().pop();
    });

    let exported = env.borrow().exported_hash();
    exported
}

#[cfg(test)]
mod tests {
    use super::{add_search_path, eval_module, find_module};
    use crate::interpreter::Value;

    fn module_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("keai_mod_{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp module dir");
        dir
    }

    #[test]
    fn test_find_and_eval_module() {
        let dir = module_dir();
        std::fs::write(dir.join("shapes.keai"), "let area = fn(w, h) { return w * h }\nlet _hidden = 3\nlet version = 2\n").unwrap();
        add_search_path(&dir);

        assert!(find_module("shapes").is_some());
        assert!(find_module("missing_module_name").is_none());

        match eval_module("shapes") {
            Value::Hash(store) => {
                let store = store.borrow();
                assert_eq!(store.len(), 2, "underscore names must not be exported");
            }
            other => panic!("expected hash, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_module_is_import_error_value() {
        match eval_module("definitely_not_there") {
            Value::Error(err) => assert!(err.message.starts_with("ImportError")),
            other => panic!("expected error, got {:?}", other),
        }
    }
}
