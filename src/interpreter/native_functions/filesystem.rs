// File: src/interpreter/native_functions/filesystem.rs
//
// The fs.* built-ins. Boolean-returning operations (chmod, mkdir, rm)
// report failure as `false` rather than an error; the rest surface
// Error values.

use super::{register_builtin, Env};
use crate::interpreter::value::{FileValue, Value};
use crate::interpreter::interpolate;
use regex::Regex;
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::UNIX_EPOCH;

pub fn register() {
    register_builtin("fs.glob", fs_glob);
    register_builtin("fs.chmod", fs_chmod);
    register_builtin("fs.mkdir", fs_mkdir);
    register_builtin("fs.open", fs_open);
    register_builtin("fs.stat", fs_stat);
    register_builtin("fs.rm", fs_rm);
    register_builtin("fs.mv", fs_mv);
    register_builtin("fs.cp", fs_cp);
    register_builtin("fs.tmpl", fs_tmpl);
}

fn string_arg<'a>(args: &'a [Value], idx: usize, who: &str) -> Result<&'a str, Value> {
    match args.get(idx) {
        Some(Value::Str(s)) => Ok(s.as_ref()),
        Some(other) => {
            Err(Value::error(format!("{} expected a string, got {}", who, other.type_name())))
        }
        None => Err(Value::error(format!(
            "wrong number of arguments. got={}, want={}",
            args.len(),
            idx + 1
        ))),
    }
}

/// `fs.glob("/etc/*.conf")` — wildcard matching over the pattern's
/// directory. `*` and `?` match within a single path segment.
fn fs_glob(_env: &Env, args: &[Value]) -> Value {
    let pattern = match string_arg(args, 0, "fs.glob") {
        Ok(s) => s,
        Err(e) => return e,
    };

    let (dir, file_pattern) = match pattern.rfind('/') {
        Some(pos) => (&pattern[..pos + 1], &pattern[pos + 1..]),
        None => ("./", pattern),
    };

    let mut regex_text = String::from("^");
    for c in file_pattern.chars() {
        match c {
            '*' => regex_text.push_str("[^/]*"),
            '?' => regex_text.push_str("[^/]"),
            other => regex_text.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex_text.push('$');
    let matcher = match Regex::new(&regex_text) {
        Ok(m) => m,
        Err(e) => return Value::error(format!("bad glob pattern: {}", e)),
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Value::array(Vec::new()),
    };

    let mut matches = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if matcher.is_match(&name) {
            matches.push(format!("{}{}", dir, name));
        }
    }
    matches.sort();
    Value::array(matches.into_iter().map(Value::str).collect())
}

/// Second argument is an octal string, to emphasise octal.
fn fs_chmod(_env: &Env, args: &[Value]) -> Value {
    if args.len() != 2 {
        return Value::error(format!("wrong number of arguments. got={}, want=2", args.len()));
    }
    let path = args[0].inspect();
    let mode = match &args[1] {
        Value::Str(mode) => mode.as_ref().clone(),
        other => {
            return Value::error(format!(
                "second argument must be string, got {}",
                other.type_name()
            ))
        }
    };
    let bits = match u32::from_str_radix(&mode, 8) {
        Ok(bits) => bits,
        Err(_) => return Value::Bool(false),
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match fs::set_permissions(&path, fs::Permissions::from_mode(bits)) {
            Ok(_) => Value::Bool(true),
            Err(_) => Value::Bool(false),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = bits;
        Value::Bool(false)
    }
}

fn fs_mkdir(_env: &Env, args: &[Value]) -> Value {
    let path = match string_arg(args, 0, "fs.mkdir") {
        Ok(s) => s,
        Err(e) => return e,
    };
    match fs::create_dir_all(path) {
        Ok(_) => Value::Bool(true),
        Err(_) => Value::Bool(false),
    }
}

/// `fs.open(path[, mode])` — mode is "r" (default), "w" or "a".
fn fs_open(_env: &Env, args: &[Value]) -> Value {
    let path = match string_arg(args, 0, "fs.open") {
        Ok(s) => s.to_string(),
        Err(e) => return e,
    };
    let mode = match args.get(1) {
        Some(Value::Str(mode)) => mode.as_ref().clone(),
        Some(other) => {
            return Value::error(format!(
                "argument to `fs.open` not supported, got={}",
                other.type_name()
            ))
        }
        None => "r".to_string(),
    };
    match FileValue::open(&path, &mode) {
        Ok(file) => Value::File(Rc::new(RefCell::new(file))),
        Err(message) => Value::error(message),
    }
}

/// Stat as a hash; an empty hash when the path cannot be inspected.
fn fs_stat(_env: &Env, args: &[Value]) -> Value {
    if args.len() != 1 {
        return Value::error(format!("wrong number of arguments. got={}, want=1", args.len()));
    }
    let path = args[0].inspect();
    let meta = match fs::metadata(&path) {
        Ok(meta) => meta,
        Err(_) => return Value::hash_of(Vec::new()),
    };

    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let kind = if meta.is_dir() {
        "directory"
    } else if meta.is_file() {
        "file"
    } else {
        "unknown"
    };

    #[cfg(unix)]
    let (perm, mode) = {
        use std::os::unix::fs::PermissionsExt;
        let bits = meta.permissions().mode();
        (mode_string(meta.is_dir(), bits), format!("{:04o}", bits & 0o7777))
    };
    #[cfg(not(unix))]
    let (perm, mode) = (String::from("----------"), String::from("0000"));

    Value::hash_of(vec![
        ("size", Value::Int(meta.len() as i64)),
        ("mtime", Value::Int(mtime)),
        ("perm", Value::str(perm)),
        ("mode", Value::str(mode)),
        ("type", Value::str(kind)),
    ])
}

#[cfg(unix)]
fn mode_string(is_dir: bool, bits: u32) -> String {
    let mut out = String::with_capacity(10);
    out.push(if is_dir { 'd' } else { '-' });
    for shift in [6, 3, 0] {
        let triplet = (bits >> shift) & 0o7;
        out.push(if triplet & 0o4 != 0 { 'r' } else { '-' });
        out.push(if triplet & 0o2 != 0 { 'w' } else { '-' });
        out.push(if triplet & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

fn fs_rm(_env: &Env, args: &[Value]) -> Value {
    if args.len() != 1 {
        return Value::error(format!("wrong number of arguments. got={}, want=1", args.len()));
    }
    let path = args[0].inspect();
    let result = if Path::new(&path).is_dir() { fs::remove_dir(&path) } else { fs::remove_file(&path) };
    match result {
        Ok(_) => Value::Bool(true),
        Err(_) => Value::Bool(false),
    }
}

fn fs_mv(_env: &Env, args: &[Value]) -> Value {
    let from = match string_arg(args, 0, "fs.mv") {
        Ok(s) => s.to_string(),
        Err(e) => return e,
    };
    let to = match string_arg(args, 1, "fs.mv") {
        Ok(s) => s.to_string(),
        Err(e) => return e,
    };
    match fs::rename(&from, &to) {
        Ok(_) => Value::Null,
        Err(e) => Value::error(format!("error moving file {}", e)),
    }
}

fn fs_cp(_env: &Env, args: &[Value]) -> Value {
    let src = match string_arg(args, 0, "fs.cp") {
        Ok(s) => s.to_string(),
        Err(e) => return e,
    };
    let dst = match string_arg(args, 1, "fs.cp") {
        Ok(s) => s.to_string(),
        Err(e) => return e,
    };

    let meta = match fs::metadata(&src) {
        Ok(meta) => meta,
        Err(_) => return Value::error("fs.cp source does not exist!"),
    };
    if !meta.is_file() {
        return Value::error("fs.cp expected regular file!");
    }
    match fs::copy(&src, &dst) {
        Ok(_) => Value::Null,
        Err(e) => Value::error(format!("error copying file {}", e)),
    }
}

/// Reads a template file and interpolates it against the caller's
/// environment.
fn fs_tmpl(env: &Env, args: &[Value]) -> Value {
    let path = match string_arg(args, 0, "fs.tmpl") {
        Ok(s) => s.to_string(),
        Err(e) => return e,
    };
    match fs::read_to_string(&path) {
        Ok(text) => Value::str(interpolate(&text, env)),
        Err(e) => Value::error(format!("error reading template file: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::{fs_glob, fs_open, fs_stat, fs_tmpl};
    use crate::interpreter::{Environment, Value};

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("keai_fs_{}_{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        dir
    }

    #[test]
    fn test_glob_matches_wildcards() {
        let dir = temp_dir("glob");
        std::fs::write(dir.join("a.conf"), "x").unwrap();
        std::fs::write(dir.join("b.conf"), "x").unwrap();
        std::fs::write(dir.join("c.txt"), "x").unwrap();

        let env = Environment::new();
        let pattern = format!("{}/*.conf", dir.display());
        match fs_glob(&env, &[Value::str(pattern)]) {
            Value::Array { elements, .. } => assert_eq!(elements.borrow().len(), 2),
            other => panic!("expected array, got {:?}", other),
        }
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_stat_reports_type_and_size() {
        let dir = temp_dir("stat");
        let file = dir.join("s.txt");
        std::fs::write(&file, "12345").unwrap();

        let env = Environment::new();
        match fs_stat(&env, &[Value::str(file.display().to_string())]) {
            Value::Hash(store) => {
                let store = store.borrow();
                let size = store
                    .get(&crate::interpreter::HashKey::Str("size".into()))
                    .map(|p| p.value.clone());
                assert!(matches!(size, Some(Value::Int(5))));
            }
            other => panic!("expected hash, got {:?}", other),
        }
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_open_read_roundtrip() {
        let dir = temp_dir("open");
        let file = dir.join("f.txt");
        std::fs::write(&file, "line1\nline2\n").unwrap();

        let env = Environment::new();
        let opened = fs_open(&env, &[Value::str(file.display().to_string())]);
        match &opened {
            Value::File(handle) => {
                assert_eq!(handle.borrow_mut().read_line().unwrap().as_deref(), Some("line1"));
            }
            other => panic!("expected file, got {:?}", other),
        }
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_tmpl_interpolates_against_caller_env() {
        let dir = temp_dir("tmpl");
        let file = dir.join("t.tmpl");
        std::fs::write(&file, "hello {{name}}").unwrap();

        let env = Environment::new();
        env.borrow_mut().set_let("name", Value::str("keai"));
        match fs_tmpl(&env, &[Value::str(file.display().to_string())]) {
            Value::Str(out) => assert_eq!(out.as_ref(), "hello keai"),
            other => panic!("expected string, got {:?}", other),
        }
        std::fs::remove_dir_all(dir).ok();
    }
}
