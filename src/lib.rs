// File: src/lib.rs
//
// Library interface for the keai interpreter: the embedding API plus
// the modules integration tests drive directly.

pub mod ast;
pub mod errors;
pub mod interpreter;
pub mod lexer;
pub mod module;
pub mod parser;
pub mod repl;
pub mod stdlib;

use std::io::Write;

pub use interpreter::native_functions::{register_builtin, BuiltinFn};
pub use interpreter::{Env, Environment, Interpreter, Value};

fn version_fn(_env: &Env, _args: &[Value]) -> Value {
    Value::str(env!("CARGO_PKG_VERSION"))
}

/// A fresh top-level environment with the standard library evaluated
/// into it and the `version()` built-in registered.
pub fn base_environment() -> Env {
    interpreter::native_functions::ensure_registered();
    register_builtin("version", version_fn);

    let env = Environment::new();
    let tokens = lexer::tokenize(&stdlib::stdlib_source());
    let mut parser = parser::Parser::new(tokens);
    let program = parser.parse();
    if !parser.errors().is_empty() {
        errors::print_parser_errors(parser.errors());
    }
    Interpreter::new().eval_program(&program, &env);
    env
}

/// Executes `source` against a fresh environment. Returns the process
/// exit code; fatal runtime errors exit directly.
pub fn evaluate(source: &str) -> i32 {
    let env = base_environment();
    let tokens = lexer::tokenize(source);
    let mut parser = parser::Parser::new(tokens);
    let program = parser.parse();
    if !parser.errors().is_empty() {
        errors::print_parser_errors(parser.errors());
        return 1;
    }
    Interpreter::new().eval_program(&program, &env);
    0
}

/// Reads and executes a source file.
pub fn evaluate_file(path: &str) -> i32 {
    match std::fs::read_to_string(path) {
        Ok(source) => evaluate(&source),
        Err(e) => {
            eprintln!("Error reading: {}", e);
            1
        }
    }
}

/// One REPL step: lex, parse, evaluate, echo the result's inspection.
/// Parse errors go to `out` and are not fatal.
pub fn repl_step(env: &Env, line: &str, out: &mut dyn Write) {
    let tokens = lexer::tokenize(line.trim());
    let mut parser = parser::Parser::new(tokens);
    let program = parser.parse();
    if !parser.errors().is_empty() {
        for error in parser.errors() {
            let _ = writeln!(out, "parse error: {}", error);
        }
        return;
    }
    if program.is_empty() {
        return;
    }
    let result = Interpreter::new().eval_program(&program, env);
    let _ = writeln!(out, "{}", result.inspect());
}

#[cfg(test)]
mod tests {
    use super::{base_environment, repl_step};

    #[test]
    fn test_repl_step_echoes_inspection() {
        crate::errors::set_interactive(true);
        let env = base_environment();
        let mut out = Vec::new();
        repl_step(&env, "1 + 2 * 3", &mut out);
        assert_eq!(String::from_utf8(out).unwrap(), "7\n");
    }

    #[test]
    fn test_repl_step_keeps_state_between_lines() {
        crate::errors::set_interactive(true);
        let env = base_environment();
        let mut out = Vec::new();
        repl_step(&env, "let x = 40", &mut out);
        out.clear();
        repl_step(&env, "x + 2", &mut out);
        assert_eq!(String::from_utf8(out).unwrap(), "42\n");
    }

    #[test]
    fn test_repl_step_reports_parse_errors() {
        crate::errors::set_interactive(true);
        let env = base_environment();
        let mut out = Vec::new();
        repl_step(&env, "let = 3", &mut out);
        assert!(String::from_utf8(out).unwrap().contains("parse error"));
    }
}
