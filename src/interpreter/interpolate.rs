// File: src/interpreter/interpolate.rs
//
// `{{...}}` expansion for string literals. A fragment is first looked up
// as a plain name in the environment; failing that it is parsed as an
// expression by a fresh lexer/parser and evaluated against the current
// environment. Unresolvable fragments collapse to empty text, and a
// leading backslash escapes the whole marker.

use once_cell::sync::Lazy;
use regex::Regex;

use super::environment::Env;
use super::Interpreter;
use crate::lexer;
use crate::parser::Parser;

static MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)(\\)?(\{\{)(.*?)(\}\})").expect("interpolation pattern"));

/// Expands every `{{...}}` fragment in `input` against `env`.
pub fn interpolate(input: &str, env: &Env) -> String {
    MARKER
        .replace_all(input, |caps: &regex::Captures| {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or("");
            // \{{name}} is an escape for the literal marker
            if caps.get(1).is_some() {
                return whole[1..].to_string();
            }

            let name = caps.get(3).map(|m| m.as_str()).unwrap_or("");
            if let Some(value) = env.borrow().get(name) {
                return value.inspect();
            }
            eval_fragment(name, env)
        })
        .into_owned()
}

/// Spins up a whole new lexer/parser/evaluator for the fragment, the
/// same thing module import does. Anything that fails to parse or
/// evaluate becomes empty text.
fn eval_fragment(fragment: &str, env: &Env) -> String {
    let tokens = lexer::tokenize(fragment);
    let mut parser = Parser::new(tokens);
    let program = parser.parse();
    if !parser.errors().is_empty() || program.is_empty() {
        return String::new();
    }

    let interp = Interpreter::new_quiet();
    let result = interp.eval_program(&program, env);
    if result.is_error() {
        return String::new();
    }
    result.inspect()
}

#[cfg(test)]
mod tests {
    use super::interpolate;
    use crate::interpreter::{Environment, Value};

    #[test]
    fn test_plain_name_lookup() {
        let env = Environment::new();
        env.borrow_mut().set_let("y", Value::Int(5));
        assert_eq!(interpolate("x={{y}}", &env), "x=5");
    }

    #[test]
    fn test_expression_fallback() {
        let env = Environment::new();
        assert_eq!(interpolate("x={{1+2}}", &env), "x=3");
    }

    #[test]
    fn test_unknown_name_collapses_to_empty() {
        let env = Environment::new();
        assert_eq!(interpolate("x={{y}}", &env), "x=");
    }

    #[test]
    fn test_escaped_marker_left_verbatim() {
        let env = Environment::new();
        env.borrow_mut().set_let("y", Value::Int(5));
        assert_eq!(interpolate(r"x=\{{y}}", &env), "x={{y}}");
    }

    #[test]
    fn test_malformed_closer_untouched() {
        let env = Environment::new();
        env.borrow_mut().set_let("y", Value::Int(5));
        assert_eq!(interpolate("my {{y", &env), "my {{y");
    }
}
