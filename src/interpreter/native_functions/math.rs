// File: src/interpreter/native_functions/math.rs
//
// The math.* built-ins.

use super::{register_builtin, Env};
use crate::interpreter::value::Value;
use rand::Rng;

pub fn register() {
    register_builtin("math.abs", math_abs);
    register_builtin("math.rand", math_rand);
    register_builtin("math.sqrt", math_sqrt);
}

/// Absolute value, type-preserving.
fn math_abs(_env: &Env, args: &[Value]) -> Value {
    if args.len() != 1 {
        return Value::error(format!("wrong number of arguments. got={}, want=1", args.len()));
    }
    match &args[0] {
        Value::Int(n) => Value::Int(n.wrapping_abs()),
        Value::Float(n) => Value::Float(n.abs()),
        other => Value::error(format!(
            "argument to `math.abs` not supported, got={}",
            other.type_name()
        )),
    }
}

fn math_rand(_env: &Env, _args: &[Value]) -> Value {
    Value::Float(rand::thread_rng().gen::<f64>())
}

/// Square root; always yields a float.
fn math_sqrt(_env: &Env, args: &[Value]) -> Value {
    if args.len() != 1 {
        return Value::error(format!("wrong number of arguments. got={}, want=1", args.len()));
    }
    match &args[0] {
        Value::Int(n) => Value::Float((*n as f64).sqrt()),
        Value::Float(n) => Value::Float(n.sqrt()),
        other => Value::error(format!(
            "argument to `math.sqrt` not supported, got={}",
            other.type_name()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::{math_abs, math_rand, math_sqrt};
    use crate::interpreter::{Environment, Value};

    #[test]
    fn test_abs_preserves_type() {
        let env = Environment::new();
        assert!(matches!(math_abs(&env, &[Value::Int(-3)]), Value::Int(3)));
        match math_abs(&env, &[Value::Float(-2.5)]) {
            Value::Float(n) => assert_eq!(n, 2.5),
            other => panic!("expected float, got {:?}", other),
        }
        assert!(math_abs(&env, &[Value::str("x")]).is_error());
    }

    #[test]
    fn test_sqrt_returns_float() {
        let env = Environment::new();
        match math_sqrt(&env, &[Value::Int(9)]) {
            Value::Float(n) => assert_eq!(n, 3.0),
            other => panic!("expected float, got {:?}", other),
        }
    }

    #[test]
    fn test_rand_range() {
        let env = Environment::new();
        for _ in 0..10 {
            match math_rand(&env, &[]) {
                Value::Float(n) => assert!((0.0..1.0).contains(&n)),
                other => panic!("expected float, got {:?}", other),
            }
        }
    }
}
