// File: src/interpreter/native_functions/time.rs
//
// The time.* built-ins.

use super::{register_builtin, Env};
use crate::interpreter::value::Value;
use chrono::format::{Item, StrftimeItems};
use chrono::{TimeZone, Utc};
use std::thread;
use std::time::Duration;

pub fn register() {
    register_builtin("time.now", time_now);
    register_builtin("time.ms", time_ms);
    register_builtin("time.sleep", time_sleep);
    register_builtin("time.strftime", time_strftime);
}

fn time_now(_env: &Env, _args: &[Value]) -> Value {
    Value::Int(Utc::now().timestamp())
}

fn time_ms(_env: &Env, _args: &[Value]) -> Value {
    Value::Int(Utc::now().timestamp_millis())
}

/// Sleeps for the given number of seconds; fractions are allowed.
fn time_sleep(_env: &Env, args: &[Value]) -> Value {
    let seconds = match args.first() {
        Some(Value::Int(n)) if *n >= 0 => *n as f64,
        Some(Value::Float(n)) if *n >= 0.0 => *n,
        _ => return Value::error("time.sleep expected a non-negative number!"),
    };
    thread::sleep(Duration::from_secs_f64(seconds));
    Value::Null
}

/// `time.strftime(fmt[, unix_seconds])` — formats UTC time with
/// strftime specifiers; defaults to now.
fn time_strftime(_env: &Env, args: &[Value]) -> Value {
    let fmt = match args.first() {
        Some(Value::Str(fmt)) => fmt.as_ref().clone(),
        _ => return Value::error("time.strftime expected a format string!"),
    };
    let when = match args.get(1) {
        Some(Value::Int(secs)) => match Utc.timestamp_opt(*secs, 0).single() {
            Some(when) => when,
            None => return Value::error(format!("time.strftime: invalid timestamp {}", secs)),
        },
        Some(other) => {
            return Value::error(format!(
                "time.strftime expected an integer timestamp, got {}",
                other.type_name()
            ))
        }
        None => Utc::now(),
    };

    let items: Vec<Item> = StrftimeItems::new(&fmt).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Value::error(format!("time.strftime: bad format `{}`", fmt));
    }
    Value::str(when.format_with_items(items.into_iter()).to_string())
}

#[cfg(test)]
mod tests {
    use super::{time_ms, time_now, time_strftime};
    use crate::interpreter::{Environment, Value};

    #[test]
    fn test_now_and_ms_agree() {
        let env = Environment::new();
        let (now, ms) = match (time_now(&env, &[]), time_ms(&env, &[])) {
            (Value::Int(now), Value::Int(ms)) => (now, ms),
            other => panic!("expected integers, got {:?}", other),
        };
        assert!((ms / 1000 - now).abs() <= 1);
    }

    #[test]
    fn test_strftime_fixed_timestamp() {
        let env = Environment::new();
        match time_strftime(&env, &[Value::str("%Y-%m-%d"), Value::Int(0)]) {
            Value::Str(out) => assert_eq!(out.as_ref(), "1970-01-01"),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn test_strftime_rejects_bad_format() {
        let env = Environment::new();
        assert!(time_strftime(&env, &[Value::str("%Q__"), Value::Int(0)]).is_error());
        assert!(time_strftime(&env, &[Value::Int(1)]).is_error());
    }
}
