// File: src/interpreter/native_functions/http.rs
//
// The HTTP client built-in. One entry point drives every method:
//
//   http.create_client(method, url)
//   http.create_client(method, url, headers_hash)
//   http.create_client(method, url, body_string)
//   http.create_client(method, url, headers_hash, body_string)
//
// The response is a hash of {status_code, protocol, body, headers}.
// Transport failures surface as Error values.

use super::{register_builtin, Env};
use crate::interpreter::value::Value;
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub fn register() {
    register_builtin("http.create_client", http_create_client);
}

fn http_create_client(_env: &Env, args: &[Value]) -> Value {
    let method = match args.first() {
        Some(Value::Str(m)) => m.as_ref().to_uppercase(),
        _ => return Value::error("http client expected method as first arg!"),
    };
    let url = match args.get(1) {
        Some(Value::Str(u)) => u.as_ref().clone(),
        _ => return Value::error("http client expected uri as second arg!"),
    };

    let mut headers: HashMap<String, String> = HashMap::new();
    let mut body = String::new();

    match args.get(2) {
        Some(Value::Hash(store)) => {
            for pair in store.borrow().values() {
                headers.insert(pair.key.inspect(), pair.value.inspect());
            }
        }
        Some(Value::Str(b)) => body = b.as_ref().clone(),
        Some(Value::Null) | None => {}
        Some(_) => return Value::error("http client expected headers or body as third arg!"),
    }
    match args.get(3) {
        Some(Value::Str(b)) => body = b.as_ref().clone(),
        Some(Value::Null) | None => {}
        Some(_) => return Value::error("http client expected body as fourth arg!"),
    }

    let client = match reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
    {
        Ok(client) => client,
        Err(e) => return Value::error(e.to_string()),
    };

    let method = match reqwest::Method::from_bytes(method.as_bytes()) {
        Ok(method) => method,
        Err(_) => return Value::error("http client got an invalid method!"),
    };

    let mut request =
        client.request(method.clone(), url.as_str()).header("Content-Type", "text/plain");
    for (name, value) in &headers {
        request = request.header(name.as_str(), value.as_str());
    }
    // GET and DELETE carry no body
    if !body.is_empty() && method != reqwest::Method::GET && method != reqwest::Method::DELETE {
        request = request.body(body);
    }

    let response = match request.send() {
        Ok(response) => response,
        Err(e) => return Value::error(e.to_string()),
    };

    let status_code = response.status().as_u16() as i64;
    let protocol = format!("{:?}", response.version());

    let mut header_pairs: Vec<(String, Value)> = Vec::new();
    for (name, value) in response.headers() {
        header_pairs
            .push((name.to_string(), Value::str(value.to_str().unwrap_or("").to_string())));
    }

    let body = match response.text() {
        Ok(body) => body,
        Err(e) => return Value::error(e.to_string()),
    };

    let headers_value =
        Value::hash_of(header_pairs.iter().map(|(k, v)| (k.as_str(), v.clone())).collect());

    Value::hash_of(vec![
        ("status_code", Value::Int(status_code)),
        ("protocol", Value::str(protocol)),
        ("body", Value::str(body)),
        ("headers", headers_value),
    ])
}

#[cfg(test)]
mod tests {
    use super::http_create_client;
    use crate::interpreter::{Environment, Value};

    #[test]
    fn test_argument_shape_validation() {
        let env = Environment::new();
        assert!(http_create_client(&env, &[]).is_error());
        assert!(http_create_client(&env, &[Value::Int(1)]).is_error());
        assert!(http_create_client(&env, &[Value::str("GET")]).is_error());
        assert!(http_create_client(
            &env,
            &[Value::str("GET"), Value::str("http://localhost:1"), Value::Int(3)]
        )
        .is_error());
    }

    #[test]
    fn test_unreachable_host_surfaces_error_value() {
        let env = Environment::new();
        // nothing listens on port 1; the transport error must come back
        // as a value, not a panic
        let result =
            http_create_client(&env, &[Value::str("GET"), Value::str("http://127.0.0.1:1/")]);
        assert!(result.is_error());
    }
}
