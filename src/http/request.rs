//! Inbound request parsing.
//!
//! The environment (axum) delivers raw parts; this module reduces them to
//! the router's working set: method, exact path, a flat parameter map, and
//! the bearer value. GET requests take parameters from the query string,
//! everything else from a JSON object body. A missing or malformed body
//! yields an empty parameter set, not an error.

use axum::http::{HeaderMap, Method, Uri};
use serde_json::{Map, Value};

pub type Params = Map<String, Value>;

#[derive(Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub params: Params,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn from_parts(method: Method, uri: &Uri, headers: &HeaderMap, body: &[u8]) -> Self {
        let params = if method == Method::GET {
            parse_query(uri.query().unwrap_or_default())
        } else {
            parse_body(body)
        };

        Self {
            method,
            path: uri.path().to_string(),
            params,
            bearer: extract_bearer(headers),
        }
    }
}

/// Decode query-string pairs. Values arrive as text, so digits are coerced
/// to numbers to line up with what JSON bodies deliver.
fn parse_query(query: &str) -> Params {
    let mut params = Params::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        params.insert(key.into_owned(), coerce_scalar(&value));
    }
    params
}

fn coerce_scalar(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::from(f);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

fn parse_body(body: &[u8]) -> Params {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => Params::new(),
    }
}

/// Pull the token out of `Authorization: Bearer <token>`, tolerating header
/// name capitalization.
fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("authorization")?.to_str().ok()?;
    let token = raw.trim().strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_requests_read_parameters_from_the_query_string() {
        let uri: Uri = "/user?id=3&name=Ana".parse().unwrap();
        let req = ApiRequest::from_parts(Method::GET, &uri, &HeaderMap::new(), b"");
        assert_eq!(req.path, "/user");
        assert_eq!(req.params["id"], json!(3));
        assert_eq!(req.params["name"], json!("Ana"));
    }

    #[test]
    fn other_verbs_read_a_json_object_body() {
        let uri: Uri = "/type/store".parse().unwrap();
        let body = br#"{"name": "Beverages", "tax": 8}"#;
        let req = ApiRequest::from_parts(Method::POST, &uri, &HeaderMap::new(), body);
        assert_eq!(req.params["name"], json!("Beverages"));
        assert_eq!(req.params["tax"], json!(8));
    }

    #[test]
    fn absent_or_malformed_bodies_yield_an_empty_parameter_set() {
        let uri: Uri = "/login".parse().unwrap();
        for body in [&b""[..], b"not json", b"[1, 2]"] {
            let req = ApiRequest::from_parts(Method::POST, &uri, &HeaderMap::new(), body);
            assert!(req.params.is_empty());
        }
    }

    #[test]
    fn bearer_extraction_requires_the_scheme_and_a_value() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer abc.def.ghi".parse().unwrap());
        let uri: Uri = "/user".parse().unwrap();
        let req = ApiRequest::from_parts(Method::GET, &uri, &headers, b"");
        assert_eq!(req.bearer.as_deref(), Some("abc.def.ghi"));

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Basic abc".parse().unwrap());
        let req = ApiRequest::from_parts(Method::GET, &uri, &headers, b"");
        assert_eq!(req.bearer, None);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer ".parse().unwrap());
        let req = ApiRequest::from_parts(Method::GET, &uri, &headers, b"");
        assert_eq!(req.bearer, None);
    }
}
