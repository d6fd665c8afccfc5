use streamline::http::headers::Headers;
use streamline::http::request::{Method, Request, RequestLine};

fn request_with(headers: Headers) -> Request {
    Request {
        request_line: RequestLine {
            method: Method::GET,
            request_target: "/".to_string(),
            http_version: "1.1".to_string(),
        },
        headers,
        body: Vec::new(),
    }
}

#[test]
fn test_method_from_str() {
    assert_eq!(Method::from_str("GET"), Some(Method::GET));
    assert_eq!(Method::from_str("POST"), Some(Method::POST));
    assert_eq!(Method::from_str("TRACE"), Some(Method::TRACE));
    assert_eq!(Method::from_str("get"), None);
    assert_eq!(Method::from_str("BREW"), None);
}

#[test]
fn test_method_as_str_roundtrip() {
    for method in [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::HEAD,
        Method::OPTIONS,
        Method::PATCH,
        Method::CONNECT,
        Method::TRACE,
    ] {
        assert_eq!(Method::from_str(method.as_str()), Some(method));
    }
}

#[test]
fn test_header_lookup_is_case_insensitive() {
    let mut headers = Headers::new();
    headers.set("Host", "example.com").unwrap();
    let req = request_with(headers);

    assert_eq!(req.header("HOST"), Some("example.com"));
}

#[test]
fn test_content_length_defaults_to_zero() {
    let req = request_with(Headers::new());
    assert_eq!(req.content_length(), 0);

    let mut headers = Headers::new();
    headers.set("content-length", "not a number").unwrap();
    let req = request_with(headers);
    assert_eq!(req.content_length(), 0);
}

#[test]
fn test_content_length_parses() {
    let mut headers = Headers::new();
    headers.set("Content-Length", "43").unwrap();
    let req = request_with(headers);

    assert_eq!(req.content_length(), 43);
}

#[test]
fn test_connection_defaults_to_close() {
    let req = request_with(Headers::new());
    assert!(!req.keep_alive());
}

#[test]
fn test_explicit_keep_alive() {
    let mut headers = Headers::new();
    headers.set("Connection", "Keep-Alive").unwrap();
    let req = request_with(headers);
    assert!(req.keep_alive());

    let mut headers = Headers::new();
    headers.set("Connection", "close").unwrap();
    let req = request_with(headers);
    assert!(!req.keep_alive());
}
