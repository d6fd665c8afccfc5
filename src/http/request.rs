use crate::http::headers::Headers;

/// HTTP request methods.
///
/// The verbs accepted on a request line. The server itself does not restrict
/// which methods a handler may serve; anything outside this set fails request
/// line parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    OPTIONS,
    PATCH,
    CONNECT,
    TRACE,
}

impl Method {
    /// Parses an HTTP method from its uppercase wire form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "PATCH" => Some(Method::PATCH),
            "CONNECT" => Some(Method::CONNECT),
            "TRACE" => Some(Method::TRACE),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::CONNECT => "CONNECT",
            Method::TRACE => "TRACE",
        }
    }
}

/// The first line of a request: `METHOD SP TARGET SP HTTP/VERSION`.
///
/// The target is kept opaque (origin-form string); handlers split path and
/// query themselves if they care.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub request_target: String,
    /// Version digits only, always `"1.1"` for a successfully parsed line.
    pub http_version: String,
}

/// A fully parsed HTTP request.
///
/// Only ever produced by a parser that reached its terminal state; the body
/// is fully materialized, never a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub request_line: RequestLine,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Request {
    /// Retrieves a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// The Content-Length value, or 0 when missing or unparsable.
    pub fn content_length(&self) -> usize {
        self.header("content-length")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Whether the client explicitly negotiated keep-alive.
    ///
    /// The server's default is to close after one exchange; only an explicit
    /// `Connection: keep-alive` keeps the socket open.
    pub fn keep_alive(&self) -> bool {
        self.header("connection")
            .map(|v| v.eq_ignore_ascii_case("keep-alive"))
            .unwrap_or(false)
    }
}
