use crate::http::headers::Headers;

/// HTTP status codes recognized by the server core.
///
/// - `Ok` (200): request successful
/// - `BadRequest` (400): malformed request
/// - `NotFound` (404): no handler registered for the target
/// - `InternalServerError` (500): handler failed before writing anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    BadRequest,
    NotFound,
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }

    /// Serializes the full status line, CRLF included.
    pub fn status_line(&self) -> Vec<u8> {
        format!("HTTP/1.1 {} {}\r\n", self.as_u16(), self.reason_phrase()).into_bytes()
    }
}

/// Default response headers for a body of known length.
///
/// Handlers may override any entry before calling `write_headers`.
pub fn default_headers(content_len: usize, keep_alive: bool) -> Headers {
    let mut headers = Headers::new();
    let connection = if keep_alive { "keep-alive" } else { "close" };
    // Fixed token names, insertion cannot fail.
    for (name, value) in [
        ("content-length", content_len.to_string()),
        ("connection", connection.to_string()),
        ("content-type", "text/plain".to_string()),
    ] {
        let _ = headers.set(name, &value);
    }
    headers
}
