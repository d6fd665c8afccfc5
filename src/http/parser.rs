use bytes::{Buf, BytesMut};
use thiserror::Error;

use crate::http::headers::{HeaderError, Headers};
use crate::http::request::{Method, Request, RequestLine};

const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed request line")]
    MalformedRequestLine,
    #[error("unsupported HTTP version: {0}")]
    UnsupportedVersion(String),
    #[error("malformed header line")]
    MalformedHeaderLine,
    #[error("invalid header name: {0:?}")]
    InvalidHeaderName(String),
    #[error("invalid Content-Length value")]
    InvalidContentLength,
    #[error("invalid chunk size line")]
    InvalidChunkSize,
    #[error("malformed chunk framing")]
    MalformedChunk,
}

impl From<HeaderError> for ParseError {
    fn from(err: HeaderError) -> Self {
        match err {
            HeaderError::InvalidHeaderName(name) => ParseError::InvalidHeaderName(name),
        }
    }
}

/// Where the parser is in the life of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Initialized,
    ParsingHeaders,
    ParsingBody,
    ParsingTrailers,
    Done,
    Error,
}

/// How the body section is framed, decided once the header section ends.
#[derive(Debug, Clone, Copy)]
enum BodyMode {
    Length { remaining: usize },
    Chunked(ChunkPhase),
}

#[derive(Debug, Clone, Copy)]
enum ChunkPhase {
    /// Expecting a `hex-size[;ext]` CRLF line.
    Size,
    /// Consuming chunk data.
    Data { remaining: usize },
    /// Expecting the CRLF that terminates a data chunk.
    DataEnd,
    /// Expecting the final CRLF after the zero-size chunk (no trailers).
    Last,
}

/// Incremental HTTP/1.1 request parser.
///
/// Fed by repeated `feed` calls carrying whatever the transport delivered;
/// each call appends to an internal buffer and advances the state machine as
/// far as the buffered bytes allow. The parser never blocks and never assumes
/// a read boundary lines up with a protocol boundary.
pub struct RequestParser {
    state: ParserState,
    buf: BytesMut,
    request_line: Option<RequestLine>,
    headers: Headers,
    body: Vec<u8>,
    mode: Option<BodyMode>,
    err: Option<ParseError>,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Initialized,
            buf: BytesMut::with_capacity(4096),
            request_line: None,
            headers: Headers::new(),
            body: Vec::new(),
            mode: None,
            err: None,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }

    /// Whether any bytes of the current request have been seen.
    ///
    /// Distinguishes a peer closing between requests (clean) from one closing
    /// mid-request (connection-level error).
    pub fn has_progress(&self) -> bool {
        self.state != ParserState::Initialized || !self.buf.is_empty()
    }

    /// Appends `data` and advances as far as possible.
    ///
    /// Returns the state reached. A parser already in its error state replays
    /// the original error and consumes nothing; feeding a finished parser is
    /// a no-op.
    pub fn feed(&mut self, data: &[u8]) -> Result<ParserState, ParseError> {
        match self.state {
            ParserState::Done => return Ok(ParserState::Done),
            ParserState::Error => {
                return Err(self.err.clone().unwrap_or(ParseError::MalformedRequestLine));
            }
            _ => {}
        }

        self.buf.extend_from_slice(data);

        loop {
            match self.advance() {
                Ok(true) if self.state != ParserState::Done => continue,
                Ok(_) => break,
                Err(e) => {
                    self.state = ParserState::Error;
                    self.err = Some(e.clone());
                    return Err(e);
                }
            }
        }

        Ok(self.state)
    }

    /// Consumes a finished parser, yielding the request plus any unconsumed
    /// bytes (the start of a pipelined follow-up request on keep-alive).
    ///
    /// Returns `None` unless the parser reached its terminal done state.
    pub fn finish(self) -> Option<(Request, BytesMut)> {
        if self.state != ParserState::Done {
            return None;
        }
        let request_line = self.request_line?;
        let request = Request {
            request_line,
            headers: self.headers,
            body: self.body,
        };
        Some((request, self.buf))
    }

    /// One state-machine step. `Ok(true)` means progress was made, `Ok(false)`
    /// means more input is needed.
    fn advance(&mut self) -> Result<bool, ParseError> {
        match self.state {
            ParserState::Initialized => {
                if !contains_crlf(&self.buf) {
                    return Ok(false);
                }
                let (request_line, consumed) = parse_request_line(&self.buf)?;
                self.buf.advance(consumed);
                self.request_line = Some(request_line);
                self.state = ParserState::ParsingHeaders;
                Ok(true)
            }
            ParserState::ParsingHeaders => {
                let Some(line) = self.take_line() else {
                    return Ok(false);
                };
                if line.is_empty() {
                    self.begin_body()?;
                } else {
                    let (name, value) = parse_header_line(&line)?;
                    self.headers.add(&name, &value)?;
                }
                Ok(true)
            }
            ParserState::ParsingBody => self.advance_body(),
            ParserState::ParsingTrailers => {
                let Some(line) = self.take_line() else {
                    return Ok(false);
                };
                if line.is_empty() {
                    self.state = ParserState::Done;
                } else {
                    let (name, value) = parse_header_line(&line)?;
                    self.headers.add(&name, &value)?;
                }
                Ok(true)
            }
            ParserState::Done | ParserState::Error => Ok(false),
        }
    }

    /// Decides the body strategy once the header section ends.
    fn begin_body(&mut self) -> Result<(), ParseError> {
        if let Some(te) = self.headers.get("transfer-encoding") {
            if te.trim().eq_ignore_ascii_case("chunked") {
                self.mode = Some(BodyMode::Chunked(ChunkPhase::Size));
                self.state = ParserState::ParsingBody;
                return Ok(());
            }
        }
        if let Some(cl) = self.headers.get("content-length") {
            let remaining: usize = cl
                .trim()
                .parse()
                .map_err(|_| ParseError::InvalidContentLength)?;
            if remaining == 0 {
                self.state = ParserState::Done;
            } else {
                self.mode = Some(BodyMode::Length { remaining });
                self.state = ParserState::ParsingBody;
            }
            return Ok(());
        }
        self.state = ParserState::Done;
        Ok(())
    }

    fn advance_body(&mut self) -> Result<bool, ParseError> {
        match self.mode {
            Some(BodyMode::Length { remaining }) => {
                if self.buf.is_empty() {
                    return Ok(false);
                }
                let take = self.buf.len().min(remaining);
                self.body.extend_from_slice(&self.buf[..take]);
                self.buf.advance(take);
                let left = remaining - take;
                if left == 0 {
                    self.mode = None;
                    self.state = ParserState::Done;
                    Ok(true)
                } else {
                    self.mode = Some(BodyMode::Length { remaining: left });
                    Ok(false)
                }
            }
            Some(BodyMode::Chunked(phase)) => self.advance_chunked(phase),
            // Unreachable: ParsingBody is only entered with a mode set.
            None => {
                self.state = ParserState::Done;
                Ok(true)
            }
        }
    }

    fn advance_chunked(&mut self, phase: ChunkPhase) -> Result<bool, ParseError> {
        match phase {
            ChunkPhase::Size => {
                let Some(line) = self.take_line() else {
                    return Ok(false);
                };
                let size = parse_chunk_size(&line)?;
                if size == 0 {
                    if self.headers.trailer_names().is_empty() {
                        self.mode = Some(BodyMode::Chunked(ChunkPhase::Last));
                    } else {
                        self.mode = None;
                        self.state = ParserState::ParsingTrailers;
                    }
                } else {
                    self.mode = Some(BodyMode::Chunked(ChunkPhase::Data { remaining: size }));
                }
                Ok(true)
            }
            ChunkPhase::Data { remaining } => {
                if self.buf.is_empty() {
                    return Ok(false);
                }
                let take = self.buf.len().min(remaining);
                self.body.extend_from_slice(&self.buf[..take]);
                self.buf.advance(take);
                let left = remaining - take;
                if left == 0 {
                    self.mode = Some(BodyMode::Chunked(ChunkPhase::DataEnd));
                    Ok(true)
                } else {
                    self.mode = Some(BodyMode::Chunked(ChunkPhase::Data { remaining: left }));
                    Ok(false)
                }
            }
            ChunkPhase::DataEnd => {
                if self.buf.len() < CRLF.len() {
                    return Ok(false);
                }
                if &self.buf[..CRLF.len()] != CRLF {
                    return Err(ParseError::MalformedChunk);
                }
                self.buf.advance(CRLF.len());
                self.mode = Some(BodyMode::Chunked(ChunkPhase::Size));
                Ok(true)
            }
            ChunkPhase::Last => {
                if self.buf.len() < CRLF.len() {
                    return Ok(false);
                }
                if &self.buf[..CRLF.len()] != CRLF {
                    return Err(ParseError::MalformedChunk);
                }
                self.buf.advance(CRLF.len());
                self.mode = None;
                self.state = ParserState::Done;
                Ok(true)
            }
        }
    }

    /// Splits off the next CRLF-terminated line (without the CRLF), if one is
    /// fully buffered.
    fn take_line(&mut self) -> Option<BytesMut> {
        let idx = find_crlf(&self.buf)?;
        let line = self.buf.split_to(idx);
        self.buf.advance(CRLF.len());
        Some(line)
    }
}

/// Parses `METHOD SP TARGET SP HTTP/VERSION CRLF` from the front of `buf`.
///
/// Returns the parsed line and the number of bytes consumed, CRLF included.
/// The caller is expected to have checked that a CRLF is present.
pub fn parse_request_line(buf: &[u8]) -> Result<(RequestLine, usize), ParseError> {
    let idx = find_crlf(buf).ok_or(ParseError::MalformedRequestLine)?;
    let text = std::str::from_utf8(&buf[..idx]).map_err(|_| ParseError::MalformedRequestLine)?;

    let mut parts = text.split(' ');
    let method_str = parts.next().ok_or(ParseError::MalformedRequestLine)?;
    let target = parts.next().ok_or(ParseError::MalformedRequestLine)?;
    let version_str = parts.next().ok_or(ParseError::MalformedRequestLine)?;
    if parts.next().is_some() || method_str.is_empty() || target.is_empty() {
        return Err(ParseError::MalformedRequestLine);
    }

    let method = Method::from_str(method_str).ok_or(ParseError::MalformedRequestLine)?;

    let version = version_str
        .strip_prefix("HTTP/")
        .ok_or(ParseError::MalformedRequestLine)?;
    if version.is_empty() {
        return Err(ParseError::MalformedRequestLine);
    }
    if version != "1.1" {
        return Err(ParseError::UnsupportedVersion(version.to_string()));
    }

    let request_line = RequestLine {
        method,
        request_target: target.to_string(),
        http_version: version.to_string(),
    };
    Ok((request_line, idx + CRLF.len()))
}

/// Splits a non-empty header line into name and value.
///
/// The colon is mandatory and the name must not contain whitespace; in
/// particular no space is allowed between the name and the colon. Values are
/// trimmed of optional whitespace.
fn parse_header_line(line: &[u8]) -> Result<(String, String), ParseError> {
    let text = std::str::from_utf8(line).map_err(|_| ParseError::MalformedHeaderLine)?;
    let (name, value) = text
        .trim()
        .split_once(':')
        .ok_or(ParseError::MalformedHeaderLine)?;
    if name.is_empty() || name.chars().any(|c| c.is_ascii_whitespace()) {
        return Err(ParseError::MalformedHeaderLine);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Parses a chunk-size line: hex digits with an optional `;extension` tail.
fn parse_chunk_size(line: &[u8]) -> Result<usize, ParseError> {
    let text = std::str::from_utf8(line).map_err(|_| ParseError::InvalidChunkSize)?;
    let size_part = match text.split_once(';') {
        Some((size, _ext)) => size,
        None => text,
    };
    let size_part = size_part.trim();
    if size_part.is_empty() {
        return Err(ParseError::InvalidChunkSize);
    }
    usize::from_str_radix(size_part, 16).map_err(|_| ParseError::InvalidChunkSize)
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(CRLF.len()).position(|w| w == CRLF)
}

fn contains_crlf(buf: &[u8]) -> bool {
    find_crlf(buf).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let (line, consumed) = parse_request_line(b"GET /hello HTTP/1.1\r\n").unwrap();

        assert_eq!(line.method, Method::GET);
        assert_eq!(line.request_target, "/hello");
        assert_eq!(line.http_version, "1.1");
        assert_eq!(consumed, 21);
    }

    #[test]
    fn feed_whole_request_at_once() {
        let mut parser = RequestParser::new();
        let state = parser
            .feed(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n")
            .unwrap();

        assert_eq!(state, ParserState::Done);
        let (req, rest) = parser.finish().unwrap();
        assert_eq!(req.request_line.request_target, "/");
        assert_eq!(req.header("host"), Some("example.com"));
        assert!(rest.is_empty());
    }
}
