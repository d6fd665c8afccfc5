use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::Headers;
use crate::http::response::StatusCode;

/// Which framing stage the response has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    NotStarted,
    StatusWritten,
    HeadersWritten,
    /// At least one chunk has been written; more may follow.
    Streaming,
    /// The terminating zero chunk went out and declared trailers are owed.
    AwaitingTrailers,
    Done,
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("write not permitted in state {0:?}")]
    OutOfOrderWrite(WriterState),
    #[error("empty chunk; use write_chunked_body_done to end the body")]
    EmptyChunk,
    #[error("response headers did not declare trailers")]
    TrailersNotDeclared,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Serializes one HTTP/1.1 response onto a stream, enforcing write order.
///
/// Status line, then headers, then body; chunked bodies end with
/// `write_chunked_body_done`, followed by `write_trailers` when the headers
/// declared any. Calls outside that order fail with
/// [`WriteError::OutOfOrderWrite`] and emit nothing.
pub struct ResponseWriter<'a> {
    stream: &'a mut (dyn AsyncWrite + Unpin + Send),
    state: WriterState,
    trailers_declared: bool,
}

impl<'a> ResponseWriter<'a> {
    pub fn new<W>(stream: &'a mut W) -> Self
    where
        W: AsyncWrite + Unpin + Send,
    {
        Self {
            stream,
            state: WriterState::NotStarted,
            trailers_declared: false,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Whether any response bytes have been written to the stream.
    pub fn has_started(&self) -> bool {
        self.state != WriterState::NotStarted
    }

    /// Whether the response was fully framed.
    pub fn is_complete(&self) -> bool {
        self.state == WriterState::Done
    }

    /// Writes `HTTP/1.1 <code> <reason>\r\n`. Must be the first write.
    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<(), WriteError> {
        if self.state != WriterState::NotStarted {
            return Err(WriteError::OutOfOrderWrite(self.state));
        }
        self.stream.write_all(&status.status_line()).await?;
        self.state = WriterState::StatusWritten;
        Ok(())
    }

    /// Writes the header section and its terminating empty line.
    ///
    /// Remembers whether `headers` declared trailer names; that decides what
    /// `write_chunked_body_done` and `write_trailers` later accept.
    pub async fn write_headers(&mut self, headers: &Headers) -> Result<(), WriteError> {
        if self.state != WriterState::StatusWritten {
            return Err(WriteError::OutOfOrderWrite(self.state));
        }
        let mut buf = headers.serialize();
        buf.extend_from_slice(b"\r\n");
        self.stream.write_all(&buf).await?;
        self.trailers_declared = !headers.trailer_names().is_empty();
        self.state = WriterState::HeadersWritten;
        Ok(())
    }

    /// Writes a raw body in one shot and finishes the response.
    ///
    /// The caller owns Content-Length correctness; nothing is recomputed here.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<(), WriteError> {
        if self.state != WriterState::HeadersWritten {
            return Err(WriteError::OutOfOrderWrite(self.state));
        }
        self.stream.write_all(body).await?;
        self.state = WriterState::Done;
        Ok(())
    }

    /// Writes one chunk as `<hex-size>\r\n<data>\r\n`.
    pub async fn write_chunked_body(&mut self, data: &[u8]) -> Result<(), WriteError> {
        if self.state != WriterState::HeadersWritten && self.state != WriterState::Streaming {
            return Err(WriteError::OutOfOrderWrite(self.state));
        }
        if data.is_empty() {
            return Err(WriteError::EmptyChunk);
        }
        let mut buf = format!("{:x}\r\n", data.len()).into_bytes();
        buf.extend_from_slice(data);
        buf.extend_from_slice(b"\r\n");
        self.stream.write_all(&buf).await?;
        self.state = WriterState::Streaming;
        Ok(())
    }

    /// Terminates a chunked body with the zero-size chunk.
    ///
    /// Legal straight from the header section for a zero-chunk body. Without
    /// declared trailers this also writes the final CRLF and finishes the
    /// response; with trailers the writer waits for `write_trailers`.
    pub async fn write_chunked_body_done(&mut self) -> Result<(), WriteError> {
        if self.state != WriterState::HeadersWritten && self.state != WriterState::Streaming {
            return Err(WriteError::OutOfOrderWrite(self.state));
        }
        if self.trailers_declared {
            self.stream.write_all(b"0\r\n").await?;
            self.state = WriterState::AwaitingTrailers;
        } else {
            self.stream.write_all(b"0\r\n\r\n").await?;
            self.state = WriterState::Done;
        }
        Ok(())
    }

    /// Writes the trailer section after a chunked body.
    ///
    /// Only legal once `write_chunked_body_done` has run on a response whose
    /// headers declared trailer names.
    pub async fn write_trailers(&mut self, trailers: &Headers) -> Result<(), WriteError> {
        if !self.trailers_declared {
            return Err(WriteError::TrailersNotDeclared);
        }
        if self.state != WriterState::AwaitingTrailers {
            return Err(WriteError::OutOfOrderWrite(self.state));
        }
        let mut buf = trailers.serialize();
        buf.extend_from_slice(b"\r\n");
        self.stream.write_all(&buf).await?;
        self.state = WriterState::Done;
        Ok(())
    }
}
