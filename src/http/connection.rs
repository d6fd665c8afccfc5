use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::http::parser::{ParseError, RequestParser};
use crate::http::request::Request;
use crate::http::response::{StatusCode, default_headers};
use crate::http::writer::{ResponseWriter, WriteError};
use crate::server::router::Router;

/// Orchestrates one accepted socket: drives the parser on inbound bytes,
/// dispatches the parsed request, and hands the handler a writer bound to the
/// same stream.
pub struct Connection {
    stream: TcpStream,
    router: Arc<Router>,
    read_timeout: Duration,
    /// Bytes read past the end of the previous request (pipelined input),
    /// fed into the next parser on keep-alive.
    carry: BytesMut,
}

/// What reading one request produced.
enum ReadOutcome {
    Complete(Request),
    /// Peer closed cleanly between requests.
    Closed,
    Malformed(ParseError),
}

impl Connection {
    pub fn new(stream: TcpStream, router: Arc<Router>, read_timeout: Duration) -> Self {
        Self {
            stream,
            router,
            read_timeout,
            carry: BytesMut::new(),
        }
    }

    /// Serves requests on this connection until it closes.
    ///
    /// The default lifetime is one request/response exchange; the loop
    /// continues only when the client explicitly negotiated keep-alive and
    /// the previous exchange completed cleanly. Error responses always close.
    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            let outcome = match timeout(self.read_timeout, self.read_request()).await {
                Ok(outcome) => outcome?,
                Err(_) => {
                    debug!("read timed out, closing connection");
                    return Ok(());
                }
            };

            let request = match outcome {
                ReadOutcome::Complete(request) => request,
                ReadOutcome::Closed => return Ok(()),
                ReadOutcome::Malformed(err) => {
                    warn!(error = %err, "rejecting malformed request");
                    self.send_simple(
                        StatusCode::BadRequest,
                        &format!("Error parsing request: {err}"),
                    )
                    .await
                    .ok();
                    return Ok(());
                }
            };

            let keep_alive = request.keep_alive();
            let target = request.request_line.request_target.clone();
            let router = Arc::clone(&self.router);

            match router.lookup(&target) {
                None => {
                    debug!(target = %target, "no handler registered");
                    self.send_simple(StatusCode::NotFound, &format!("Path '{target}' not found"))
                        .await?;
                    return Ok(());
                }
                Some(handler) => {
                    let mut writer = ResponseWriter::new(&mut self.stream);
                    let result = handler(&mut writer, &request).await;
                    let started = writer.has_started();
                    let complete = writer.is_complete();
                    drop(writer);

                    match result {
                        Ok(()) => {
                            if !complete {
                                debug!(target = %target, "handler left response unfinished");
                                return Ok(());
                            }
                        }
                        Err(err) => {
                            warn!(target = %target, error = %err, "handler failed");
                            if !started {
                                self.send_simple(
                                    StatusCode::InternalServerError,
                                    "Internal Server Error",
                                )
                                .await
                                .ok();
                            }
                            return Ok(());
                        }
                    }
                }
            }

            if !keep_alive {
                return Ok(());
            }
            debug!("keep-alive negotiated, awaiting next request");
        }
    }

    /// Reads from the socket into a fresh parser until a request completes.
    ///
    /// Parse errors are reported as an outcome so the caller can answer with
    /// a 400; I/O errors and mid-request EOF propagate as connection errors.
    async fn read_request(&mut self) -> anyhow::Result<ReadOutcome> {
        let mut parser = RequestParser::new();

        if !self.carry.is_empty() {
            let pending = self.carry.split();
            if let Err(err) = parser.feed(&pending) {
                return Ok(ReadOutcome::Malformed(err));
            }
        }

        let mut chunk = [0u8; 4096];
        while !parser.is_done() {
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                if parser.has_progress() {
                    anyhow::bail!("peer closed connection mid-request");
                }
                return Ok(ReadOutcome::Closed);
            }
            if let Err(err) = parser.feed(&chunk[..n]) {
                return Ok(ReadOutcome::Malformed(err));
            }
        }

        match parser.finish() {
            Some((request, rest)) => {
                self.carry = rest;
                Ok(ReadOutcome::Complete(request))
            }
            None => anyhow::bail!("parser reported done without a request"),
        }
    }

    /// Writes a minimal plain-text response. Used for the 400/404/500 paths,
    /// which always close the connection afterwards.
    async fn send_simple(&mut self, status: StatusCode, message: &str) -> Result<(), WriteError> {
        let mut writer = ResponseWriter::new(&mut self.stream);
        writer.write_status_line(status).await?;
        writer
            .write_headers(&default_headers(message.len(), false))
            .await?;
        writer.write_body(message.as_bytes()).await?;
        Ok(())
    }
}
