use anyhow::{Context, Result, bail};
use bytes::{Buf, BytesMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::Url;

use crate::http::headers::Headers;

const BUFFER_SIZE: usize = 8192;
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// A response read back from the upstream service.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// One-shot HTTP/1.1 client for a fixed upstream base URL.
pub struct UpstreamClient {
    base: Url,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(base: &str, connect_timeout: Duration, request_timeout: Duration) -> Result<Self> {
        let base = Url::parse(base).context("invalid upstream URL")?;
        Ok(Self {
            base,
            connect_timeout,
            request_timeout,
        })
    }

    /// Sends `GET <path>` to the upstream and reads the whole response.
    pub async fn get(&self, path: &str) -> Result<UpstreamResponse> {
        let host = self.base.host_str().context("upstream URL missing host")?;
        let port = self.base.port().unwrap_or(80);
        let addr = format!("{host}:{port}");

        let mut stream = timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .context("connection timeout")?
            .context("failed to connect to upstream")?;

        tracing::debug!(upstream = %addr, path = %path, "forwarding request to upstream");

        let request = format!("GET {path} HTTP/1.1\r\nhost: {host}\r\nconnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await?;
        stream.flush().await?;

        timeout(self.request_timeout, read_response(&mut stream))
            .await
            .context("request timeout")?
    }
}

/// Reads a full response: header block, then body by Content-Length or until
/// the upstream closes.
async fn read_response(stream: &mut TcpStream) -> Result<UpstreamResponse> {
    let mut buf = BytesMut::with_capacity(BUFFER_SIZE);

    let head_len = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        if buf.len() > MAX_HEAD_SIZE {
            bail!("upstream response headers too large");
        }
        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            bail!("upstream closed before sending complete headers");
        }
    };

    let head = buf.split_to(head_len);
    let (status, headers) = parse_head(&head)?;
    let body = read_body(stream, &mut buf, &headers).await?;

    Ok(UpstreamResponse {
        status,
        headers,
        body,
    })
}

/// Parses the status line and header block of an upstream response.
pub fn parse_head(head: &[u8]) -> Result<(u16, Headers)> {
    let text = std::str::from_utf8(head).context("non-UTF-8 response head")?;
    let mut lines = text.split("\r\n");

    let status_line = lines.next().context("empty upstream response")?;
    let mut parts = status_line.splitn(3, ' ');
    let _version = parts.next();
    let status: u16 = parts
        .next()
        .context("status line missing code")?
        .parse()
        .context("invalid status code")?;

    let mut headers = Headers::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .with_context(|| format!("malformed upstream header line: {line:?}"))?;
        headers.add(name.trim(), value.trim())?;
    }

    Ok((status, headers))
}

async fn read_body(
    stream: &mut TcpStream,
    buf: &mut BytesMut,
    headers: &Headers,
) -> Result<Vec<u8>> {
    if let Some(cl) = headers.get("content-length") {
        let want: usize = cl.trim().parse().context("invalid upstream Content-Length")?;
        let mut body = Vec::with_capacity(want);

        let take = buf.len().min(want);
        body.extend_from_slice(&buf[..take]);
        buf.advance(take);

        while body.len() < want {
            let n = stream.read_buf(buf).await?;
            if n == 0 {
                bail!("upstream closed before sending complete body");
            }
            let take = buf.len().min(want - body.len());
            body.extend_from_slice(&buf[..take]);
            buf.advance(take);
        }
        return Ok(body);
    }

    // No Content-Length: the upstream signals the end by closing.
    let mut body = buf.to_vec();
    buf.clear();
    loop {
        let n = stream.read_buf(buf).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(buf);
        buf.clear();
    }
    Ok(body)
}
