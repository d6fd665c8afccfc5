use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use streamline::http::headers::Headers;
use streamline::http::request::Request;
use streamline::http::response::{StatusCode, default_headers};
use streamline::http::writer::ResponseWriter;
use streamline::server::{HandlerFuture, Server, ServerBuilder};

fn hello<'a, 'b>(w: &'a mut ResponseWriter<'b>, req: &'a Request) -> HandlerFuture<'a> {
    Box::pin(async move {
        let body = b"hello";
        w.write_status_line(StatusCode::Ok).await?;
        w.write_headers(&default_headers(body.len(), req.keep_alive()))
            .await?;
        w.write_body(body).await?;
        Ok(())
    })
}

fn slow_a<'a, 'b>(w: &'a mut ResponseWriter<'b>, _req: &'a Request) -> HandlerFuture<'a> {
    Box::pin(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let body = b"response-a";
        w.write_status_line(StatusCode::Ok).await?;
        w.write_headers(&default_headers(body.len(), false)).await?;
        w.write_body(body).await?;
        Ok(())
    })
}

fn slow_b<'a, 'b>(w: &'a mut ResponseWriter<'b>, _req: &'a Request) -> HandlerFuture<'a> {
    Box::pin(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let body = b"response-b";
        w.write_status_line(StatusCode::Ok).await?;
        w.write_headers(&default_headers(body.len(), false)).await?;
        w.write_body(body).await?;
        Ok(())
    })
}

fn failing<'a, 'b>(_w: &'a mut ResponseWriter<'b>, _req: &'a Request) -> HandlerFuture<'a> {
    Box::pin(async move { Err(anyhow::anyhow!("handler blew up")) })
}

fn chunked<'a, 'b>(w: &'a mut ResponseWriter<'b>, _req: &'a Request) -> HandlerFuture<'a> {
    Box::pin(async move {
        w.write_status_line(StatusCode::Ok).await?;
        let mut headers = Headers::new();
        headers.set("transfer-encoding", "chunked")?;
        headers.set("trailers", "x-count")?;
        headers.set("connection", "close")?;
        w.write_headers(&headers).await?;
        w.write_chunked_body(b"part1").await?;
        w.write_chunked_body(b"part2").await?;
        w.write_chunked_body_done().await?;
        let mut trailers = Headers::new();
        trailers.set("x-count", "2")?;
        w.write_trailers(&trailers).await?;
        Ok(())
    })
}

async fn start(builder: ServerBuilder) -> SocketAddr {
    let server = builder.bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

fn test_server() -> ServerBuilder {
    Server::builder()
        .register("/hello", hello)
        .register("/a", slow_a)
        .register("/b", slow_b)
        .register("/fail", failing)
        .register("/chunked", chunked)
}

/// Sends raw request bytes and reads until the server closes the socket.
async fn exchange(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8(response).unwrap()
}

/// Reads one response head plus a Content-Length delimited body from an open
/// stream, leaving the stream usable for the next exchange.
async fn read_one_response(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    while !buf.ends_with(b"\r\n\r\n") {
        stream.read_exact(&mut byte).await.unwrap();
        buf.push(byte[0]);
    }
    let head = String::from_utf8(buf.clone()).unwrap();
    let content_length: usize = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length: "))
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    let mut body = vec![0u8; content_length];
    stream.read_exact(&mut body).await.unwrap();
    head + &String::from_utf8(body).unwrap()
}

#[tokio::test]
async fn test_registered_path_serves_response() {
    let addr = start(test_server()).await;

    let response = exchange(addr, b"GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("connection: close"));
    assert!(response.ends_with("hello"));
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let addr = start(test_server()).await;

    let response = exchange(addr, b"GET /nope HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(response.contains("Path '/nope' not found"));
}

#[tokio::test]
async fn test_exact_match_only_no_normalization() {
    let addr = start(test_server()).await;

    let response = exchange(addr, b"GET /hello/ HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
}

#[tokio::test]
async fn test_malformed_request_is_400() {
    let addr = start(test_server()).await;

    let response = exchange(addr, b"BOGUS\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
}

#[tokio::test]
async fn test_unsupported_version_is_400() {
    let addr = start(test_server()).await;

    let response = exchange(addr, b"GET /hello HTTP/2.0\r\nHost: localhost\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(response.contains("unsupported HTTP version"));
}

#[tokio::test]
async fn test_failing_handler_is_500() {
    let addr = start(test_server()).await;

    let response = exchange(addr, b"GET /fail HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
}

#[tokio::test]
async fn test_chunked_response_with_trailers_on_the_wire() {
    let addr = start(test_server()).await;

    let response = exchange(addr, b"GET /chunked HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("5\r\npart1\r\n5\r\npart2\r\n0\r\n"));
    assert!(response.ends_with("x-count: 2\r\n\r\n"));
}

#[tokio::test]
async fn test_concurrent_connections_do_not_interleave() {
    let addr = start(test_server()).await;

    let a = tokio::spawn(exchange(addr, b"GET /a HTTP/1.1\r\nHost: localhost\r\n\r\n"));
    let b = tokio::spawn(exchange(addr, b"GET /b HTTP/1.1\r\nHost: localhost\r\n\r\n"));

    let (resp_a, resp_b) = (a.await.unwrap(), b.await.unwrap());

    assert!(resp_a.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(resp_a.ends_with("response-a"));
    assert!(resp_b.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(resp_b.ends_with("response-b"));
}

#[tokio::test]
async fn test_keep_alive_serves_two_requests_on_one_socket() {
    let addr = start(test_server()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = b"GET /hello HTTP/1.1\r\nHost: localhost\r\nConnection: keep-alive\r\n\r\n";

    stream.write_all(request).await.unwrap();
    let first = read_one_response(&mut stream).await;
    assert!(first.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(first.contains("connection: keep-alive"));
    assert!(first.ends_with("hello"));

    stream.write_all(request).await.unwrap();
    let second = read_one_response(&mut stream).await;
    assert!(second.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(second.ends_with("hello"));
}

#[tokio::test]
async fn test_connection_closes_by_default() {
    let addr = start(test_server()).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    // Without keep-alive the server closes after one exchange, so a full
    // read-to-end terminates.
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    assert!(String::from_utf8(response).unwrap().ends_with("hello"));
}

#[tokio::test]
async fn test_read_timeout_closes_stalled_connection() {
    let addr = start(test_server().read_timeout(Duration::from_millis(100))).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    // Half a request, then silence.
    stream.write_all(b"GET /hello HTT").await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    assert!(response.is_empty());
}
