use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Context;

use streamline::config::Config;
use streamline::http::headers::Headers;
use streamline::http::request::Request;
use streamline::http::response::{StatusCode, default_headers};
use streamline::http::writer::ResponseWriter;
use streamline::proxy::UpstreamClient;
use streamline::server::{HandlerFuture, Server};

static UPSTREAM: OnceLock<UpstreamClient> = OnceLock::new();

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    let client = UpstreamClient::new(
        &cfg.upstream_url,
        Duration::from_secs(5),
        Duration::from_secs(10),
    )?;
    if UPSTREAM.set(client).is_err() {
        anyhow::bail!("upstream client already configured");
    }

    let server = Server::builder()
        .register("/", hello)
        .register("/stream", stream_chunks)
        .register("/upstream", upstream_demo)
        .read_timeout(Duration::from_secs(cfg.connection_timeout_secs))
        .bind(&cfg.listen_addr)
        .await?;

    tokio::select! {
        res = server.run() => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn hello<'a, 'b>(w: &'a mut ResponseWriter<'b>, req: &'a Request) -> HandlerFuture<'a> {
    Box::pin(async move {
        let body = b"Hello from streamline\n";
        w.write_status_line(StatusCode::Ok).await?;
        w.write_headers(&default_headers(body.len(), req.keep_alive()))
            .await?;
        w.write_body(body).await?;
        Ok(())
    })
}

/// Streams a handful of chunks and reports their count in a trailer.
fn stream_chunks<'a, 'b>(w: &'a mut ResponseWriter<'b>, _req: &'a Request) -> HandlerFuture<'a> {
    Box::pin(async move {
        w.write_status_line(StatusCode::Ok).await?;

        let mut headers = Headers::new();
        headers.set("transfer-encoding", "chunked")?;
        headers.set("trailers", "x-chunk-count")?;
        headers.set("content-type", "text/plain")?;
        headers.set("connection", "close")?;
        w.write_headers(&headers).await?;

        let count = 5;
        for i in 0..count {
            w.write_chunked_body(format!("chunk {i}\n").as_bytes())
                .await?;
        }
        w.write_chunked_body_done().await?;

        let mut trailers = Headers::new();
        trailers.set("x-chunk-count", &count.to_string())?;
        w.write_trailers(&trailers).await?;
        Ok(())
    })
}

/// Fetches the configured upstream and re-streams its body as chunks,
/// reporting the upstream status and byte count in trailers.
fn upstream_demo<'a, 'b>(w: &'a mut ResponseWriter<'b>, _req: &'a Request) -> HandlerFuture<'a> {
    Box::pin(async move {
        let client = UPSTREAM.get().context("upstream client not configured")?;
        let upstream = client.get("/").await?;

        w.write_status_line(StatusCode::Ok).await?;

        let mut headers = Headers::new();
        headers.set("transfer-encoding", "chunked")?;
        headers.set("trailers", "x-upstream-status, x-upstream-bytes")?;
        headers.set("content-type", "text/plain")?;
        headers.set("connection", "close")?;
        w.write_headers(&headers).await?;

        for chunk in upstream.body.chunks(1024) {
            w.write_chunked_body(chunk).await?;
        }
        w.write_chunked_body_done().await?;

        let mut trailers = Headers::new();
        trailers.set("x-upstream-status", &upstream.status.to_string())?;
        trailers.set("x-upstream-bytes", &upstream.body.len().to_string())?;
        w.write_trailers(&trailers).await?;
        Ok(())
    })
}
