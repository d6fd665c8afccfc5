//! Upstream forwarding for the demonstration proxy handler.
//!
//! A minimal HTTP/1.1 client over a raw `TcpStream`: one request, one
//! response, `Connection: close`. Used by the demo binary to fetch an
//! upstream body and re-stream it as chunks with trailers.

pub mod upstream;

pub use upstream::{UpstreamClient, UpstreamResponse};
