//! Streamline - HTTP/1.1 over raw TCP streams
//!
//! Core library: incremental request parsing, ordering-enforced response
//! writing (including chunked bodies and trailers), and the per-connection
//! server loop.

pub mod config;
pub mod http;
pub mod proxy;
pub mod server;
