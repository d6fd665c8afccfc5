//! HTTP protocol implementation.
//!
//! This module implements an HTTP/1.1 server core built directly on raw TCP
//! streams: byte-by-byte request parsing, routing, and ordering-enforced
//! response writing with chunked transfer-encoding and trailer support.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`headers`**: Ordered, case-insensitive header collection with token validation
//! - **`request`**: Request line and request representation
//! - **`parser`**: Incremental request parser driven by partial socket reads
//! - **`response`**: Status codes and default response headers
//! - **`writer`**: Response writer enforcing HTTP/1.1 framing order
//! - **`connection`**: The per-connection request/response loop
//!
//! # Parser State Machine
//!
//! Each request moves through an explicit state machine, fed by arbitrarily
//! sized slices of socket input:
//!
//! ```text
//!        ┌──────────────┐
//!        │ Initialized  │ ← Wait for the CRLF-terminated request line
//!        └──────┬───────┘
//!               ▼
//!        ┌───────────────┐
//!        │ ParsingHeaders│ ← `Name: value` lines until a bare CRLF
//!        └──────┬────────┘
//!               │ Content-Length / Transfer-Encoding: chunked / neither
//!               ▼
//!        ┌───────────────┐      ┌────────────────┐
//!        │ ParsingBody   │ ───► │ ParsingTrailers│  (declared trailers only)
//!        └──────┬────────┘      └──────┬─────────┘
//!               ▼                      ▼
//!            ┌──────┐             ┌──────┐
//!            │ Done │             │ Done │
//!            └──────┘             └──────┘
//! ```
//!
//! Any malformed input lands in a terminal `Error` state instead; the
//! connection layer answers with `400 Bad Request` and closes.
//!
//! # Writer State Machine
//!
//! The writer rejects out-of-order output with `WriteError::OutOfOrderWrite`:
//!
//! ```text
//! NotStarted ─status─► StatusWritten ─headers─► HeadersWritten
//!     HeadersWritten ─body──────────────────────────────► Done
//!     HeadersWritten ─chunk─► Streaming ─chunk─► Streaming
//!     Streaming ─done─► Done            (no trailers declared)
//!     Streaming ─done─► AwaitingTrailers ─trailers─► Done
//! ```

pub mod connection;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
