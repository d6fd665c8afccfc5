//! Server assembly: route registration and the accept loop.

pub mod listener;
pub mod router;

pub use listener::{Server, ServerBuilder};
pub use router::{Handler, HandlerFuture, Router};
