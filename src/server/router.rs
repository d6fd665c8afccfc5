use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::http::request::Request;
use crate::http::writer::ResponseWriter;

/// Boxed future returned by a handler; borrows the writer and request for the
/// duration of one response.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// A registered request handler.
///
/// Invoked at most once per request with a fresh writer bound to the
/// connection's stream. Errors are caught by the connection handler and
/// answered with a 500 when nothing has been sent yet.
pub type Handler =
    Box<dyn for<'a, 'b> Fn(&'a mut ResponseWriter<'b>, &'a Request) -> HandlerFuture<'a> + Send + Sync>;

/// Exact-match route table: request target string to handler.
///
/// Populated before the server starts accepting and read-only afterwards, so
/// lookups need no synchronization.
#[derive(Default)]
pub struct Router {
    routes: HashMap<String, Handler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `path`. Re-registering a path replaces the
    /// previous handler.
    pub fn register<H>(&mut self, path: impl Into<String>, handler: H)
    where
        H: for<'a, 'b> Fn(&'a mut ResponseWriter<'b>, &'a Request) -> HandlerFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        self.routes.insert(path.into(), Box::new(handler));
    }

    /// Exact string match against the request target. No normalization, no
    /// wildcards.
    pub fn lookup(&self, target: &str) -> Option<&Handler> {
        self.routes.get(target)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
