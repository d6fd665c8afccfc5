use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::http::connection::Connection;
use crate::server::router::{HandlerFuture, Router};
use crate::http::request::Request;
use crate::http::writer::ResponseWriter;

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Collects routes before the server starts.
///
/// Registration is only possible here; `bind` consumes the builder, so the
/// route table is immutable (and lock-free to read) once connections are
/// being accepted.
pub struct ServerBuilder {
    router: Router,
    read_timeout: Duration,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Registers `handler` for an exact request target. Last registration
    /// for a path wins.
    pub fn register<H>(mut self, path: &str, handler: H) -> Self
    where
        H: for<'a, 'b> Fn(&'a mut ResponseWriter<'b>, &'a Request) -> HandlerFuture<'a>
            + Send
            + Sync
            + 'static,
    {
        self.router.register(path, handler);
        self
    }

    /// How long a connection may sit idle while a request is being read.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Binds the listening socket and freezes the route table.
    pub async fn bind(self, addr: &str) -> anyhow::Result<Server> {
        let listener = TcpListener::bind(addr).await?;
        info!("listening on {}", listener.local_addr()?);
        Ok(Server {
            listener,
            router: Arc::new(self.router),
            read_timeout: self.read_timeout,
        })
    }
}

/// A bound server: listening socket plus the frozen route table.
pub struct Server {
    listener: TcpListener,
    router: Arc<Router>,
    read_timeout: Duration,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, spawning one task per connection.
    ///
    /// A failed connection is logged and dropped; the accept loop itself
    /// never stops on per-connection errors.
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            let (socket, peer) = self.listener.accept().await?;
            debug!("accepted connection from {}", peer);

            let router = Arc::clone(&self.router);
            let read_timeout = self.read_timeout;
            tokio::spawn(async move {
                let conn = Connection::new(socket, router, read_timeout);
                if let Err(e) = conn.run().await {
                    error!("connection error from {}: {}", peer, e);
                }
            });
        }
    }
}
