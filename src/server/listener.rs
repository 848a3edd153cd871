use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::http::connection::Connection;
use crate::server::handler::Handler;

/// A running server: an accept loop plus one task per connection.
///
/// Dropping the server stops the accept loop as well, but only
/// [`Server::close`] waits for the listener to be released.
pub struct Server {
    local_addr: SocketAddr,
    shared: Arc<Shared>,
    accept_task: Option<JoinHandle<()>>,
}

struct Shared {
    closed: AtomicBool,
    shutdown: Notify,
}

impl Server {
    /// Binds `addr` and starts accepting connections in the background.
    pub async fn serve<H: Handler>(addr: &str, handler: H) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {addr}"))?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {}", local_addr);

        let shared = Arc::new(Shared {
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
        });

        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::new(handler),
            Arc::clone(&shared),
        ));

        Ok(Self {
            local_addr,
            shared,
            accept_task: Some(accept_task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Stops accepting and drops the listener.
    ///
    /// Connections already accepted run to completion on their own.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.signal_shutdown();
        if let Some(task) = self.accept_task.take() {
            task.await.context("accept loop panicked")?;
        }
        info!("Stopped listening on {}", self.local_addr);
        Ok(())
    }

    fn signal_shutdown(&self) {
        // `notify_one` stores a permit, so a loop that is not parked yet still sees it.
        if !self.shared.closed.swap(true, Ordering::AcqRel) {
            self.shared.shutdown.notify_one();
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if self.accept_task.is_some() {
            debug!("Server dropped without close, stopping accept loop on {}", self.local_addr);
        }
        self.signal_shutdown();
    }
}

async fn accept_loop<H: Handler>(listener: TcpListener, handler: Arc<H>, shared: Arc<Shared>) {
    loop {
        let accepted = tokio::select! {
            res = listener.accept() => res,
            _ = shared.shutdown.notified() => return,
        };

        match accepted {
            Ok((socket, peer)) => {
                debug!("Accepted connection from {}", peer);

                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    let conn = Connection::new(socket);
                    if let Err(e) = conn.run(handler.as_ref()).await {
                        error!("Connection error from {}: {:#}", peer, e);
                    }
                });
            }

            // The listener is going away; not a failure.
            Err(_) if shared.closed.load(Ordering::Acquire) => return,

            Err(e) => {
                warn!(error = %e, "Error accepting connection");
            }
        }
    }
}
