use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::protocol::REQUEST_TYPES;
use crate::socket_server::{self, DaemonContext};
use anyhow::Result;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, error, info};

pub struct Daemon {
    config: Config,
    ctx: Arc<DaemonContext>,
}

impl Daemon {
    pub fn new(config: Config) -> Result<Self> {
        let dispatcher = Dispatcher::with_default_handlers();

        // Every supported request type must have a handler before the first
        // connection is accepted; anything less is a startup bug.
        anyhow::ensure!(
            dispatcher.covers(&REQUEST_TYPES),
            "dispatcher registration is incomplete"
        );

        Ok(Daemon {
            config,
            ctx: Arc::new(DaemonContext::new(dispatcher)),
        })
    }

    /// Accept and serve connections until SIGINT or SIGTERM.
    ///
    /// The socket file is removed on the way out via the bind guard.
    pub async fn run(self) -> Result<()> {
        let socket_path = self.config.socket_path()?;
        let (listener, _guard) = socket_server::bind_socket(&socket_path)?;

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            debug!("Accepted connection");
                            let ctx = self.ctx.clone();
                            tokio::spawn(socket_server::handle_client(stream, ctx));
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down");
                    break;
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}
