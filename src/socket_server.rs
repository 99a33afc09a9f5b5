use crate::bspc::BspcClient;
use crate::codec::{self, CodecError};
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::state::ScratchpadState;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

/// Everything a connection needs, shared across all connection tasks.
///
/// The state mutex is the single serialization point required by the
/// tracked-window invariants: it is held for an entire handler execution,
/// including the blocking bspc calls, and never across an await.
pub struct DaemonContext {
    pub dispatcher: Dispatcher,
    pub state: Mutex<ScratchpadState>,
}

impl DaemonContext {
    pub fn new(dispatcher: Dispatcher) -> Self {
        DaemonContext {
            dispatcher,
            state: Mutex::new(ScratchpadState::new()),
        }
    }
}

/// Guard that removes the socket file when dropped
pub struct SocketGuard {
    path: PathBuf,
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if self.path.exists() {
                error!("Failed to remove socket file: {}", e);
            }
        } else {
            info!("Removed socket file at {}", self.path.display());
        }
    }
}

/// Bind the daemon socket, replacing a stale socket file if one is left
/// over from a previous run.
pub fn bind_socket(socket_path: &Path) -> Result<(UnixListener, SocketGuard)> {
    if socket_path.exists() {
        info!("Removing stale socket at {}", socket_path.display());
        fs::remove_file(socket_path)?;
    }

    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("Failed to bind socket at {}", socket_path.display()))?;

    info!("Listening at {}", socket_path.display());

    let guard = SocketGuard {
        path: socket_path.to_path_buf(),
    };

    Ok((listener, guard))
}

/// Serve a single client connection until it closes or faults.
///
/// Frames are read and written here; everything between decode and encode
/// happens synchronously under the shared state lock. Transport faults end
/// the connection without telling the peer anything.
pub async fn handle_client(mut stream: UnixStream, ctx: Arc<DaemonContext>) {
    let mut port = BspcClient;

    loop {
        let message = match codec::read_message(&mut stream).await {
            Ok(message) => message,
            Err(e) if e.is_clean_close() => {
                debug!("Client disconnected");
                return;
            }
            Err(e @ CodecError::Framing(_)) => {
                warn!("Dropping connection on framing fault: {}", e);
                return;
            }
            Err(e) => {
                warn!("Dropping connection on undecodable frame: {}", e);
                return;
            }
        };

        let reply = {
            let mut state = ctx
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            match ctx.dispatcher.dispatch(&message, &mut state, &mut port) {
                Ok(reply) => reply,
                Err(e @ DispatchError::MissingHandler(_)) => {
                    // Startup misconfiguration; nothing a client did wrong,
                    // but this connection cannot be serviced.
                    error!("{}", e);
                    return;
                }
            }
        };

        let frame = match codec::encode(&reply) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode reply: {}", e);
                return;
            }
        };

        if let Err(e) = stream.write_all(&frame).await {
            debug!("Failed to write reply, client likely gone: {}", e);
            return;
        }
    }
}
