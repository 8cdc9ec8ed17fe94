//! Daemon Server
//!
//! Accepts surfaces on a Unix socket. Every connection gets its own
//! [`GameController`], so every connection is one independent game session:
//!
//! ```text
//!                      DaemonServer
//!                           │
//!           ┌───────────────┼───────────────┐
//!           │               │               │
//!       conn-1          conn-2          conn-3
//!     controller      controller      controller
//!           │               │               │
//!           └───────────────┴───────────────┘
//!                           │
//!               shared GameClients (HTTP)
//! ```
//!
//! Intents arrive as frames on the read half and are forwarded to the
//! controller; everything the controller sends is framed back on the write
//! half. When the surface hangs up the controller's intent channel closes
//! and it shuts itself down.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use dashmap::DashMap;
use tokio::io::AsyncReadExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn, Instrument};

use hunter_core::transport::{write_frame, FrameDecoder, TransportError};
use hunter_core::{
    ControllerConfig, GameClients, GameController, GameIntent, GameMessage, HunterConfig,
    SessionId,
};

/// Connection state tracking
struct ConnectionState {
    /// Game session served on this connection
    session_id: SessionId,
    connected_at: Instant,
    /// Remote peer UID (from SO_PEERCRED)
    peer_uid: Option<u32>,
    abort_handle: tokio::task::AbortHandle,
}

/// Configuration for the daemon server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Controller-to-surface channel capacity
    pub message_capacity: usize,
    /// Surface-to-controller channel capacity
    pub intent_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
            message_capacity: 256,
            intent_capacity: 64,
        }
    }
}

/// The main daemon server
pub struct DaemonServer {
    socket_path: PathBuf,
    clients: GameClients,
    controller_config: ControllerConfig,
    server_config: ServerConfig,
    connections: Arc<DashMap<u64, ConnectionState>>,
    next_conn_id: u64,
}

impl DaemonServer {
    /// Create a server; service clients are built once and shared
    pub fn new(config: HunterConfig, server_config: ServerConfig) -> Self {
        Self::with_clients(
            config.resolved_socket_path(),
            GameClients::from_config(&config),
            ControllerConfig::from_config(&config),
            server_config,
        )
    }

    /// Create a server around explicit clients
    pub fn with_clients(
        socket_path: PathBuf,
        clients: GameClients,
        controller_config: ControllerConfig,
        server_config: ServerConfig,
    ) -> Self {
        Self {
            socket_path,
            clients,
            controller_config,
            server_config,
            connections: Arc::new(DashMap::new()),
            next_conn_id: 0,
        }
    }

    /// Prepare the socket path (create directory, remove stale socket)
    fn prepare_socket(&self) -> Result<()> {
        if let Some(parent) = self.socket_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create socket directory: {parent:?}"))?;
                info!(path = ?parent, "Created socket directory");
            }
        }

        if self.socket_path.exists() {
            warn!(path = ?self.socket_path, "Removing stale socket file");
            fs::remove_file(&self.socket_path).with_context(|| {
                format!("Failed to remove stale socket: {:?}", self.socket_path)
            })?;
        }

        Ok(())
    }

    /// Bind the socket, owner-only
    pub fn bind(&self) -> Result<UnixListener> {
        self.prepare_socket()?;

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind to {:?}", self.socket_path))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.socket_path, perms).with_context(|| {
                format!("Failed to set permissions on {:?}", self.socket_path)
            })?;
        }

        info!(path = ?self.socket_path, "Listening for connections");
        Ok(listener)
    }

    /// Bind and serve until `shutdown` is notified
    pub async fn run(&mut self, shutdown: Arc<Notify>) -> Result<()> {
        let listener = self.bind()?;
        self.serve(listener, shutdown).await
    }

    /// Accept loop
    pub async fn serve(&mut self, listener: UnixListener, shutdown: Arc<Notify>) -> Result<()> {
        let owner_uid = self.socket_owner();

        loop {
            let accepted = tokio::select! {
                () = shutdown.notified() => {
                    info!("Shutdown requested, stopping accept loop");
                    break;
                }
                accepted = listener.accept() => accepted,
            };

            let stream = match accepted {
                Ok((stream, _addr)) => stream,
                Err(e) => {
                    error!(error = %e, "Accept failed");
                    continue;
                }
            };

            if self.connections.len() >= self.server_config.max_connections {
                warn!("Connection limit reached, rejecting new connection");
                drop(stream);
                continue;
            }

            let peer_uid = stream.peer_cred().ok().map(|cred| cred.uid());
            if let (Some(peer), Some(owner)) = (peer_uid, owner_uid) {
                if peer != owner && peer != 0 {
                    warn!(
                        peer_uid = peer,
                        owner_uid = owner,
                        "Rejecting connection from different user"
                    );
                    continue;
                }
            }

            self.accept_connection(stream, peer_uid);
        }

        self.shutdown()
    }

    fn accept_connection(&mut self, stream: UnixStream, peer_uid: Option<u32>) {
        self.next_conn_id += 1;
        let conn_id = self.next_conn_id;

        let (msg_tx, msg_rx) = mpsc::channel(self.server_config.message_capacity);
        let controller = GameController::new(
            self.clients.clone(),
            self.controller_config.clone(),
            msg_tx,
        );
        let session_id = controller.session_id().clone();

        info!(
            conn_id,
            session = %session_id,
            peer_uid = ?peer_uid,
            active_connections = self.connections.len() + 1,
            "New connection accepted"
        );

        let connections = Arc::clone(&self.connections);
        let intent_capacity = self.server_config.intent_capacity;
        let task = tokio::spawn(
            async move {
                handle_connection(stream, controller, msg_rx, intent_capacity).await;
                connections.remove(&conn_id);
                info!(
                    active_connections = connections.len(),
                    "Connection handler finished"
                );
            }
            .instrument(tracing::info_span!("connection", conn_id, session = %session_id)),
        );

        self.connections.insert(
            conn_id,
            ConnectionState {
                session_id,
                connected_at: Instant::now(),
                peer_uid,
                abort_handle: task.abort_handle(),
            },
        );
    }

    /// UID owning the bound socket file
    fn socket_owner(&self) -> Option<u32> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            fs::metadata(&self.socket_path).ok().map(|m| m.uid())
        }
        #[cfg(not(unix))]
        {
            None
        }
    }

    /// Abort live connections and remove the socket
    fn shutdown(&mut self) -> Result<()> {
        info!("Initiating graceful shutdown");

        let conn_ids: Vec<u64> = self.connections.iter().map(|r| *r.key()).collect();
        for conn_id in conn_ids {
            if let Some((_, state)) = self.connections.remove(&conn_id) {
                info!(
                    conn_id,
                    session = %state.session_id,
                    peer_uid = ?state.peer_uid,
                    uptime_secs = state.connected_at.elapsed().as_secs(),
                    "Aborting connection"
                );
                state.abort_handle.abort();
            }
        }

        if self.socket_path.exists() {
            fs::remove_file(&self.socket_path)
                .with_context(|| format!("Failed to remove socket: {:?}", self.socket_path))?;
            info!(path = ?self.socket_path, "Socket file removed");
        }

        info!("Shutdown complete");
        Ok(())
    }

    /// Number of live connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

/// Pump frames between one surface and its controller
async fn handle_connection(
    stream: UnixStream,
    controller: GameController,
    mut msg_rx: mpsc::Receiver<GameMessage>,
    intent_capacity: usize,
) {
    let (mut reader, mut writer) = stream.into_split();
    let (intent_tx, intent_rx) = mpsc::channel::<GameIntent>(intent_capacity);
    tokio::spawn(controller.run(intent_rx).in_current_span());

    // Dropping the sender is how the controller learns the surface is gone
    let mut intent_tx = Some(intent_tx);
    let mut decoder = FrameDecoder::new();
    let mut read_buf = vec![0u8; 8192];

    loop {
        tokio::select! {
            read = reader.read(&mut read_buf), if intent_tx.is_some() => {
                match read {
                    Ok(0) => {
                        info!("Surface disconnected (EOF)");
                        intent_tx = None;
                    }
                    Ok(n) => {
                        decoder.push(&read_buf[..n]);
                        if !forward_intents(&mut decoder, &mut intent_tx).await {
                            intent_tx = None;
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Read error");
                        intent_tx = None;
                    }
                }
            }

            msg = msg_rx.recv() => {
                match msg {
                    Some(message) => {
                        if let Err(e) = write_frame(&mut writer, &message).await {
                            warn!(error = %e, "Write error");
                            break;
                        }
                    }
                    None => {
                        debug!("Controller finished");
                        break;
                    }
                }
            }
        }
    }
}

/// Decode every complete frame and hand it to the controller
///
/// Returns `false` once the connection can no longer carry intents.
async fn forward_intents(
    decoder: &mut FrameDecoder,
    intent_tx: &mut Option<mpsc::Sender<GameIntent>>,
) -> bool {
    let Some(tx) = intent_tx.as_ref() else {
        return false;
    };
    loop {
        match decoder.decode::<GameIntent>() {
            Ok(Some(intent)) => {
                debug!(intent = intent.name(), "Received intent");
                if tx.send(intent).await.is_err() {
                    error!("Controller stopped accepting intents");
                    return false;
                }
            }
            Ok(None) => return true,
            Err(e @ TransportError::FrameTooLarge { .. }) => {
                warn!(error = %e, "Dropping connection");
                return false;
            }
            Err(e) => {
                // Bad frames are consumed by the decoder; keep going
                warn!(error = %e, "Failed to decode intent frame");
            }
        }
    }
}
