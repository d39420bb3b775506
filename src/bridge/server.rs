//! WebSocket server and connection manager.
//!
//! Accepts client connections, reads text frames, hands each frame to the
//! dispatcher on its own task, and writes the eventual response back to the
//! originating connection -- dropped with a warning if the peer is already
//! gone. Each connection gets a periodic heartbeat frame so idle links stay
//! alive; the manager tracks the connected count and last-activity time and
//! publishes both to observers through a watch channel.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};
use uuid::Uuid;

use super::dispatch::Dispatcher;
use super::protocol;
use crate::config::BridgeConfig;

// ---------------------------------------------------------------------------
// Connection bookkeeping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closing,
    Closed,
}

struct Connection {
    state: ConnectionState,
    last_activity: Instant,
    outbound: mpsc::UnboundedSender<Message>,
}

/// Snapshot published to observers whenever the connection set changes or a
/// frame moves. The server binary and the `bridge.status` tool read this.
#[derive(Debug, Clone, Default)]
pub struct BridgeStats {
    pub connected_clients: usize,
    pub last_activity: Option<Instant>,
}

/// Tracks live connections. Only the manager adds or removes entries; the
/// map sits behind an async mutex so lifecycle callbacks from different
/// connection tasks serialize.
pub struct ConnectionManager {
    connections: Mutex<HashMap<Uuid, Connection>>,
    stats_tx: watch::Sender<BridgeStats>,
}

impl ConnectionManager {
    pub fn new() -> (Arc<Self>, watch::Receiver<BridgeStats>) {
        let (stats_tx, stats_rx) = watch::channel(BridgeStats::default());
        (
            Arc::new(Self {
                connections: Mutex::new(HashMap::new()),
                stats_tx,
            }),
            stats_rx,
        )
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats_tx.borrow().clone()
    }

    async fn on_open(&self, id: Uuid, outbound: mpsc::UnboundedSender<Message>) {
        let mut connections = self.connections.lock().await;
        connections.insert(
            id,
            Connection {
                state: ConnectionState::Open,
                last_activity: Instant::now(),
                outbound,
            },
        );
        self.publish(&connections);
    }

    /// Record frame or heartbeat activity on a connection.
    async fn touch(&self, id: Uuid) {
        let mut connections = self.connections.lock().await;
        if let Some(conn) = connections.get_mut(&id) {
            conn.last_activity = Instant::now();
        }
        self.publish(&connections);
    }

    /// Peer-initiated close: stop accepting outbound writes for this
    /// connection while the read loop winds down.
    async fn begin_close(&self, id: Uuid) {
        let mut connections = self.connections.lock().await;
        if let Some(conn) = connections.get_mut(&id) {
            conn.state = ConnectionState::Closing;
        }
    }

    async fn on_close(&self, id: Uuid) {
        let mut connections = self.connections.lock().await;
        connections.remove(&id);
        self.publish(&connections);
    }

    /// Write a text frame back to a connection. Returns false when the peer
    /// is gone -- a late response must never error into the transport loop.
    async fn send(&self, id: Uuid, text: String) -> bool {
        let mut connections = self.connections.lock().await;
        match connections.get_mut(&id) {
            Some(conn) if conn.state == ConnectionState::Open => {
                conn.last_activity = Instant::now();
                let delivered = conn.outbound.send(Message::Text(text)).is_ok();
                self.publish(&connections);
                delivered
            }
            _ => false,
        }
    }

    fn publish(&self, connections: &HashMap<Uuid, Connection>) {
        let stats = BridgeStats {
            connected_clients: connections.len(),
            last_activity: connections.values().map(|c| c.last_activity).max(),
        };
        self.stats_tx.send_replace(stats);
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// The bridge server: one TCP listener, one dispatcher, one connection
/// manager. Constructed explicitly and handed to whatever needs it.
pub struct BridgeServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    manager: Arc<ConnectionManager>,
    heartbeat_interval: Duration,
}

impl BridgeServer {
    /// Bind the listening socket. Port 0 binds an ephemeral port; read it
    /// back through [`BridgeServer::local_addr`].
    pub async fn bind(
        config: &BridgeConfig,
        dispatcher: Dispatcher,
        manager: Arc<ConnectionManager>,
    ) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind((config.bind_address.as_str(), config.port)).await?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            dispatcher: Arc::new(dispatcher),
            manager,
            heartbeat_interval: config.heartbeat_interval(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept loop. Runs until the listener errors; each accepted client
    /// gets its own connection task.
    pub async fn run(self) -> Result<(), std::io::Error> {
        info!("[Bridge] Listening on ws://{}", self.local_addr);
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let dispatcher = Arc::clone(&self.dispatcher);
            let manager = Arc::clone(&self.manager);
            let heartbeat = self.heartbeat_interval;
            tokio::spawn(async move {
                handle_connection(stream, peer, manager, dispatcher, heartbeat).await;
            });
        }
    }
}

/// Lifecycle of one client connection: handshake, register, pump frames,
/// deregister. Read errors close the connection but never the server.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    manager: Arc<ConnectionManager>,
    dispatcher: Arc<Dispatcher>,
    heartbeat_interval: Duration,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("[Bridge] WebSocket handshake failed for {}: {}", peer, e);
            return;
        }
    };

    let id = Uuid::new_v4();
    let (mut ws_writer, mut ws_reader) = ws.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

    manager.on_open(id, out_tx.clone()).await;
    info!("[Bridge] Client connected: {} ({})", id, peer);

    // Write loop: forwards queued frames to the socket. Exits when every
    // sender is gone or the peer stops accepting writes.
    let write_task = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if let Err(e) = ws_writer.send(msg).await {
                warn!("[Bridge] Write failed on {}: {}", id, e);
                break;
            }
        }
        let _ = ws_writer.close().await;
    });

    // Heartbeat: periodic liveness frame so idle connections stay warm.
    let heartbeat_task = tokio::spawn({
        let manager = Arc::clone(&manager);
        let out_tx = out_tx.clone();
        async move {
            let mut ticker = tokio::time::interval(heartbeat_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // first tick is immediate
            loop {
                ticker.tick().await;
                if out_tx
                    .send(Message::Text(protocol::heartbeat_frame()))
                    .is_err()
                {
                    break;
                }
                manager.touch(id).await;
            }
        }
    });

    // Read loop. Each text frame dispatches on its own task so a slow tool
    // does not block later frames on this connection.
    while let Some(frame) = ws_reader.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                manager.touch(id).await;
                let dispatcher = Arc::clone(&dispatcher);
                let manager = Arc::clone(&manager);
                tokio::spawn(async move {
                    let response = dispatcher.dispatch_frame(&text).await;
                    let encoded = protocol::encode(&response);
                    if !manager.send(id, encoded).await {
                        warn!(
                            "[Bridge] Response '{}' dropped: client {} is gone",
                            response.id, id
                        );
                    }
                });
            }
            Ok(Message::Ping(payload)) => {
                let _ = out_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(_)) => {
                manager.begin_close(id).await;
                break;
            }
            Ok(_) => {} // binary and pong frames are ignored
            Err(e) => {
                warn!("[Bridge] Read error on {}: {}", id, e);
                break;
            }
        }
    }

    heartbeat_task.abort();
    manager.on_close(id).await;
    drop(out_tx); // release the write loop once in-flight responses drain
    let _ = write_task.await;
    info!("[Bridge] Client disconnected: {}", id);
}
