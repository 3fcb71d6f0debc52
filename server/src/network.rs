//! Server network layer: TCP listener, admission and session spawning

use crate::game::{GameResult, GameSession, SessionStatus};
use crate::registry::{Admission, SessionRegistry};
use crate::session::spawn_session;
use log::{debug, error, info, warn};
use shared::{Response, DEFAULT_PORT, READ_BUFFER_SIZE};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::time::timeout;

/// Longest time a rejected connection is kept open waiting for the peer to close
const REJECT_LINGER: Duration = Duration::from_secs(1);

/// Runtime settings supplied by the command line
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Minimum time between accepted connections from one address
    pub delay: Duration,
    /// How long a session waits for a request before giving up
    pub read_timeout: Duration,
    /// Aggregation cadence
    pub tick: Duration,
    pub save_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            delay: Duration::from_secs(1),
            read_timeout: Duration::from_secs(30),
            tick: Duration::from_millis(200),
            save_file: PathBuf::from("monty_state.bin"),
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Accepts connections and hands admitted ones to their own session task
pub struct Server {
    listener: TcpListener,
    registry: Arc<RwLock<SessionRegistry>>,
    results: mpsc::UnboundedSender<GameResult>,
    read_timeout: Duration,
}

impl Server {
    pub async fn bind(
        config: &ServerConfig,
        registry: Arc<RwLock<SessionRegistry>>,
        results: mpsc::UnboundedSender<GameResult>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(config.address()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            registry,
            results,
            read_timeout: config.read_timeout,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` is set. Sessions already running
    /// are left to finish on their own.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Server started successfully");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.handle_connection(stream, peer).await,
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Server shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let (status_tx, status_rx) = watch::channel(SessionStatus::default());

        let admission = {
            let mut registry = self.registry.write().await;
            registry.admit(peer.ip(), Instant::now(), status_rx)
        };

        match admission {
            Admission::Reject => {
                warn!("Connection throttled [TOOSOON]: {}", peer);
                tokio::spawn(turn_away(stream, peer));
            }
            Admission::Accept { session_id } => {
                info!("Game started #{} with {}", session_id, peer);
                let session = GameSession::new(session_id, peer);
                spawn_session(
                    stream,
                    session,
                    status_tx,
                    self.results.clone(),
                    self.read_timeout,
                );
            }
        }
    }
}

/// Answers a throttled connection with `WAIT` and closes it
async fn turn_away(mut stream: TcpStream, peer: SocketAddr) {
    let wait = format!("{}\n", Response::Wait);
    if let Err(e) = stream.write_all(wait.as_bytes()).await {
        debug!("Failed to send WAIT to {}: {}", peer, e);
        return;
    }
    let _ = stream.shutdown().await;

    // drain until the peer closes so unread requests do not turn into a reset
    let mut sink = [0u8; READ_BUFFER_SIZE];
    let _ = timeout(REJECT_LINGER, async {
        while let Ok(len) = stream.read(&mut sink).await {
            if len == 0 {
                break;
            }
        }
    })
    .await;
}
