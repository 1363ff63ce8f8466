//! Connection lifecycle and message transport between the client and the relay
//!
//! The relay rebroadcasts position updates and join/leave events; this module
//! owns the socket, the connect/reconnect handshake and the two background
//! tasks (receive loop, send queue). Decoded messages are handed to the game
//! thread over an unbounded channel and drained once per frame, so all
//! registry mutation stays on the simulation thread.

use log::{error, info, warn};
use parking_lot::Mutex;
use shared::{valid_name, ClientMessage, ServerMessage, Transform, Vec3};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Lifecycle of the single relay connection. Transitions are driven by
/// `connect`/`reconnect`/`disconnect` calls and by transport failures seen
/// on the receive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("player name must be 1-{} characters", shared::MAX_NAME_LEN)]
    InvalidName,
    #[error("already connected")]
    AlreadyConnected,
    #[error("no response from relay")]
    Timeout,
    #[error("connection attempt cancelled")]
    Cancelled,
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Client side of the relay link. Sending never blocks the caller: outbound
/// messages are queued to a sender task, and `update_position` silently
/// no-ops unless the state is `Connected`.
pub struct NetworkClient {
    server_addr: String,
    state: Arc<Mutex<ConnectionState>>,
    player_id: Arc<Mutex<Option<String>>>,
    outbound: Option<mpsc::UnboundedSender<ClientMessage>>,
    inbound: Option<mpsc::UnboundedReceiver<ServerMessage>>,
    recv_task: Option<JoinHandle<()>>,
    send_task: Option<JoinHandle<()>>,
}

impl NetworkClient {
    pub fn new(server_addr: &str) -> Self {
        Self {
            server_addr: server_addr.to_string(),
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            player_id: Arc::new(Mutex::new(None)),
            outbound: None,
            inbound: None,
            recv_task: None,
            send_task: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Identifier assigned by the relay during the handshake; absent until
    /// a connect completes.
    pub fn player_id(&self) -> Option<String> {
        self.player_id.lock().clone()
    }

    /// Establishes the relay connection and performs the `Join`/`Welcome`
    /// handshake. A failure transitions back to `Disconnected` and is
    /// returned to the caller; retry policy is the caller's decision.
    pub async fn connect(&mut self, name: &str) -> Result<(), ConnectError> {
        if !valid_name(name) {
            return Err(ConnectError::InvalidName);
        }

        {
            let mut state = self.state.lock();
            match *state {
                ConnectionState::Disconnected => *state = ConnectionState::Connecting,
                _ => return Err(ConnectError::AlreadyConnected),
            }
        }

        info!("Connecting to relay at {}...", self.server_addr);
        match self.establish(name).await {
            Ok(()) => Ok(()),
            Err(e) => {
                *self.state.lock() = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Retries the handshake after a lost connection. Aborts as soon as the
    /// state is forced out of `Reconnecting`, which is how `disconnect`
    /// cancels an in-flight attempt.
    pub async fn reconnect(&mut self, name: &str) -> Result<(), ConnectError> {
        if !valid_name(name) {
            return Err(ConnectError::InvalidName);
        }

        *self.state.lock() = ConnectionState::Reconnecting;
        let mut last_error = ConnectError::Timeout;

        for attempt in 1..=RECONNECT_ATTEMPTS {
            if *self.state.lock() != ConnectionState::Reconnecting {
                return Err(ConnectError::Cancelled);
            }

            info!("Reconnect attempt {}/{}", attempt, RECONNECT_ATTEMPTS);
            match self.establish(name).await {
                Ok(()) => return Ok(()),
                Err(ConnectError::Cancelled) => return Err(ConnectError::Cancelled),
                Err(e) => {
                    warn!("Reconnect attempt failed: {}", e);
                    last_error = e;
                }
            }

            sleep(RECONNECT_DELAY).await;
        }

        let mut state = self.state.lock();
        if *state == ConnectionState::Reconnecting {
            *state = ConnectionState::Disconnected;
        }
        Err(last_error)
    }

    async fn establish(&mut self, name: &str) -> Result<(), ConnectError> {
        self.teardown_tasks();

        let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
        socket.connect(&self.server_addr).await?;

        let join = bincode::serialize(&ClientMessage::Join {
            name: name.trim().to_string(),
        })?;
        socket.send(&join).await?;

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let mut buffer = [0u8; 2048];
        let deadline = Instant::now() + HANDSHAKE_TIMEOUT;

        let player_id = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let len = match timeout(remaining, socket.recv(&mut buffer)).await {
                Ok(Ok(len)) => len,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Err(ConnectError::Timeout),
            };

            match bincode::deserialize::<ServerMessage>(&buffer[..len]) {
                Ok(ServerMessage::Welcome { player_id }) => break player_id,
                // The reconciliation snapshot can race ahead of the
                // handshake reply on an unordered transport; keep it.
                Ok(other) => {
                    let _ = inbound_tx.send(other);
                }
                Err(_) => warn!("Dropping malformed datagram during handshake"),
            }
        };

        {
            let mut state = self.state.lock();
            if !matches!(
                *state,
                ConnectionState::Connecting | ConnectionState::Reconnecting
            ) {
                // disconnect() raced the handshake
                return Err(ConnectError::Cancelled);
            }
            *state = ConnectionState::Connected;
        }
        *self.player_id.lock() = Some(player_id.clone());

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let send_socket = Arc::clone(&socket);
        self.send_task = Some(tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                match bincode::serialize(&message) {
                    Ok(bytes) => {
                        if let Err(e) = send_socket.send(&bytes).await {
                            error!("Failed to send message: {}", e);
                        }
                    }
                    Err(e) => error!("Failed to encode message: {}", e),
                }
            }
        }));

        let recv_state = Arc::clone(&self.state);
        self.recv_task = Some(tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv(&mut buffer).await {
                    Ok(len) => match bincode::deserialize::<ServerMessage>(&buffer[..len]) {
                        Ok(message) => {
                            if inbound_tx.send(message).is_err() {
                                break;
                            }
                        }
                        Err(_) => warn!("Dropping malformed datagram ({} bytes)", len),
                    },
                    Err(e) => {
                        error!("Transport error: {}", e);
                        let mut state = recv_state.lock();
                        if *state == ConnectionState::Connected {
                            *state = ConnectionState::Disconnected;
                        }
                        break;
                    }
                }
            }
        }));

        self.outbound = Some(outbound_tx);
        self.inbound = Some(inbound_rx);
        info!("Connected as player {}", player_id);
        Ok(())
    }

    /// Queues an outbound position update. Never blocks; silently does
    /// nothing unless currently connected, so a throttled send can never
    /// stall the simulation.
    pub fn update_position(&self, position: Vec3, rotation: f32) {
        if *self.state.lock() != ConnectionState::Connected {
            return;
        }
        if let Some(tx) = &self.outbound {
            let _ = tx.send(ClientMessage::Move {
                transform: Transform::new(position, rotation),
            });
        }
    }

    /// Tells the relay the local player hit a hazard. Same non-blocking
    /// contract as `update_position`.
    pub fn notify_eliminated(&self) {
        if *self.state.lock() != ConnectionState::Connected {
            return;
        }
        if let Some(tx) = &self.outbound {
            let _ = tx.send(ClientMessage::Eliminated);
        }
    }

    /// Drains every message received since the last call. The simulation
    /// calls this once per frame before interpolating, so remote state is
    /// never older than the frame boundary.
    pub fn poll_messages(&mut self) -> Vec<ServerMessage> {
        let mut drained = Vec::new();
        if let Some(rx) = self.inbound.as_mut() {
            while let Ok(message) = rx.try_recv() {
                drained.push(message);
            }
        }
        drained
    }

    /// Tears down the transport. Idempotent, and cancels any in-flight
    /// connect or reconnect attempt.
    pub fn disconnect(&mut self) {
        let previous = {
            let mut state = self.state.lock();
            let previous = *state;
            *state = ConnectionState::Disconnected;
            previous
        };

        if previous == ConnectionState::Disconnected {
            return;
        }

        if previous == ConnectionState::Connected {
            if let Some(tx) = &self.outbound {
                let _ = tx.send(ClientMessage::Leave);
            }
        }

        self.teardown_tasks();
        *self.player_id.lock() = None;
        info!("Disconnected from relay");
    }

    fn teardown_tasks(&mut self) {
        if let Some(task) = self.recv_task.take() {
            task.abort();
        }
        // Dropping the queue lets the sender task flush what is pending
        // (including a final Leave) and exit on its own.
        self.outbound = None;
        self.send_task.take();
        self.inbound = None;
    }
}

impl Drop for NetworkClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}
