//! WebSocket Peer Transport
//!
//! Carries [`PeerMessage`]s over one WebSocket. The host listens and accepts
//! a single guest; the guest dials the host's URL. Either way the socket is
//! split into a reader task and a writer task bridged to the caller by
//! channels, so the game loop never touches the socket directly.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, connect_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, error, info, instrument, warn};

use crate::game::board::Color;
use crate::game::state::TurnPhase;
use crate::network::protocol::PeerMessage;
use crate::network::session::{PeerSession, SessionError};

// =============================================================================
// CONFIG
// =============================================================================

/// Peer configuration.
#[derive(Clone, Debug)]
pub struct PeerConfig {
    /// Address the host listens on
    pub bind_addr: String,
    /// Buffered messages per direction
    pub channel_capacity: usize,
    /// Pause before handing on a finished turn
    pub pass_delay: Duration,
    /// Pause before each computer action
    pub computer_delay: Duration,
    /// Local actions after which the peer gives up
    pub max_actions: usize,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9870".to_string(),
            channel_capacity: 64,
            pass_delay: Duration::from_millis(1500),
            computer_delay: Duration::from_millis(400),
            max_actions: 50_000,
        }
    }
}

/// Transport failures.
#[derive(Debug, Error)]
pub enum PeerError {
    /// Socket I/O
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket handshake or framing
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The writer task is gone
    #[error("connection closed")]
    Closed,

    /// Local command failed
    #[error(transparent)]
    Session(#[from] SessionError),
}

// =============================================================================
// LINK
// =============================================================================

/// Channel pair standing in for an open socket.
#[derive(Debug)]
pub struct PeerLink {
    outgoing: mpsc::Sender<PeerMessage>,
    incoming: mpsc::Receiver<PeerMessage>,
    reader: JoinHandle<()>,
}

impl PeerLink {
    /// Queue a message for the writer task.
    pub async fn send(&self, msg: PeerMessage) -> Result<(), PeerError> {
        self.outgoing.send(msg).await.map_err(|_| PeerError::Closed)
    }

    /// Next message from the peer, or `None` once the socket has closed.
    pub async fn recv(&mut self) -> Option<PeerMessage> {
        self.incoming.recv().await
    }

    /// Stop reading. Queued outgoing messages are still flushed.
    pub fn close(self) {
        self.reader.abort();
    }
}

/// Bind the host's listener.
pub async fn bind(addr: &str) -> Result<TcpListener, PeerError> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Wait for one guest and upgrade its connection.
#[instrument(skip(listener, config))]
pub async fn accept(listener: &TcpListener, config: &PeerConfig) -> Result<PeerLink, PeerError> {
    let (stream, addr) = listener.accept().await?;
    let ws = accept_async(stream).await?;
    info!("Guest connected from {}", addr);
    Ok(spawn_link(ws, config.channel_capacity))
}

/// Dial a host, e.g. `ws://127.0.0.1:9870`.
#[instrument(skip(config))]
pub async fn connect(url: &str, config: &PeerConfig) -> Result<PeerLink, PeerError> {
    let (ws, _) = connect_async(url).await?;
    info!("Connected to host");
    Ok(spawn_link(ws, config.channel_capacity))
}

fn spawn_link<S>(ws: WebSocketStream<S>, capacity: usize) -> PeerLink
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut ws_sender, mut ws_receiver) = ws.split();
    let (out_tx, mut out_rx) = mpsc::channel::<PeerMessage>(capacity);
    let (in_tx, in_rx) = mpsc::channel::<PeerMessage>(capacity);

    tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let text = match msg.to_json() {
                Ok(t) => t,
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let reader = tokio::spawn(async move {
        loop {
            match ws_receiver.next().await {
                Some(Ok(Message::Text(text))) => match PeerMessage::from_json(&text) {
                    Ok(msg) => {
                        if in_tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => debug!("Ignoring invalid message: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    debug!("Peer closed the socket");
                    break;
                }
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    PeerLink {
        outgoing: out_tx,
        incoming: in_rx,
        reader,
    }
}

// =============================================================================
// COMPUTER-DRIVEN PEER
// =============================================================================

/// Play the local color with the evaluator until the game ends, the link
/// drops, or `max_actions` is reached. Returns the winner, if any.
#[instrument(skip_all, fields(role = ?session.role()))]
pub async fn run_computer_peer(
    session: &mut PeerSession,
    link: &mut PeerLink,
    config: &PeerConfig,
) -> Result<Option<Color>, PeerError> {
    if let Some(start) = session.on_connected()? {
        link.send(start).await?;
    }

    let mut actions = 0;
    loop {
        if let Some(winner) = session.state().and_then(|s| s.winner) {
            info!(%winner, actions, "Game over");
            return Ok(Some(winner));
        }
        if !session.is_connected() {
            info!(status = ?session.status(), "Session ended");
            return Ok(None);
        }
        if actions >= config.max_actions {
            warn!(actions, "Action limit reached, leaving");
            let _ = link.send(session.leave()).await;
            return Ok(None);
        }

        if !session.is_local_turn() {
            match link.recv().await {
                Some(msg) => {
                    if let Err(e) = session.handle_message(msg) {
                        warn!("Rejected peer message: {}", e);
                    }
                }
                None => session.on_channel_closed("connection lost"),
            }
            continue;
        }

        let delay = match session.state().map(|s| s.turn.phase) {
            Some(TurnPhase::TurnOver) => config.pass_delay,
            _ => config.computer_delay,
        };
        tokio::select! {
            biased;
            msg = link.recv() => {
                match msg {
                    Some(msg) => {
                        if let Err(e) = session.handle_message(msg) {
                            warn!("Rejected peer message: {}", e);
                        }
                    }
                    None => session.on_channel_closed("connection lost"),
                }
                continue;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        match session.computer_step()? {
            Some((action, update)) => {
                debug!(?action, "Computer acted");
                if link.send(update).await.is_err() {
                    session.on_channel_closed("connection lost");
                }
                actions += 1;
            }
            None => {
                warn!("Computer has nothing to do");
                return Ok(None);
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
