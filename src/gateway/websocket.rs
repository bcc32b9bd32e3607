//! WebSocket gateway
//!
//! Each connection gets a session id and a channel-backed session handle.
//! A writer task drains the handle's channel into the socket while the read
//! loop dispatches client messages into the engine. When the socket closes
//! the engine is told the session disconnected.

use crate::config::GatewaySettings;
use crate::error::MatchResult;
use crate::gateway::messages::{ClientMessage, ServerMessage};
use crate::matchmaking::MatchmakingEngine;
use crate::session::{ChannelSessionHandle, SessionHandle};
use crate::types::RoomSize;
use crate::utils::generate_session_id;
use anyhow::{Context, Result};
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, warn};

/// Accepts participant connections and feeds their events into the engine
pub struct GatewayServer {
    config: GatewaySettings,
    engine: MatchmakingEngine,
    shutdown_tx: broadcast::Sender<()>,
}

impl GatewayServer {
    pub fn new(config: GatewaySettings, engine: MatchmakingEngine) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            engine,
            shutdown_tx,
        }
    }

    /// Start accepting connections until stopped
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid gateway address")?;

        let app = router(self.engine.clone());
        let listener = TcpListener::bind(addr).await?;

        info!("Gateway listening on ws://{}/ws", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Gateway shutdown signal received");
            })
            .await?;

        info!("Gateway stopped");
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping gateway...");
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to gateway: {}", e);
        }
        Ok(())
    }
}

/// Router exposing the WebSocket endpoint
pub fn router(engine: MatchmakingEngine) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(engine)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(engine): State<MatchmakingEngine>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, engine))
}

async fn handle_socket(socket: WebSocket, engine: MatchmakingEngine) {
    let session_id = generate_session_id();
    let (handle, outgoing) = ChannelSessionHandle::channel(session_id.clone());
    let handle: Arc<dyn SessionHandle> = Arc::new(handle);
    let (mut sink, mut stream) = socket.split();

    info!(session_id = %session_id, "Participant connected");

    let writer = {
        let session_id = session_id.clone();
        tokio::spawn(async move {
            let mut outgoing = UnboundedReceiverStream::new(outgoing);
            while let Some(message) = outgoing.next().await {
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        error!(session_id = %session_id, error = %e, "Failed to encode message");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    debug!(session_id = %session_id, "Socket closed while writing");
                    break;
                }
            }
        })
    };

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(message) => handle_client_message(&engine, &handle, message).await,
                    Err(e) => {
                        debug!(session_id = %session_id, error = %e, "Unreadable client message");
                        handle.send(ServerMessage::error("Unrecognized message"));
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                debug!(session_id = %session_id, error = %e, "Socket read failed");
                break;
            }
            _ => {}
        }
    }

    writer.abort();
    if let Err(e) = engine.disconnect(&session_id).await {
        error!(session_id = %session_id, error = %e, "Disconnect reconciliation failed");
    }
    info!(session_id = %session_id, "Participant disconnected");
}

/// Dispatch one client message into the engine and answer the sender
pub async fn handle_client_message(
    engine: &MatchmakingEngine,
    handle: &Arc<dyn SessionHandle>,
    message: ClientMessage,
) {
    let session_id = handle.session_id();
    engine.metrics().record_gateway_message(message.kind());
    debug!(session_id = %session_id, message_type = message.kind(), "Client message");

    match message {
        ClientMessage::UserId { user_id } => {
            match engine.register_session(handle.clone(), user_id) {
                Ok(registration) if registration.guest => {
                    handle.send(ServerMessage::RegisterUserId {
                        id: registration.player_id,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    handle.send(ServerMessage::error(e.to_string()));
                }
            }
        }
        ClientMessage::JoinRoom(request) => {
            // Outcomes and rejections are reported to the sender by the engine
            if let Err(e) = engine.handle_arrival(handle.clone(), request).await {
                debug!(session_id = %session_id, error = %e, "Join request not accepted");
            }
        }
        ClientMessage::Quit { players: 0, .. } => {}
        ClientMessage::Quit { players, .. } => {
            match quit(engine, &session_id, players).await {
                Ok(removed) => {
                    handle.send(ServerMessage::quit_ack(removed));
                }
                Err(e) => {
                    handle.send(ServerMessage::rejection(&e));
                }
            }
        }
        ClientMessage::ShowData => match engine.diagnostics() {
            Ok(diagnostics) => {
                handle.send(ServerMessage::ShowDataResponse(diagnostics));
            }
            Err(e) => {
                handle.send(ServerMessage::error(e.to_string()));
            }
        },
        ClientMessage::Test => {
            handle.send(ServerMessage::test_ack());
        }
    }
}

/// Leave the queue for `players`, or give up a seat when not queued there
async fn quit(engine: &MatchmakingEngine, session_id: &str, players: u8) -> MatchResult<bool> {
    let size = RoomSize::from_players(players)?;
    if engine.withdraw(session_id, size)? {
        return Ok(true);
    }
    Ok(engine.leave_room(session_id).await?.is_some())
}
