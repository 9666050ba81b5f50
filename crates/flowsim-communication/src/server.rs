//! WebSocket telemetry server
//!
//! Accepts connections on a single endpoint path and replays the full sample
//! list to each client independently. Every connection runs in its own task;
//! cancelling the server token stops accepting, interrupts pacing waits,
//! closes client sockets and waits for every connection task before the
//! listener is released.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use flowsim_core::{ConnectionError, FlowSample, Result, SimulationError};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

use crate::replay::{clamp_speed, ReplaySchedule, ReplaySettings, ReplayState};

/// Default WebSocket endpoint
pub const DEFAULT_PATH: &str = "/websocket";

/// Upper bound on each step of closing a client socket
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Listener configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port, 0 for an ephemeral port
    pub port: u16,
    /// Only path accepted for the upgrade
    pub path: String,
    /// Replay behaviour
    pub replay: ReplaySettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3030,
            path: DEFAULT_PATH.to_string(),
            replay: ReplaySettings::default(),
        }
    }
}

impl ServerConfig {
    /// `host:port` as passed to the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A bound telemetry server
pub struct TelemetryServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    path: Arc<str>,
    samples: Arc<[FlowSample]>,
    replay: Arc<ReplaySettings>,
}

impl TelemetryServer {
    /// Bind the listener for `samples`
    ///
    /// An empty sample list is rejected before anything is bound.
    pub async fn bind(config: ServerConfig, samples: Vec<FlowSample>) -> Result<Self> {
        if samples.is_empty() {
            return Err(SimulationError::EmptySamples {
                source_name: "replay sample set".to_string(),
            }
            .into());
        }

        let address = config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| ConnectionError::BindFailed {
                address: address.clone(),
                reason: e.to_string(),
            })?;
        let local_addr = listener.local_addr()?;

        let mut replay = config.replay;
        replay.speed = clamp_speed(replay.speed);

        tracing::info!(
            address = %local_addr,
            path = %config.path,
            samples = samples.len(),
            repeat = replay.repeat,
            speed = replay.speed,
            "Telemetry server listening"
        );

        Ok(Self {
            listener,
            local_addr,
            path: config.path.into(),
            samples: samples.into(),
            replay: Arc::new(replay),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of samples each connection replays
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Accept connections until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(handle_connection(
                            stream,
                            peer,
                            self.path.clone(),
                            self.samples.clone(),
                            self.replay.clone(),
                            cancel.clone(),
                        ));
                    }
                    Err(e) => tracing::warn!("Failed to accept connection: {}", e),
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!("Connection task failed: {}", e);
                    }
                }
            }
        }

        tracing::info!(active = connections.len(), "Shutting down telemetry server");
        while let Some(joined) = connections.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Connection task failed: {}", e);
            }
        }

        drop(self.listener);
        tracing::info!(address = %self.local_addr, "Telemetry server stopped");
        Ok(())
    }
}

/// Bind and run a server until `cancel` fires
pub async fn serve(
    config: ServerConfig,
    samples: Vec<FlowSample>,
    cancel: CancellationToken,
) -> Result<()> {
    TelemetryServer::bind(config, samples).await?.run(cancel).await
}

fn reject_path(requested: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(format!("No endpoint at {}", requested)));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

async fn accept_websocket(
    stream: TcpStream,
    path: &str,
) -> std::result::Result<WebSocketStream<TcpStream>, ConnectionError> {
    let expected = path.to_string();
    let callback = move |request: &Request, response: Response| {
        if request.uri().path() == expected {
            Ok(response)
        } else {
            Err(reject_path(request.uri().path()))
        }
    };

    tokio_tungstenite::accept_hdr_async(stream, callback)
        .await
        .map_err(|e| ConnectionError::HandshakeFailed {
            reason: e.to_string(),
        })
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    path: Arc<str>,
    samples: Arc<[FlowSample]>,
    replay: Arc<ReplaySettings>,
    cancel: CancellationToken,
) {
    let websocket = tokio::select! {
        _ = cancel.cancelled() => return,
        accepted = accept_websocket(stream, &path) => match accepted {
            Ok(websocket) => websocket,
            Err(e) => {
                tracing::warn!(peer = %peer, "{}", e);
                return;
            }
        },
    };

    tracing::info!(peer = %peer, "Client connected");
    let schedule = ReplaySchedule::new(samples, replay);
    match replay_to_client(websocket, schedule, &cancel).await {
        Ok(frames) => tracing::info!(peer = %peer, frames, "Client disconnected"),
        Err(e) => tracing::warn!(peer = %peer, "Replay ended: {}", e),
    }
}

/// Drive one client's replay state machine
///
/// Every await is raced against `cancel`, so a client that stops reading
/// cannot hold the server open once shutdown starts.
async fn replay_to_client(
    websocket: WebSocketStream<TcpStream>,
    mut schedule: ReplaySchedule,
    cancel: &CancellationToken,
) -> std::result::Result<u64, ConnectionError> {
    let (mut sink, mut incoming) = websocket.split();
    let mut state = ReplayState::Sending;
    let mut frames = 0u64;

    loop {
        state = match state {
            ReplayState::Sending => match schedule.next() {
                Some(step) => {
                    let text = step
                        .frame
                        .to_json()
                        .map_err(|e| ConnectionError::SendFailed {
                            reason: e.to_string(),
                        })?;
                    tokio::select! {
                        _ = cancel.cancelled() => ReplayState::Closing,
                        sent = sink.send(Message::text(text)) => {
                            sent.map_err(|e| ConnectionError::SendFailed {
                                reason: e.to_string(),
                            })?;
                            frames += 1;
                            match step.delay {
                                Some(delay) => ReplayState::WaitingNextTick(delay),
                                None => ReplayState::Closing,
                            }
                        }
                    }
                }
                None => ReplayState::Closing,
            },
            ReplayState::WaitingNextTick(delay) => {
                let tick = tokio::time::sleep(delay);
                tokio::pin!(tick);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break ReplayState::Closing,
                        _ = &mut tick => break ReplayState::Sending,
                        message = incoming.next() => match message {
                            Some(Ok(Message::Close(_))) | None => break ReplayState::Done,
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                return Err(ConnectionError::ConnectionLost {
                                    reason: e.to_string(),
                                });
                            }
                        },
                    }
                }
            }
            ReplayState::Closing => {
                match tokio::time::timeout(CLOSE_TIMEOUT, sink.send(Message::Close(None))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::debug!("Close frame not delivered: {}", e),
                    Err(_) => tracing::debug!("Close frame timed out, dropping socket"),
                }
                ReplayState::Done
            }
            ReplayState::Done => break,
        };
    }

    match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!("Socket close failed: {}", e),
        Err(_) => tracing::debug!("Socket close timed out"),
    }
    Ok(frames)
}
