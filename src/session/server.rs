use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tracing::{debug, error, info, warn};

use super::actor::CoordinatorHandle;
use super::coordinator::MoveRequest;
use super::messages::ClientMessage;
use super::types::{ConnId, OutboundMessage, SessionError};
use crate::config::ServerConfig;

const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of handling one inbound frame
enum Flow {
    Continue,
    Close,
}

pub struct SessionServer {
    listener: TcpListener,
    handle: CoordinatorHandle,
    ping_interval: Duration,
    pong_timeout: Duration,
}

impl SessionServer {
    /// Bind the listener and start the coordinator
    pub async fn bind(config: &ServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.bind_addr()).await?;
        let handle = CoordinatorHandle::spawn(config.move_policy, config.command_buffer);
        info!("Session server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            handle,
            ping_interval: config.ping_interval,
            pong_timeout: config.pong_timeout,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let handle = self.handle.clone();
            let (ping_interval, pong_timeout) = (self.ping_interval, self.pong_timeout);

            tokio::spawn(async move {
                if let Err(e) =
                    handle_connection(stream, addr, handle, ping_interval, pong_timeout).await
                {
                    error!("Connection error from {}: {}", addr, e);
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    handle: CoordinatorHandle,
    ping_interval: Duration,
    pong_timeout: Duration,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let conn = ConnId::next();
    info!("WebSocket connection {} from {}", conn, addr);

    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (ctrl_tx, mut ctrl_rx) = mpsc::unbounded_channel::<Message>();

    let mut joined = false;
    let mut ping_interval = tokio::time::interval(ping_interval);
    let mut waiting_for_pong = false;
    let mut pong_deadline: Option<tokio::time::Instant> = None;

    // drains until every sender is gone, then closes the socket
    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    let ws_msg = Message::Text(msg.into_inner());
                    if ws_tx.send(ws_msg).await.is_err() {
                        return;
                    }
                }
                Some(ctrl_msg) = ctrl_rx.recv() => {
                    if ws_tx.send(ctrl_msg).await.is_err() {
                        return;
                    }
                }
                else => break,
            }
        }
        let _ = ws_tx.close().await;
    });

    loop {
        let pong_timeout_fut = async {
            match pong_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = ping_interval.tick() => {
                if waiting_for_pong {
                    warn!("No Pong received, disconnecting {}", conn);
                    break;
                }
                if ctrl_tx.send(Message::Ping(Bytes::new())).is_err() {
                    break;
                }
                waiting_for_pong = true;
                pong_deadline = Some(tokio::time::Instant::now() + pong_timeout);
                debug!("Ping sent to {}", conn);
            }

            _ = pong_timeout_fut => {
                warn!("Pong timeout, disconnecting {}", conn);
                break;
            }

            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!("WebSocket error on {}: {}", conn, e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => {
                        match handle_text_message(&text, conn, &tx, &handle, &mut joined).await {
                            Ok(Flow::Continue) => {}
                            Ok(Flow::Close) => break,
                            Err(e) => {
                                error!("Coordinator unavailable for {}: {}", conn, e);
                                break;
                            }
                        }
                    }
                    Message::Pong(_) => {
                        waiting_for_pong = false;
                        pong_deadline = None;
                        debug!("Pong received from {}", conn);
                    }
                    Message::Close(_) => {
                        info!("Close received from {}", conn);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    if joined {
        handle.disconnect(conn).await?;
    }

    drop(tx);
    drop(ctrl_tx);
    let send_abort = send_task.abort_handle();
    if tokio::time::timeout(FLUSH_TIMEOUT, send_task).await.is_err() {
        warn!("Timed out flushing outbound messages for {}", conn);
        send_abort.abort();
    }
    info!("WebSocket disconnected: {}", conn);

    Ok(())
}

async fn handle_text_message(
    text: &str,
    conn: ConnId,
    tx: &mpsc::UnboundedSender<OutboundMessage>,
    handle: &CoordinatorHandle,
    joined: &mut bool,
) -> Result<Flow, SessionError> {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            warn!("Dropped invalid message from {}: {}", conn, e);
            return Ok(Flow::Continue);
        }
    };

    match client_msg {
        ClientMessage::Join {
            room_id,
            player_name,
        } => match handle.join(conn, room_id, player_name, tx.clone()).await {
            Ok(ack) => {
                *joined = true;
                debug!("{} seated in {} as {}", conn, ack.room_id, ack.mark);
            }
            Err(SessionError::RoomFull(_)) => return Ok(Flow::Close),
            Err(SessionError::Internal(e)) => return Err(SessionError::Internal(e)),
            Err(e) => debug!("Join ignored for {}: {}", conn, e),
        },

        ClientMessage::Move {
            board,
            cell,
            current_player,
        } => {
            let request = match (cell, board) {
                (Some(cell), _) => MoveRequest::Cell(cell),
                (None, Some(board)) => MoveRequest::Snapshot {
                    board,
                    claimed: current_player,
                },
                (None, None) => {
                    warn!("Dropped move without board or cell from {}", conn);
                    return Ok(Flow::Continue);
                }
            };
            handle.submit_move(conn, request).await?;
        }

        ClientMessage::RestartRequest { .. } => handle.request_restart(conn).await?,

        ClientMessage::Restart => handle.restart(conn).await?,

        ClientMessage::LeaveRoom => {
            handle.leave_room(conn).await?;
            *joined = false;
        }
    }

    Ok(Flow::Continue)
}
